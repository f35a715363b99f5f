// Wire formats spoken between the sidebar, guest frames and the notebook.

pub mod bootstrap;
pub mod frame_rpc;
pub mod jsonrpc;
