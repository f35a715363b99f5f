pub mod jsonrpc_client;
pub mod jsonrpc_server;
pub mod port_rpc;

pub use jsonrpc_client::{JsonRpcCallError, JsonRpcClient};
pub use jsonrpc_server::{JsonRpcMethods, JsonRpcServer};
pub use port_rpc::{PortRpc, PortRpcError, Responder};
