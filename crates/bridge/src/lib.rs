// Cross-frame annotation bridge: an in-process model of documents, windows
// and message channels, plus the components that run on top of it.

pub mod anchoring;
pub mod broker;
pub mod config;
pub mod dom;
pub mod frames;
pub mod integration;
pub mod navigation;
pub mod rpc;
pub mod window;
