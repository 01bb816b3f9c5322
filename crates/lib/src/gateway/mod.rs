//! Gateway: HTTP + WebSocket control plane over the broker.
//!
//! Single port serves HTTP and WebSocket. Protocol: first frame must be
//! `connect`; then requests (req/res) and events. Skill operations run on
//! their own tasks so one slow script does not stall the connection.

mod protocol;
mod server;

pub use protocol::{ConnectParams, DescribeParams, RunParams, WsRequest, WsResponse};
pub use server::run_gateway;
