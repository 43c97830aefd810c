//! Gateway: HTTP + WebSocket transport for turns.
//!
//! Single port serves `POST /api/messages` (one activity in, its replies out), a health probe,
//! and a WebSocket speaking req/res frames for interactive clients.

mod protocol;
mod server;

pub use protocol::{HelloOk, TurnResponse, WsRequest, WsResponse, PROTOCOL_VERSION};
pub use server::{build_router, run_gateway, GatewayState};
