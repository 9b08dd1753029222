//! JSON-RPC API Layer
//!
//! Exposes the scan orchestrator to the UI: start and status methods plus a
//! subscription that pushes `scan-error` / `scan-complete` events.

pub mod error;
pub mod events;
pub mod handler;
pub mod server;
pub mod types;

pub use events::BroadcastEventSink;
pub use server::{RpcServer, RpcServerConfig};
