//! `arrayd-server`: the HTTP/WebSocket binding that exposes `arrayd-core`'s
//! operation manager and stream fan-out over the network.
//!
//! The physical storage, container, VM, and power drivers are out of scope
//! for this repository; [`demo_collaborators`] provides in-memory stand-ins
//! so the binary runs end to end without real hardware.

pub mod demo_collaborators;
pub mod error;
pub mod http;
pub mod ws;

pub use error::{Result, ServerError};
pub use http::{AppState, build_router};
