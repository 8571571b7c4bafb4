//! The WebSocket stream fan-out: per-client metric subscriptions at
//! per-metric intervals, with backpressure handled by disconnecting slow
//! clients rather than blocking the producer.
//!
//! This module is transport-agnostic: it owns the subscription bookkeeping
//! and the periodic fan-out tick, but nothing here touches a socket
//! directly. A transport (the `arrayd-server` binary's `ws.rs`) registers a
//! client via [`StreamFanout::register_client`], spawns its own reader/writer
//! duty tasks around the returned [`client::ClientSession`], and translates
//! [`message::ClientMessage`]/[`message::ServerMessage`] to and from actual
//! WebSocket frames.

pub mod client;
pub mod fanout;
pub mod message;
pub mod protocol;
pub mod subscription;

pub use client::{ClientHandle, ClientSession};
pub use fanout::{FanoutStats, StreamFanout};
pub use message::{ClientAction, ClientMessage, ServerMessage};
pub use subscription::Subscription;
