//! Wire-level constants for the stream fan-out protocol. These bind the
//! transport-agnostic fan-out here to the concrete framing rules a real
//! WebSocket adapter (e.g. `arrayd-server`'s `ws.rs`) must enforce.

use std::time::Duration;

/// Inbound frames larger than this are rejected by the transport before
/// they ever reach [`crate::stream::client::ClientHandle::handle_message`].
pub const MAX_FRAME_BYTES: usize = 512;

/// A connection with no inbound traffic (including pongs) for this long is
/// considered dead and torn down.
pub const READ_DEADLINE: Duration = Duration::from_secs(60);

/// A single outbound frame write must complete within this long.
pub const WRITE_DEADLINE: Duration = Duration::from_secs(10);

/// How often the writer duty sends a ping to keep the read deadline from
/// expiring on an otherwise idle, healthy connection.
pub const PING_INTERVAL: Duration = Duration::from_secs(54);

/// Default bounded capacity of a client's outbound message queue.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;
