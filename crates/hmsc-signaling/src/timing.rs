use std::time::Duration;

/// How long a freshly-accepted connection has to send its first
/// `Authenticate` message before it is closed with
/// [`crate::close::AUTH_TIMEOUT`].
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Period between keep-alive pings sent to an authenticated connection.
pub const PING_INTERVAL: Duration = Duration::from_secs(25);

/// Consecutive unanswered pings tolerated before the connection is closed
/// with [`crate::close::KEEPALIVE_TIMEOUT`].
pub const MAX_MISSED_PINGS: u32 = 2;

/// How long a participant may stay disconnected before their seat is no
/// longer held open for them.
pub const RECONNECT_WINDOW: Duration = Duration::from_secs(60);

/// Outbound frames a connection may queue before it is treated as a slow
/// consumer and closed with [`crate::close::BACKPRESSURE`].
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;
