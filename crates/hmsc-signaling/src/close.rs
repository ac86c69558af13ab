//! WebSocket close codes this coordinator uses beyond the standard
//! 1000/1001 range. The 4000-4099 band is reserved for private use by RFC
//! 6455, so these are free to define.

/// Normal closure: the participant (or server) ended the session cleanly.
pub const NORMAL: u16 = 1000;

/// The server is shutting down or the session ended from elsewhere.
pub const GOING_AWAY: u16 = 1001;

/// The session's `expires_at` (or `tx_expires_at`) deadline passed.
pub const SESSION_EXPIRED: u16 = 4000;

/// No `Auth` message arrived within the authentication window, or the first
/// frame was not `Auth` at all.
pub const AUTH_TIMEOUT: u16 = 4001;

/// Two consecutive keep-alive pings went unanswered.
pub const KEEPALIVE_TIMEOUT: u16 = 4002;

/// The connection's outbound queue filled up faster than it could drain:
/// a slow consumer was disconnected rather than let the queue grow
/// unboundedly.
pub const BACKPRESSURE: u16 = 4003;

/// A participant's rejection brought the session below the signatures it
/// could still possibly collect; the session was cancelled rather than left
/// to expire.
pub const SESSION_CANCELLED: u16 = 4010;
