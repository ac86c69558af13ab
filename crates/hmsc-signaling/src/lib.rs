//! The wire protocol, connection-string codec, and the WebSocket signaling
//! server that bridges participants to a `hmsc_manager::SessionManager`.

pub mod close;
pub mod connection_string;
pub mod events;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod timing;

pub use connection_string::{decode as decode_connection_string, encode as encode_connection_string, ConnectionPayload, ConnectionStringError};
pub use events::BroadcastEventSink;
pub use protocol::{
    ClientMessage, FrozenTransaction, ServerMessage, SessionInfo, SessionStats,
};
pub use registry::{CloseSignal, ConnectionHandle, ConnectionRegistry};
pub use server::SignalingServer;
