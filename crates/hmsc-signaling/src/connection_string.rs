use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The payload embedded in a connection string: just enough for a
/// participant's wallet to find the right signaling endpoint, join the
/// right session, and unlock it, without a prior out-of-band handshake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPayload {
    /// Signaling server websocket endpoint.
    pub s: String,
    /// Session id.
    pub i: String,
    /// Session PIN. Absent for PIN-less sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
}

const PREFIX: &str = "hmsc:";

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConnectionStringError {
    #[error("connection string is missing the {PREFIX:?} prefix")]
    MissingPrefix,

    #[error("connection string is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("connection string payload is not valid JSON: {0}")]
    InvalidJson(String),
}

/// Encodes a [`ConnectionPayload`] as `hmsc:BASE64(JSON)`.
pub fn encode(payload: &ConnectionPayload) -> String {
    let json = serde_json::to_vec(payload).expect("ConnectionPayload always serializes");
    format!("{PREFIX}{}", STANDARD.encode(json))
}

/// Decodes a connection string produced by [`encode`]. Tolerates a missing
/// `p` key for PIN-less sessions.
pub fn decode(connection_string: &str) -> Result<ConnectionPayload, ConnectionStringError> {
    let encoded = connection_string
        .strip_prefix(PREFIX)
        .ok_or(ConnectionStringError::MissingPrefix)?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ConnectionStringError::InvalidBase64(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| ConnectionStringError::InvalidJson(e.to_string()))
}
