use hmsc_crypto::PublicKey;
use serde::{Deserialize, Serialize};

use crate::ids::ParticipantId;

/// The role a connecting client identifies itself with on `AUTH`. Carries
/// no extra privilege in the state machine today, but keeps the wire
/// payload's distinction available to callers that want to branch on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantRole {
    Participant,
    Coordinator,
}

/// Where a connected participant sits relative to the session's signing
/// workflow. Distinct from the transport-level connected/disconnected state,
/// which `hmsc-signaling` tracks separately per socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    /// Authenticated, but has not yet acknowledged the current transaction.
    Connected,
    /// Acknowledged the transaction and is actively being prompted to sign.
    Ready,
    /// Has the transaction open and is being walked through its details.
    Reviewing,
    /// In the middle of producing a signature client-side.
    Signing,
    /// Submitted a valid signature for the current transaction.
    Signed,
    /// Explicitly rejected the current transaction.
    Rejected,
    /// Lost its connection; may still reconnect within the session's
    /// reconnection window without losing prior signatures.
    Disconnected,
}

/// A single party to a session: one of the `eligible_keys`, once it has
/// actually joined.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: ParticipantId,
    /// Absent until `set_ready` reports one; a participant can be
    /// `connected` without having disclosed which key it intends to sign
    /// with.
    pub public_key: Option<PublicKey>,
    pub status: ParticipantStatus,
    pub label: Option<String>,
    pub joined_at: u64,
    pub last_seen_at: u64,
}

impl Participant {
    pub fn new(participant_id: ParticipantId, label: Option<String>, now_secs: u64) -> Self {
        Self {
            participant_id,
            public_key: None,
            status: ParticipantStatus::Connected,
            label,
            joined_at: now_secs,
            last_seen_at: now_secs,
        }
    }
}
