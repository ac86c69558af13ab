use std::collections::BTreeMap;

use hmsc_crypto::{PublicKey, Signature};
use serde::{Deserialize, Serialize};

use crate::ids::{ParticipantId, SessionId};
use crate::participant::Participant;
use crate::tx::{ContractAbi, DecodedTx, Metadata};

/// Where a session sits in its lifecycle. Transitions are one-directional:
/// `waiting -> transaction_received -> signing -> executing -> completed`,
/// with `expired`/`cancelled` reachable as a terminal state from any
/// non-terminal status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    TransactionReceived,
    Signing,
    Executing,
    Completed,
    Expired,
    Cancelled,
}

impl SessionStatus {
    /// Whether a session in this status can still accept a new signature.
    pub fn accepts_signatures(self) -> bool {
        matches!(self, Self::TransactionReceived | Self::Signing)
    }

    /// Whether this status is terminal: no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Expired | Self::Cancelled)
    }
}

/// A multi-party transaction-approval session: the full state a
/// `SessionManager` reads and mutates under its per-session write lock.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    /// Absent for a PIN-less session, which any `AUTH` unlocks regardless of
    /// the `pin` field it carries.
    pub pin: Option<String>,
    pub status: SessionStatus,
    pub threshold: u32,
    pub eligible_keys: Vec<PublicKey>,
    pub expected_participants: u32,
    pub frozen_tx: Option<Vec<u8>>,
    pub tx_details: Option<DecodedTx>,
    pub metadata: Metadata,
    pub contract_abi: Option<ContractAbi>,
    pub participants: BTreeMap<ParticipantId, Participant>,
    pub signatures: BTreeMap<PublicKey, Signature>,
    pub created_at: u64,
    pub expires_at: u64,
    pub tx_expires_at: Option<u64>,
}

impl Session {
    pub fn new(
        session_id: SessionId,
        pin: Option<String>,
        threshold: u32,
        eligible_keys: Vec<PublicKey>,
        expected_participants: u32,
        created_at: u64,
        expires_at: u64,
    ) -> Self {
        Self {
            session_id,
            pin,
            status: SessionStatus::Waiting,
            threshold,
            eligible_keys,
            expected_participants,
            frozen_tx: None,
            tx_details: None,
            metadata: Metadata::new(),
            contract_abi: None,
            participants: BTreeMap::new(),
            signatures: BTreeMap::new(),
            created_at,
            expires_at,
            tx_expires_at: None,
        }
    }

    pub fn is_eligible(&self, key: &PublicKey) -> bool {
        self.eligible_keys.contains(key)
    }

    pub fn has_signature_from(&self, key: &PublicKey) -> bool {
        self.signatures.contains_key(key)
    }

    /// Whether enough distinct eligible signatures have been collected to
    /// satisfy the session's threshold.
    pub fn threshold_met(&self) -> bool {
        self.signatures.len() as u32 >= self.threshold
    }
}
