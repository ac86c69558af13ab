use serde::{Deserialize, Serialize};

use hmsc_crypto::{PublicKey, Signature};
use hmsc_types::{
    ContractAbi, DecodedTx, Metadata, ParticipantRole, ParticipantStatus, Session, SessionStatus,
};

/// Every frame on the wire is `{"type": "...", "payload": {...}}`. Each
/// variant carries its own literal tag via `#[serde(rename = "...")]` rather
/// than a blanket `rename_all`, since the tag strings are SCREAMING_SNAKE
/// while the payload fields are camelCase.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    #[serde(rename = "AUTH")]
    #[serde(rename_all = "camelCase")]
    Auth {
        session_id: String,
        #[serde(default)]
        pin: Option<String>,
        role: ParticipantRole,
        #[serde(default)]
        label: Option<String>,
    },
    #[serde(rename = "PARTICIPANT_READY")]
    #[serde(rename_all = "camelCase")]
    ParticipantReady { public_key: PublicKey },
    #[serde(rename = "SIGNATURE_SUBMIT")]
    #[serde(rename_all = "camelCase")]
    SignatureSubmit {
        public_key: PublicKey,
        signature: Signature,
    },
    #[serde(rename = "TRANSACTION_REJECTED")]
    #[serde(rename_all = "camelCase")]
    TransactionRejected { reason: String },
    #[serde(rename = "PING")]
    Ping {},
}

/// A frozen transaction, wire-encoded as base64 of its raw bytes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrozenTransaction {
    pub base64: String,
}

impl FrozenTransaction {
    pub fn new(bytes: &[u8]) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        Self {
            base64: STANDARD.encode(bytes),
        }
    }
}

/// Per-status headcounts, broadcast alongside `PARTICIPANT_CONNECTED` and
/// `PARTICIPANT_READY` so clients can render progress without separately
/// polling the session.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub connected: u32,
    pub ready: u32,
    pub signed: u32,
    pub rejected: u32,
    pub disconnected: u32,
}

impl SessionStats {
    pub fn from_session(session: &Session) -> Self {
        let mut stats = Self::default();
        for participant in session.participants.values() {
            match participant.status {
                ParticipantStatus::Connected | ParticipantStatus::Reviewing => {
                    stats.connected += 1
                }
                ParticipantStatus::Ready | ParticipantStatus::Signing => stats.ready += 1,
                ParticipantStatus::Signed => stats.signed += 1,
                ParticipantStatus::Rejected => stats.rejected += 1,
                ParticipantStatus::Disconnected => stats.disconnected += 1,
            }
        }
        stats
    }
}

/// The snapshot of session state handed to a freshly-authenticated
/// participant, and re-sent (without the `pin`) on later reconnects.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub status: SessionStatus,
    pub threshold: u32,
    pub eligible_public_keys: Vec<PublicKey>,
    pub expected_participants: u32,
    pub expires_at: u64,
    pub stats: SessionStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_details: Option<DecodedTx>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frozen_transaction: Option<FrozenTransaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_interface: Option<ContractAbi>,
}

impl SessionInfo {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.session_id.to_string(),
            status: session.status,
            threshold: session.threshold,
            eligible_public_keys: session.eligible_keys.clone(),
            expected_participants: session.expected_participants,
            expires_at: session.expires_at,
            stats: SessionStats::from_session(session),
            tx_details: session.tx_details.clone(),
            frozen_transaction: session.frozen_tx.as_deref().map(FrozenTransaction::new),
            metadata: (!session.metadata.is_empty()).then(|| session.metadata.clone()),
            contract_interface: session.contract_abi.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    #[serde(rename = "AUTH_SUCCESS")]
    #[serde(rename_all = "camelCase")]
    AuthSuccess {
        participant_id: String,
        session_info: SessionInfo,
    },
    #[serde(rename = "AUTH_FAILED")]
    #[serde(rename_all = "camelCase")]
    AuthFailed { message: String },
    #[serde(rename = "TRANSACTION_RECEIVED")]
    #[serde(rename_all = "camelCase")]
    TransactionReceived {
        frozen_transaction: FrozenTransaction,
        tx_details: DecodedTx,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
        #[serde(skip_serializing_if = "Option::is_none")]
        contract_interface: Option<ContractAbi>,
    },
    #[serde(rename = "SIGNATURE_ACCEPTED")]
    #[serde(rename_all = "camelCase")]
    SignatureAccepted {
        success: bool,
        public_key: String,
        signatures_collected: u32,
        signatures_required: u32,
        threshold_met: bool,
    },
    #[serde(rename = "SIGNATURE_REJECTED")]
    #[serde(rename_all = "camelCase")]
    SignatureRejected {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        public_key: Option<String>,
    },
    #[serde(rename = "THRESHOLD_MET")]
    #[serde(rename_all = "camelCase")]
    ThresholdMet {
        signatures_collected: u32,
        signatures_required: u32,
    },
    #[serde(rename = "TRANSACTION_EXECUTED")]
    #[serde(rename_all = "camelCase")]
    TransactionExecuted {
        transaction_id: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        receipt: Option<String>,
    },
    #[serde(rename = "PARTICIPANT_CONNECTED")]
    #[serde(rename_all = "camelCase")]
    ParticipantConnected {
        participant_id: String,
        stats: SessionStats,
    },
    #[serde(rename = "PARTICIPANT_READY")]
    #[serde(rename_all = "camelCase")]
    ParticipantReady {
        participant_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        public_key: Option<String>,
        stats: SessionStats,
        all_ready: bool,
    },
    #[serde(rename = "PARTICIPANT_DISCONNECTED")]
    #[serde(rename_all = "camelCase")]
    ParticipantDisconnected { participant_id: String },
    #[serde(rename = "SESSION_EXPIRED")]
    SessionExpired {},
    #[serde(rename = "ERROR")]
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    #[serde(rename = "PONG")]
    Pong {},
}

impl ServerMessage {
    pub fn error(err: &hmsc_types::ProtocolError) -> Self {
        Self::Error {
            message: err.to_string(),
            code: Some(err.code().to_string()),
        }
    }
}
