use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// A single credit/debit leg as it appears in the raw wire encoding, before
/// `TransactionDecoder` turns it into `hmsc_types::Amount`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawAmount {
    pub account: String,
    pub value: i128,
}

/// The closed set of transaction bodies a codec can hand back. This is the
/// structural shape `TransactionDecoder` classifies against: which variant
/// it is, and which fields it carries, is determined entirely by what the
/// codec actually decoded, never by inspecting a type name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RawBody {
    CryptoTransfer {
        transfers: Vec<RawAmount>,
    },
    TokenAssociate {
        account: String,
        token_ids: Vec<String>,
    },
    TokenDissociate {
        account: String,
        token_ids: Vec<String>,
    },
    TokenCreate {
        name: String,
        symbol: String,
        initial_supply: u64,
        treasury: String,
    },
    TokenMint {
        token_id: String,
        amount: u64,
    },
    TokenBurn {
        token_id: String,
        amount: u64,
    },
    TokenUpdate {
        token_id: String,
    },
    TokenDelete {
        token_id: String,
    },
    AccountCreate {
        initial_balance: u64,
    },
    AccountUpdate {
        account: String,
    },
    AccountDelete {
        account: String,
        transfer_to: String,
    },
    ContractCreate {
        initial_balance: u64,
    },
    ContractCall {
        contract_id: String,
        amount: u64,
        call_data: Vec<u8>,
    },
    ContractDelete {
        contract_id: String,
    },
    TopicCreate {},
    TopicUpdate {
        topic_id: String,
    },
    TopicDelete {
        topic_id: String,
    },
    TopicMessageSubmit {
        topic_id: String,
        message: Vec<u8>,
    },
    FileCreate {},
    FileUpdate {
        file_id: String,
    },
    FileDelete {
        file_id: String,
    },
    FileAppend {
        file_id: String,
    },
    ScheduleCreate {},
    ScheduleSign {
        schedule_id: String,
    },
    ScheduleDelete {
        schedule_id: String,
    },
}

/// The full raw decode of a frozen transaction: its body plus the
/// timestamp fields every family carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTransactionEnvelope {
    pub valid_start_secs: Option<u64>,
    pub valid_duration_secs: Option<u64>,
    pub body: RawBody,
}

/// The external SDK boundary: turns frozen transaction bytes into a
/// [`RawTransactionEnvelope`]. Kept as a trait so the coordinator's own
/// logic never depends on a particular wire encoding.
pub trait TransactionCodec: Send + Sync {
    fn decode_raw(&self, bytes: &[u8]) -> Result<RawTransactionEnvelope, DecodeError>;
}

/// The shipped default codec, using the same BCS encoding the rest of this
/// workspace's crypto material is serialized with.
#[derive(Debug, Default, Clone, Copy)]
pub struct BcsTransactionCodec;

impl TransactionCodec for BcsTransactionCodec {
    fn decode_raw(&self, bytes: &[u8]) -> Result<RawTransactionEnvelope, DecodeError> {
        bcs::from_bytes(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))
    }
}

impl<C: TransactionCodec + ?Sized> TransactionCodec for std::sync::Arc<C> {
    fn decode_raw(&self, bytes: &[u8]) -> Result<RawTransactionEnvelope, DecodeError> {
        (**self).decode_raw(bytes)
    }
}
