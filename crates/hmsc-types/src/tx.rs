//! The decoded-transaction view shared between `hmsc-decoder` (which
//! produces it) and `hmsc-manager`/`hmsc-signaling` (which display and
//! broadcast it). Kept in this crate, rather than in `hmsc-decoder`, so that
//! `Session::tx_details` does not need a dependency cycle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A chain account identifier. Left as an opaque string (e.g. Hedera's
/// `0.0.1234` shard.realm.num form) rather than a fixed-width byte array,
/// since the coordinator never need interpret it beyond comparison/display.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountRef(pub String);

impl std::fmt::Display for AccountRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single credit/debit leg extracted from a decoded transaction, used for
/// both display and metadata cross-checking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub account: AccountRef,
    /// Negative for a debit, positive for a credit, in the chain's smallest
    /// unit (e.g. tinybar).
    pub value: i128,
}

/// A contract function signature and its derived selector, supplied
/// alongside a contract-execute transaction so the decoder can verify the
/// actual call data's selector against it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbiFunction {
    pub name: String,
    pub param_types: Vec<String>,
}

impl AbiFunction {
    /// The canonical `name(type1,type2)` signature string ABI selectors are
    /// derived from.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.param_types.join(","))
    }
}

/// A single ABI-decoded call argument, exposed once a contract-execute
/// transaction's selector has been verified against a known function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbiParam {
    pub name: String,
    pub type_name: String,
    /// Decoded value rendered as a display string (decimal for integers,
    /// `0x`-prefixed hex for addresses/bytes/unsupported types).
    pub value: String,
}

/// The contract ABI supplied alongside a contract-execute transaction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractAbi {
    pub functions: Vec<AbiFunction>,
}

/// The closed enumeration of transaction families this coordinator
/// understands, with exactly the fields each family exposes. Identified by
/// `hmsc_decoder` via structural predicates over which fields are present,
/// never by a type name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TxDetails {
    Transfer {
        transfers: Vec<Amount>,
    },
    TokenAssociate {
        account: AccountRef,
        token_ids: Vec<String>,
    },
    TokenDissociate {
        account: AccountRef,
        token_ids: Vec<String>,
    },
    TokenCreate {
        name: String,
        symbol: String,
        initial_supply: u64,
        treasury: AccountRef,
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
        account: AccountRef,
    },
    AccountDelete {
        account: AccountRef,
        transfer_to: AccountRef,
    },
    ContractCreate {
        initial_balance: u64,
    },
    ContractExecute {
        contract_id: AccountRef,
        amount: u64,
        /// First 4 bytes of `call_data`, isolated regardless of whether an
        /// ABI was supplied.
        actual_selector: [u8; 4],
        call_data: Vec<u8>,
        /// Populated only once the ABI/selector cross-check in
        /// `hmsc-decoder` has succeeded.
        function_name: Option<String>,
        /// ABI-decoded call arguments, in declaration order. Empty unless
        /// `selector_verified` is true.
        params: Vec<AbiParam>,
        selector_verified: bool,
    },
    ContractDelete {
        contract_id: AccountRef,
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
        message_len: usize,
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

impl TxDetails {
    /// The stable type-tag string broadcast to participants. Derived from
    /// the shape the codec handed back, not from `std::any` reflection.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "Transfer",
            Self::TokenAssociate { .. } => "TokenAssociate",
            Self::TokenDissociate { .. } => "TokenDissociate",
            Self::TokenCreate { .. } => "TokenCreate",
            Self::TokenMint { .. } => "TokenMint",
            Self::TokenBurn { .. } => "TokenBurn",
            Self::TokenUpdate { .. } => "TokenUpdate",
            Self::TokenDelete { .. } => "TokenDelete",
            Self::AccountCreate { .. } => "AccountCreate",
            Self::AccountUpdate { .. } => "AccountUpdate",
            Self::AccountDelete { .. } => "AccountDelete",
            Self::ContractCreate { .. } => "ContractCreate",
            Self::ContractExecute { .. } => "ContractExecute",
            Self::ContractDelete { .. } => "ContractDelete",
            Self::TopicCreate {} => "TopicCreate",
            Self::TopicUpdate { .. } => "TopicUpdate",
            Self::TopicDelete { .. } => "TopicDelete",
            Self::TopicMessageSubmit { .. } => "TopicMessageSubmit",
            Self::FileCreate {} => "FileCreate",
            Self::FileUpdate { .. } => "FileUpdate",
            Self::FileDelete { .. } => "FileDelete",
            Self::FileAppend { .. } => "FileAppend",
            Self::ScheduleCreate {} => "ScheduleCreate",
            Self::ScheduleSign { .. } => "ScheduleSign",
            Self::ScheduleDelete { .. } => "ScheduleDelete",
        }
    }

    /// Function name for a contract-execute transaction, if decoded.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::ContractExecute { function_name, .. } => function_name.as_deref(),
            _ => None,
        }
    }
}

/// The trustworthy, fully-decoded view of a frozen transaction. Produced by
/// `hmsc_decoder::TransactionDecoder::decode` and never mutated afterward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodedTx {
    pub type_tag: String,
    /// Lowercase hex SHA-256 of the exact frozen bytes.
    pub full_checksum: String,
    /// First 16 hex characters of `full_checksum`.
    pub short_checksum: String,
    pub valid_start_secs: Option<u64>,
    pub valid_duration_secs: Option<u64>,
    pub details: TxDetails,
}

/// The result of cross-checking coordinator-supplied metadata against a
/// `DecodedTx`. Pure and idempotent: equal `(details, metadata)` pairs
/// always yield an equal `MetadataValidation`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataValidation {
    pub valid: bool,
    pub warnings: Vec<String>,
    pub mismatches: BTreeMap<String, String>,
}

pub type Metadata = BTreeMap<String, serde_json::Value>;
