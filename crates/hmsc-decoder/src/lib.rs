//! Transaction decoding: the `TransactionCodec` boundary to the external
//! transaction encoding, structural classification into the closed
//! `TxDetails` enumeration, the contract-call selector safety check, and
//! metadata cross-validation.

pub mod abi;
pub mod classify;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod raw;
pub mod selector;

pub use abi::decode_params;
pub use classify::TransactionDecoder;
pub use error::DecodeError;
pub use extract::{extract_accounts, extract_amounts};
pub use metadata::validate_metadata;
pub use raw::{BcsTransactionCodec, RawAmount, RawBody, RawTransactionEnvelope, TransactionCodec};
pub use selector::function_selector;
