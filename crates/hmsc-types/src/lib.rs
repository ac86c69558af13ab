//! Shared data model for the coordinator: session/participant state, the
//! decoded-transaction view produced by `hmsc-decoder`, and the wire error
//! taxonomy every crate reports through.

pub mod error;
pub mod ids;
pub mod participant;
pub mod session;
pub mod tx;

pub use error::ProtocolError;
pub use ids::{ParticipantId, SessionId};
pub use participant::{Participant, ParticipantRole, ParticipantStatus};
pub use session::{Session, SessionStatus};
pub use tx::{
    AbiFunction, AbiParam, AccountRef, Amount, ContractAbi, DecodedTx, Metadata,
    MetadataValidation, TxDetails,
};
