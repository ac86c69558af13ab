use thiserror::Error;

/// The wire error taxonomy. Each variant's `code()` is the exact string sent
/// to participants in a `ServerMessage::Error` payload, so renaming a
/// variant without updating `code()` would silently break the protocol —
/// tests pin every code.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("authentication failed")]
    AuthFailed,

    #[error("participant is not in the session's eligible key set")]
    NotEligible,

    #[error("participant has already submitted a signature for this transaction")]
    DuplicateSignature,

    #[error("signature does not verify against the frozen transaction bytes")]
    InvalidSignature,

    #[error("transaction bytes could not be decoded: {0}")]
    DecodeFail(String),

    #[error("contract call-data selector does not match the declared ABI function")]
    SelectorMismatch,

    #[error("transaction type is not one this coordinator understands")]
    UnknownType,

    #[error("session has expired")]
    SessionExpired,

    #[error("session is not currently accepting signatures")]
    SessionNotAcceptingSignatures,

    #[error("submitting the transaction to the network failed: {0}")]
    NetworkError(String),

    #[error("message type not recognized")]
    UnknownMessage,
}

impl ProtocolError {
    /// The stable wire code, sent verbatim in `ServerMessage::Error::code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthFailed => "AUTH_FAILED",
            Self::NotEligible => "NOT_ELIGIBLE",
            Self::DuplicateSignature => "DUPLICATE_SIGNATURE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::DecodeFail(_) => "DECODE_FAIL",
            Self::SelectorMismatch => "SELECTOR_MISMATCH",
            Self::UnknownType => "UNKNOWN_TYPE",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::SessionNotAcceptingSignatures => "SESSION_NOT_ACCEPTING_SIGNATURES",
            Self::NetworkError(_) => "NETWORK_ERROR",
            Self::UnknownMessage => "UNKNOWN_MESSAGE",
        }
    }
}
