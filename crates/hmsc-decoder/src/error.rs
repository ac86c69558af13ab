use thiserror::Error;

/// Errors raised while decoding a frozen transaction or checking it against
/// its declared ABI. Each maps to exactly one `hmsc_types::ProtocolError`
/// wire code, kept distinct here so tests can assert on the precise cause.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("transaction bytes are malformed: {0}")]
    Malformed(String),

    #[error("transaction body does not match any known transaction family")]
    UnknownType,

    #[error(
        "contract call-data selector {actual} does not match any function declared in the ABI"
    )]
    SelectorMismatch { actual: String },
}
