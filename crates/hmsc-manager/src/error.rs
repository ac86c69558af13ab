use hmsc_decoder::DecodeError;
use hmsc_store::StoreError;
use hmsc_types::ProtocolError;

/// Folds every failure a `SessionManager` operation can hit down to the
/// wire taxonomy, so callers in `hmsc-signaling` never need to match on
/// more than one error type to build a `ServerMessage::Error`.
pub fn decode_error_to_protocol(err: DecodeError) -> ProtocolError {
    match err {
        DecodeError::Malformed(msg) => ProtocolError::DecodeFail(msg),
        DecodeError::UnknownType => ProtocolError::UnknownType,
        DecodeError::SelectorMismatch { .. } => ProtocolError::SelectorMismatch,
    }
}

pub fn store_error_to_protocol(err: StoreError) -> ProtocolError {
    match err {
        StoreError::NotFound(_) => ProtocolError::SessionExpired,
        StoreError::AlreadyExists(_) => ProtocolError::SessionExpired,
    }
}
