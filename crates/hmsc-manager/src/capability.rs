use async_trait::async_trait;

pub use hmsc_crypto::Signer;
use hmsc_types::{ProtocolError, SessionId};

/// Capability for submitting a signed transaction to the chain. Kept
/// separate from [`Signer`] since a coordinator might verify signatures
/// locally but submit through a remote relay, or vice versa.
#[async_trait]
pub trait Network: Send + Sync {
    /// Submits `frozen_bytes` (already signed) and returns the network's
    /// receipt identifier on success.
    async fn submit(&self, frozen_bytes: &[u8]) -> anyhow::Result<String>;
}

/// The fixed, enumerated set of notable things that can happen to a
/// session. Deliberately closed rather than a free-form string/JSON event
/// bus, so every call site is exhaustively matched and a typo in an event
/// name cannot silently vanish.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    TransactionReceived,
    ParticipantConnected { participant_id: String },
    /// `eligible` is false when the reported public key is not in the
    /// session's `eligible_keys`; `set_ready` still records it, this just
    /// flags the broadcast so clients can warn rather than block.
    ParticipantReady {
        participant_id: String,
        public_key: String,
        eligible: bool,
    },
    ParticipantDisconnected { participant_id: String },
    ParticipantRejected { participant_id: String, reason: String },
    SignatureAccepted {
        public_key: String,
        signature_count: u32,
        threshold: u32,
        threshold_met: bool,
    },
    ThresholdMet { signature_count: u32, threshold: u32 },
    TransactionExecuted { receipt: String },
    SessionExpired,
    SessionCancelled,
    Error { error: ProtocolError },
}

/// Capability for observing session lifecycle events, e.g. to fan them out
/// over `hmsc-signaling`'s websocket connections.
#[async_trait]
pub trait OnSessionEvent: Send + Sync {
    async fn on_event(&self, session_id: &SessionId, event: SessionEvent);
}

/// An `OnSessionEvent` that does nothing, for tests that don't care about
/// the event stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

#[async_trait]
impl OnSessionEvent for NoopEventSink {
    async fn on_event(&self, _session_id: &SessionId, _event: SessionEvent) {}
}
