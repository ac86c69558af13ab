use std::sync::Arc;

use async_trait::async_trait;

use hmsc_manager::{OnSessionEvent, SessionEvent};
use hmsc_store::SessionStore;
use hmsc_types::SessionId;

use crate::close;
use crate::protocol::{FrozenTransaction, ServerMessage, SessionInfo, SessionStats};
use crate::registry::ConnectionRegistry;

/// Bridges `hmsc-manager`'s closed `SessionEvent` set onto wire
/// `ServerMessage`s and fans each one out to every connection attached to
/// the session. This is the only place the two vocabularies meet.
pub struct BroadcastEventSink {
    registry: Arc<ConnectionRegistry>,
    store: Arc<SessionStore>,
}

impl BroadcastEventSink {
    pub fn new(registry: Arc<ConnectionRegistry>, store: Arc<SessionStore>) -> Self {
        Self { registry, store }
    }

    fn fan_out(&self, session_id: &SessionId, message: ServerMessage) {
        let overflowed = self.registry.broadcast(session_id, message);
        for participant_id in overflowed {
            tracing::warn!(
                %session_id,
                %participant_id,
                "dropping slow consumer: outbound queue is full"
            );
            self.registry
                .close(session_id, &participant_id, close::BACKPRESSURE);
        }
    }
}

#[async_trait]
impl OnSessionEvent for BroadcastEventSink {
    async fn on_event(&self, session_id: &SessionId, event: SessionEvent) {
        match event {
            SessionEvent::TransactionReceived => {
                let Ok(session) = self.store.snapshot(session_id) else {
                    return;
                };
                let (Some(decoded), Some(frozen)) =
                    (session.tx_details.clone(), session.frozen_tx.as_deref())
                else {
                    return;
                };
                self.fan_out(
                    session_id,
                    ServerMessage::TransactionReceived {
                        frozen_transaction: FrozenTransaction::new(frozen),
                        tx_details: decoded,
                        metadata: (!session.metadata.is_empty()).then(|| session.metadata.clone()),
                        contract_interface: session.contract_abi.clone(),
                    },
                );
            }
            SessionEvent::ParticipantConnected { participant_id } => {
                let stats = self
                    .store
                    .snapshot(session_id)
                    .map(|s| SessionStats::from_session(&s))
                    .unwrap_or_default();
                self.fan_out(
                    session_id,
                    ServerMessage::ParticipantConnected {
                        participant_id,
                        stats,
                    },
                );
            }
            SessionEvent::ParticipantReady {
                participant_id,
                public_key,
                eligible: _,
            } => {
                let Ok(session) = self.store.snapshot(session_id) else {
                    return;
                };
                let stats = SessionStats::from_session(&session);
                let all_ready = session.participants.len() as u32 >= session.expected_participants
                    && session
                        .participants
                        .values()
                        .all(|p| p.status != hmsc_types::ParticipantStatus::Connected);
                self.fan_out(
                    session_id,
                    ServerMessage::ParticipantReady {
                        participant_id,
                        public_key: Some(public_key),
                        stats,
                        all_ready,
                    },
                );
            }
            SessionEvent::ParticipantDisconnected { participant_id } => {
                self.fan_out(
                    session_id,
                    ServerMessage::ParticipantDisconnected { participant_id },
                );
            }
            SessionEvent::ParticipantRejected {
                participant_id,
                reason,
            } => {
                self.fan_out(
                    session_id,
                    ServerMessage::SignatureRejected {
                        message: format!(
                            "participant {participant_id} rejected the transaction: {reason}"
                        ),
                        public_key: None,
                    },
                );
            }
            SessionEvent::SignatureAccepted {
                public_key,
                signature_count,
                threshold,
                threshold_met,
            } => {
                self.fan_out(
                    session_id,
                    ServerMessage::SignatureAccepted {
                        success: true,
                        public_key,
                        signatures_collected: signature_count,
                        signatures_required: threshold,
                        threshold_met,
                    },
                );
            }
            SessionEvent::ThresholdMet {
                signature_count,
                threshold,
            } => {
                self.fan_out(
                    session_id,
                    ServerMessage::ThresholdMet {
                        signatures_collected: signature_count,
                        signatures_required: threshold,
                    },
                );
            }
            SessionEvent::TransactionExecuted { receipt } => {
                self.fan_out(
                    session_id,
                    ServerMessage::TransactionExecuted {
                        transaction_id: session_id.to_string(),
                        status: "completed".to_string(),
                        receipt: Some(receipt),
                    },
                );
            }
            SessionEvent::SessionExpired => {
                self.fan_out(session_id, ServerMessage::SessionExpired {});
                self.registry
                    .close_session(session_id, close::SESSION_EXPIRED);
            }
            SessionEvent::SessionCancelled => {
                self.fan_out(
                    session_id,
                    ServerMessage::Error {
                        message: "session cancelled".to_string(),
                        code: Some("SESSION_CANCELLED".to_string()),
                    },
                );
                self.registry
                    .close_session(session_id, close::SESSION_CANCELLED);
            }
            SessionEvent::Error { error } => {
                self.fan_out(session_id, ServerMessage::error(&error));
            }
        }
    }
}

/// Builds the `sessionInfo` snapshot sent with `AUTH_SUCCESS`.
pub fn session_info_for(store: &SessionStore, session_id: &SessionId) -> Option<SessionInfo> {
    store
        .snapshot(session_id)
        .ok()
        .map(|s| SessionInfo::from_session(&s))
}
