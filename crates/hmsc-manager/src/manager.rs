use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use hmsc_crypto::pin::pins_match;
use hmsc_crypto::{PublicKey, Signature};
use hmsc_decoder::{validate_metadata, TransactionCodec, TransactionDecoder};
use hmsc_store::{MutateError, SessionStore};
use hmsc_timer::TimerController;
use hmsc_types::{
    ContractAbi, DecodedTx, Metadata, MetadataValidation, Participant, ParticipantId,
    ParticipantRole, ParticipantStatus, ProtocolError, Session, SessionId, SessionStatus,
};

use crate::capability::{Network, OnSessionEvent, SessionEvent, Signer};
use crate::clock::Clock;
use crate::config::SessionManagerConfig;
use crate::error::{decode_error_to_protocol, store_error_to_protocol};
use crate::retry::submit_with_retry;

/// The session state machine. Holds no transport-level concerns (those live
/// in `hmsc-signaling`); every public method here corresponds to one
/// coordinator-facing operation and leaves the session in a consistent
/// state even if the caller never calls another method again.
pub struct SessionManager<C: TransactionCodec> {
    store: Arc<SessionStore>,
    timers: Arc<TimerController>,
    decoder: TransactionDecoder<C>,
    signer: Arc<dyn Signer>,
    network: Arc<dyn Network>,
    events: Arc<dyn OnSessionEvent>,
    clock: Arc<dyn Clock>,
    config: SessionManagerConfig,
}

fn unwrap_mutate(err: MutateError<ProtocolError>) -> ProtocolError {
    match err {
        MutateError::Store(e) => store_error_to_protocol(e),
        MutateError::Inner(e) => e,
    }
}

fn guard_active(session: &Session, now: u64) -> Result<(), ProtocolError> {
    if session.status.is_terminal() {
        return Err(ProtocolError::SessionExpired);
    }
    if session.expires_at <= now {
        return Err(ProtocolError::SessionExpired);
    }
    Ok(())
}

impl<C: TransactionCodec + 'static> SessionManager<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<SessionStore>,
        timers: Arc<TimerController>,
        codec: C,
        signer: Arc<dyn Signer>,
        network: Arc<dyn Network>,
        events: Arc<dyn OnSessionEvent>,
        clock: Arc<dyn Clock>,
        config: SessionManagerConfig,
    ) -> Self {
        Self {
            store,
            timers,
            decoder: TransactionDecoder::new(codec),
            signer,
            network,
            events,
            clock,
            config,
        }
    }

    /// Creates a new session awaiting participants, and schedules its
    /// expiry timer `timeout_ms` from now.
    #[instrument(skip(self, eligible_keys))]
    pub fn create_session(
        &self,
        pin: Option<String>,
        threshold: u32,
        eligible_keys: Vec<PublicKey>,
        expected_participants: u32,
        timeout_ms: u64,
    ) -> Result<SessionId, ProtocolError> {
        let session_id = SessionId::generate();
        let now = self.clock.now_secs();
        let timeout_secs = timeout_ms.div_ceil(1000).max(1);
        let expires_at = now + timeout_secs;

        let session = Session::new(
            session_id.clone(),
            pin,
            threshold,
            eligible_keys,
            expected_participants,
            now,
            expires_at,
        );
        self.store
            .insert(session)
            .map_err(store_error_to_protocol)?;

        self.schedule_session_expiry(session_id.clone(), timeout_secs);
        Ok(session_id)
    }

    fn schedule_session_expiry(&self, session_id: SessionId, delay_secs: u64) {
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        let timer_name = format!("session:{session_id}:expiry");
        let delay = Duration::from_secs(delay_secs);
        let sid = session_id.clone();

        let _ = self.timers.schedule_once(timer_name, delay, move || {
            let fired = store.mutate(&sid, |session| -> Result<bool, ()> {
                if !session.status.is_terminal() {
                    session.status = SessionStatus::Expired;
                    Ok(true)
                } else {
                    Ok(false)
                }
            });
            if let Ok(true) = fired {
                let events = Arc::clone(&events);
                let sid = sid.clone();
                tokio::spawn(async move {
                    events.on_event(&sid, SessionEvent::SessionExpired).await;
                });
            }
        });
    }

    /// Authenticates a participant against a session's PIN (a session with
    /// no PIN configured accepts any). Its public key is not known yet: that
    /// arrives later via `set_ready`, since signatures are keyed by public
    /// key rather than by this call's `ParticipantId`.
    #[instrument(skip(self, pin))]
    pub async fn authenticate(
        &self,
        session_id: &SessionId,
        pin: &str,
        _role: ParticipantRole,
        label: Option<String>,
    ) -> Result<ParticipantId, ProtocolError> {
        let now = self.clock.now_secs();
        let participant_id = ParticipantId::generate();

        self.store
            .mutate(session_id, |session| -> Result<(), ProtocolError> {
                guard_active(session, now)?;
                if let Some(expected) = &session.pin {
                    if !pins_match(pin, expected) {
                        return Err(ProtocolError::AuthFailed);
                    }
                }
                session.participants.insert(
                    participant_id.clone(),
                    Participant::new(participant_id.clone(), label, now),
                );
                Ok(())
            })
            .map_err(unwrap_mutate)?;

        self.events
            .on_event(
                session_id,
                SessionEvent::ParticipantConnected {
                    participant_id: participant_id.to_string(),
                },
            )
            .await;

        Ok(participant_id)
    }

    /// Records a participant's signing key and marks it ready to receive the
    /// session's transaction. A key outside `eligible_keys` is still
    /// recorded, never rejected here; the returned flag (and the broadcast
    /// event) tells callers to surface a warning instead.
    #[instrument(skip(self))]
    pub async fn set_ready(
        &self,
        session_id: &SessionId,
        participant_id: &ParticipantId,
        public_key: PublicKey,
    ) -> Result<bool, ProtocolError> {
        let now = self.clock.now_secs();
        let eligible = self
            .store
            .mutate(session_id, |session| -> Result<bool, ProtocolError> {
                guard_active(session, now)?;
                let eligible = session.is_eligible(&public_key);
                let participant = session
                    .participants
                    .get_mut(participant_id)
                    .ok_or(ProtocolError::NotEligible)?;
                participant.public_key = Some(public_key);
                participant.status = ParticipantStatus::Ready;
                Ok(eligible)
            })
            .map_err(unwrap_mutate)?;

        self.events
            .on_event(
                session_id,
                SessionEvent::ParticipantReady {
                    participant_id: participant_id.to_string(),
                    public_key: public_key.to_hex(),
                    eligible,
                },
            )
            .await;
        Ok(eligible)
    }

    /// Marks a participant disconnected. Idempotent: calling this on an
    /// already-disconnected (or unknown) participant does nothing and
    /// raises no event.
    #[instrument(skip(self))]
    pub async fn disconnect_participant(&self, session_id: &SessionId, participant_id: &ParticipantId) {
        let changed = self.store.mutate(session_id, |session| -> Result<bool, ()> {
            match session.participants.get_mut(participant_id) {
                Some(p) if p.status != ParticipantStatus::Disconnected => {
                    p.status = ParticipantStatus::Disconnected;
                    Ok(true)
                }
                _ => Ok(false),
            }
        });

        if let Ok(true) = changed {
            self.events
                .on_event(
                    session_id,
                    SessionEvent::ParticipantDisconnected {
                        participant_id: participant_id.to_string(),
                    },
                )
                .await;
        }
    }

    /// Decodes and attaches a transaction to a waiting session, moving it
    /// into `TransactionReceived`. Decoding happens before the session's
    /// write lock is taken, so a session that expires in the meantime is
    /// caught by the status re-check inside the mutation rather than having
    /// a stale transaction attached after the fact.
    #[instrument(skip(self, frozen_bytes, metadata, contract_abi))]
    pub async fn inject_transaction(
        &self,
        session_id: &SessionId,
        frozen_bytes: Vec<u8>,
        metadata: Metadata,
        contract_abi: Option<ContractAbi>,
    ) -> Result<(DecodedTx, MetadataValidation), ProtocolError> {
        let decoded = self
            .decoder
            .decode(&frozen_bytes, contract_abi.as_ref())
            .map_err(decode_error_to_protocol)?;
        let validation = validate_metadata(&decoded, &metadata);

        let now = self.clock.now_secs();
        let tx_expires_at = now + self.config.tx_ttl_secs;

        self.store
            .mutate(session_id, |session| -> Result<(), ProtocolError> {
                guard_active(session, now)?;
                if session.status != SessionStatus::Waiting {
                    return Err(ProtocolError::SessionNotAcceptingSignatures);
                }
                session.frozen_tx = Some(frozen_bytes);
                session.tx_details = Some(decoded.clone());
                session.metadata = metadata;
                session.contract_abi = contract_abi;
                session.status = SessionStatus::TransactionReceived;
                session.tx_expires_at = Some(tx_expires_at);
                Ok(())
            })
            .map_err(unwrap_mutate)?;

        self.schedule_tx_expiry(session_id.clone(), tx_expires_at.saturating_sub(now));
        self.events
            .on_event(session_id, SessionEvent::TransactionReceived)
            .await;

        Ok((decoded, validation))
    }

    fn schedule_tx_expiry(&self, session_id: SessionId, delay_secs: u64) {
        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.events);
        let timer_name = format!("session:{session_id}:tx_expiry");
        let sid = session_id.clone();

        let _ = self
            .timers
            .schedule_once(timer_name, Duration::from_secs(delay_secs), move || {
                let fired = store.mutate(&sid, |session| -> Result<bool, ()> {
                    if matches!(
                        session.status,
                        SessionStatus::TransactionReceived | SessionStatus::Signing
                    ) {
                        session.status = SessionStatus::Expired;
                        Ok(true)
                    } else {
                        Ok(false)
                    }
                });
                if let Ok(true) = fired {
                    let events = Arc::clone(&events);
                    let sid = sid.clone();
                    tokio::spawn(async move {
                        events.on_event(&sid, SessionEvent::SessionExpired).await;
                    });
                }
            });
    }

    /// Verifies and records a participant's signature over the session's
    /// frozen transaction bytes. Returns whether this signature brought the
    /// session up to its threshold; if so, execution has already been
    /// attempted by the time this returns.
    #[instrument(skip(self, signature))]
    pub async fn submit_signature(
        &self,
        session_id: &SessionId,
        public_key: PublicKey,
        signature: Signature,
    ) -> Result<bool, ProtocolError> {
        let now = self.clock.now_secs();
        let snapshot = self
            .store
            .snapshot(session_id)
            .map_err(store_error_to_protocol)?;
        guard_active(&snapshot, now)?;
        if !snapshot.status.accepts_signatures() {
            return Err(ProtocolError::SessionNotAcceptingSignatures);
        }
        if !snapshot.is_eligible(&public_key) {
            return Err(ProtocolError::NotEligible);
        }
        if snapshot.has_signature_from(&public_key) {
            return Err(ProtocolError::DuplicateSignature);
        }
        let frozen_tx = snapshot
            .frozen_tx
            .clone()
            .ok_or(ProtocolError::SessionNotAcceptingSignatures)?;

        if !self.signer.verify(&public_key, &frozen_tx, &signature).await {
            return Err(ProtocolError::InvalidSignature);
        }

        let (signature_count, threshold) = self
            .store
            .mutate(session_id, |session| -> Result<(u32, u32), ProtocolError> {
                guard_active(session, now)?;
                if !session.status.accepts_signatures() {
                    return Err(ProtocolError::SessionNotAcceptingSignatures);
                }
                if session.has_signature_from(&public_key) {
                    return Err(ProtocolError::DuplicateSignature);
                }
                session.signatures.insert(public_key, signature);
                for participant in session.participants.values_mut() {
                    if participant.public_key == Some(public_key) {
                        participant.status = ParticipantStatus::Signed;
                    }
                }
                if session.status == SessionStatus::TransactionReceived {
                    session.status = SessionStatus::Signing;
                }
                Ok((session.signatures.len() as u32, session.threshold))
            })
            .map_err(unwrap_mutate)?;

        let threshold_met = signature_count >= threshold;

        self.events
            .on_event(
                session_id,
                SessionEvent::SignatureAccepted {
                    public_key: public_key.to_hex(),
                    signature_count,
                    threshold,
                    threshold_met,
                },
            )
            .await;

        if threshold_met {
            self.timers
                .cancel_by_prefix(&format!("session:{session_id}:tx_expiry"));
            self.store
                .mutate(session_id, |session| -> Result<(), ProtocolError> {
                    session.status = SessionStatus::Executing;
                    Ok(())
                })
                .map_err(unwrap_mutate)?;
            self.events
                .on_event(
                    session_id,
                    SessionEvent::ThresholdMet {
                        signature_count,
                        threshold,
                    },
                )
                .await;
            self.execute_transaction(session_id).await?;
        }

        Ok(threshold_met)
    }

    /// Records a participant's explicit rejection, with its stated reason.
    /// If the remaining non-rejected eligible participants can no longer
    /// reach threshold, the session is cancelled immediately.
    #[instrument(skip(self, reason))]
    pub async fn reject_transaction(
        &self,
        session_id: &SessionId,
        participant_id: &ParticipantId,
        reason: String,
    ) -> Result<(), ProtocolError> {
        let now = self.clock.now_secs();
        let cancelled = self
            .store
            .mutate(session_id, |session| -> Result<bool, ProtocolError> {
                guard_active(session, now)?;
                let participant = session
                    .participants
                    .get_mut(participant_id)
                    .ok_or(ProtocolError::NotEligible)?;
                participant.status = ParticipantStatus::Rejected;

                let rejected_keys: HashSet<PublicKey> = session
                    .participants
                    .values()
                    .filter(|p| p.status == ParticipantStatus::Rejected)
                    .filter_map(|p| p.public_key)
                    .collect();
                let already_signed = session.signatures.len() as u32;
                let remaining_possible = session
                    .eligible_keys
                    .iter()
                    .filter(|k| !rejected_keys.contains(k) && !session.signatures.contains_key(k))
                    .count() as u32;

                if session.status.accepts_signatures()
                    && already_signed + remaining_possible < session.threshold
                {
                    session.status = SessionStatus::Cancelled;
                    Ok(true)
                } else {
                    Ok(false)
                }
            })
            .map_err(unwrap_mutate)?;

        self.events
            .on_event(
                session_id,
                SessionEvent::ParticipantRejected {
                    participant_id: participant_id.to_string(),
                    reason,
                },
            )
            .await;

        if cancelled {
            self.timers.cancel_by_prefix(&format!("session:{session_id}"));
            self.events
                .on_event(session_id, SessionEvent::SessionCancelled)
                .await;
        }

        Ok(())
    }

    /// Submits the session's signed transaction to the network, retrying
    /// transient failures. On success the session moves to `Completed`; on
    /// failure it remains `Executing` so a caller can retry.
    #[instrument(skip(self))]
    pub async fn execute_transaction(&self, session_id: &SessionId) -> Result<String, ProtocolError> {
        let snapshot = self
            .store
            .snapshot(session_id)
            .map_err(store_error_to_protocol)?;
        if snapshot.status != SessionStatus::Executing {
            return Err(ProtocolError::SessionNotAcceptingSignatures);
        }
        let frozen_tx = snapshot
            .frozen_tx
            .ok_or(ProtocolError::SessionNotAcceptingSignatures)?;

        match submit_with_retry(self.network.as_ref(), &frozen_tx).await {
            Ok(receipt) => {
                self.store
                    .mutate(session_id, |session| -> Result<(), ProtocolError> {
                        session.status = SessionStatus::Completed;
                        Ok(())
                    })
                    .map_err(unwrap_mutate)?;
                self.timers.cancel_by_prefix(&format!("session:{session_id}"));
                self.events
                    .on_event(
                        session_id,
                        SessionEvent::TransactionExecuted {
                            receipt: receipt.clone(),
                        },
                    )
                    .await;
                Ok(receipt)
            }
            Err(err) => {
                let protocol_err = ProtocolError::NetworkError(err.to_string());
                self.events
                    .on_event(
                        session_id,
                        SessionEvent::Error {
                            error: protocol_err.clone(),
                        },
                    )
                    .await;
                Err(protocol_err)
            }
        }
    }

    /// Sweeps every session past its `expires_at` into `Expired`. Intended
    /// to be wired to a periodic timer by the caller (e.g.
    /// `hmsc-signaling`'s server loop), since the manager itself holds no
    /// self-referential `Arc`.
    pub fn sweep_expired(&self) -> Vec<SessionId> {
        self.store.sweep_expired(self.clock.now_secs())
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}
