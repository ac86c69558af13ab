use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use hmsc_crypto::{PublicKey, Signature};
use hmsc_decoder::{BcsTransactionCodec, RawAmount, RawBody, RawTransactionEnvelope};
use hmsc_manager::{
    Clock, Network, OnSessionEvent, SessionEvent, SessionManager, SessionManagerConfig, Signer,
};
use hmsc_store::SessionStore;
use hmsc_timer::TimerController;
use hmsc_types::{Metadata, ParticipantRole, ProtocolError, SessionStatus};

struct FakeClock(AtomicU64);

impl Clock for FakeClock {
    fn now_secs(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

struct AlwaysValidSigner;

#[async_trait]
impl Signer for AlwaysValidSigner {
    async fn verify(&self, _public_key: &PublicKey, _message: &[u8], _signature: &Signature) -> bool {
        true
    }
}

struct AlwaysInvalidSigner;

#[async_trait]
impl Signer for AlwaysInvalidSigner {
    async fn verify(&self, _public_key: &PublicKey, _message: &[u8], _signature: &Signature) -> bool {
        false
    }
}

struct FakeNetwork;

#[async_trait]
impl Network for FakeNetwork {
    async fn submit(&self, _frozen_bytes: &[u8]) -> anyhow::Result<String> {
        Ok("receipt-123".to_string())
    }
}

#[derive(Default)]
struct EventCollector {
    events: Mutex<Vec<SessionEvent>>,
}

#[async_trait]
impl OnSessionEvent for EventCollector {
    async fn on_event(&self, _session_id: &hmsc_types::SessionId, event: SessionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn key(byte: u8) -> PublicKey {
    PublicKey::from_bytes(&[byte; 32]).unwrap()
}

fn transfer_bytes() -> Vec<u8> {
    bcs::to_bytes(&RawTransactionEnvelope {
        valid_start_secs: Some(1_700_000_000),
        valid_duration_secs: Some(120),
        body: RawBody::CryptoTransfer {
            transfers: vec![RawAmount {
                account: "0.0.1001".into(),
                value: -10,
            }],
        },
    })
    .unwrap()
}

fn manager_with(
    signer: Arc<dyn Signer>,
    events: Arc<EventCollector>,
    clock: Arc<FakeClock>,
) -> SessionManager<BcsTransactionCodec> {
    SessionManager::new(
        Arc::new(SessionStore::new()),
        TimerController::new(),
        BcsTransactionCodec,
        signer,
        Arc::new(FakeNetwork),
        events,
        clock,
        SessionManagerConfig {
            session_ttl_secs: 600,
            tx_ttl_secs: 300,
        },
    )
}

#[tokio::test]
async fn two_of_three_threshold_executes_the_transaction() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysValidSigner), Arc::clone(&events), clock);

    let keys = vec![key(1), key(2), key(3)];
    let session_id = manager
        .create_session(Some("1234".into()), 2, keys.clone(), 3, 600_000)
        .unwrap();

    let p1 = manager
        .authenticate(&session_id, "1234", ParticipantRole::Participant, None)
        .await
        .unwrap();
    manager.set_ready(&session_id, &p1, keys[0]).await.unwrap();

    manager
        .inject_transaction(&session_id, transfer_bytes(), Metadata::new(), None)
        .await
        .unwrap();

    let first = manager
        .submit_signature(&session_id, keys[0], Signature::from_bytes(&[1u8; 64]).unwrap())
        .await
        .unwrap();
    assert!(!first);
    assert_eq!(
        manager.store().snapshot(&session_id).unwrap().status,
        SessionStatus::Signing
    );

    let second = manager
        .submit_signature(&session_id, keys[1], Signature::from_bytes(&[2u8; 64]).unwrap())
        .await
        .unwrap();
    assert!(second);

    let snapshot = manager.store().snapshot(&session_id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Completed);
    assert_eq!(snapshot.signatures.len(), 2);
}

#[tokio::test]
async fn duplicate_signature_is_rejected() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysValidSigner), events, clock);

    let keys = vec![key(1), key(2)];
    let session_id = manager
        .create_session(Some("1234".into()), 2, keys.clone(), 2, 600_000)
        .unwrap();
    manager
        .inject_transaction(&session_id, transfer_bytes(), Metadata::new(), None)
        .await
        .unwrap();

    manager
        .submit_signature(&session_id, keys[0], Signature::from_bytes(&[1u8; 64]).unwrap())
        .await
        .unwrap();

    let err = manager
        .submit_signature(&session_id, keys[0], Signature::from_bytes(&[9u8; 64]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, ProtocolError::DuplicateSignature);
}

#[tokio::test]
async fn invalid_signature_is_rejected_and_not_recorded() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysInvalidSigner), events, clock);

    let keys = vec![key(1), key(2)];
    let session_id = manager
        .create_session(Some("1234".into()), 2, keys.clone(), 2, 600_000)
        .unwrap();
    manager
        .inject_transaction(&session_id, transfer_bytes(), Metadata::new(), None)
        .await
        .unwrap();

    let err = manager
        .submit_signature(&session_id, keys[0], Signature::from_bytes(&[1u8; 64]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, ProtocolError::InvalidSignature);
    assert!(manager
        .store()
        .snapshot(&session_id)
        .unwrap()
        .signatures
        .is_empty());
}

#[tokio::test]
async fn ineligible_key_is_recorded_but_flagged_and_still_cannot_sign() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysValidSigner), events, clock);

    let keys = vec![key(1), key(2)];
    let session_id = manager
        .create_session(Some("1234".into()), 2, keys.clone(), 2, 600_000)
        .unwrap();

    let stranger = key(99);
    let participant_id = manager
        .authenticate(&session_id, "1234", ParticipantRole::Participant, None)
        .await
        .unwrap();

    let eligible = manager
        .set_ready(&session_id, &participant_id, stranger)
        .await
        .unwrap();
    assert!(!eligible);

    let snapshot = manager.store().snapshot(&session_id).unwrap();
    assert_eq!(
        snapshot.participants[&participant_id].public_key,
        Some(stranger)
    );

    manager
        .inject_transaction(&session_id, transfer_bytes(), Metadata::new(), None)
        .await
        .unwrap();

    let err = manager
        .submit_signature(&session_id, stranger, Signature::from_bytes(&[1u8; 64]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, ProtocolError::NotEligible);
}

#[tokio::test]
async fn wrong_pin_fails_authentication() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysValidSigner), events, clock);

    let keys = vec![key(1)];
    let session_id = manager
        .create_session(Some("1234".into()), 1, keys.clone(), 1, 600_000)
        .unwrap();

    let err = manager
        .authenticate(&session_id, "0000", ParticipantRole::Participant, None)
        .await
        .unwrap_err();
    assert_eq!(err, ProtocolError::AuthFailed);
}

#[tokio::test]
async fn pin_less_session_authenticates_regardless_of_supplied_pin() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysValidSigner), events, clock);

    let keys = vec![key(1)];
    let session_id = manager
        .create_session(None, 1, keys.clone(), 1, 600_000)
        .unwrap();

    manager
        .authenticate(&session_id, "whatever", ParticipantRole::Participant, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn reconnecting_participant_keeps_prior_signature() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysValidSigner), events, clock);

    let keys = vec![key(1), key(2), key(3)];
    let session_id = manager
        .create_session(Some("1234".into()), 2, keys.clone(), 3, 600_000)
        .unwrap();
    manager
        .inject_transaction(&session_id, transfer_bytes(), Metadata::new(), None)
        .await
        .unwrap();

    manager
        .submit_signature(&session_id, keys[0], Signature::from_bytes(&[1u8; 64]).unwrap())
        .await
        .unwrap();

    // Participant reconnects: a fresh authenticate call, new ParticipantId,
    // but the signature recorded against their public key survives.
    let _new_participant = manager
        .authenticate(&session_id, "1234", ParticipantRole::Participant, None)
        .await
        .unwrap();

    let snapshot = manager.store().snapshot(&session_id).unwrap();
    assert!(snapshot.has_signature_from(&keys[0]));
    assert_eq!(snapshot.signatures.len(), 1);
}

#[tokio::test]
async fn rejecting_below_threshold_cancels_the_session() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysValidSigner), Arc::clone(&events), clock);

    let keys = vec![key(1), key(2)];
    let session_id = manager
        .create_session(Some("1234".into()), 2, keys.clone(), 2, 600_000)
        .unwrap();
    manager
        .inject_transaction(&session_id, transfer_bytes(), Metadata::new(), None)
        .await
        .unwrap();

    let p1 = manager
        .authenticate(&session_id, "1234", ParticipantRole::Participant, None)
        .await
        .unwrap();
    manager.set_ready(&session_id, &p1, keys[0]).await.unwrap();

    manager
        .reject_transaction(&session_id, &p1, "looks wrong".to_string())
        .await
        .unwrap();

    let snapshot = manager.store().snapshot(&session_id).unwrap();
    assert_eq!(snapshot.status, SessionStatus::Cancelled);
    assert!(events
        .events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, SessionEvent::SessionCancelled)));
}

#[tokio::test(start_paused = true)]
async fn session_expires_while_signing_and_blocks_further_signatures() {
    let events = Arc::new(EventCollector::default());
    let clock = Arc::new(FakeClock(AtomicU64::new(1_000)));
    let manager = manager_with(Arc::new(AlwaysValidSigner), Arc::clone(&events), clock);

    let keys = vec![key(1), key(2)];
    let session_id = manager
        .create_session(Some("1234".into()), 2, keys.clone(), 2, 600_000)
        .unwrap();
    manager
        .inject_transaction(&session_id, transfer_bytes(), Metadata::new(), None)
        .await
        .unwrap();
    manager
        .submit_signature(&session_id, keys[0], Signature::from_bytes(&[1u8; 64]).unwrap())
        .await
        .unwrap();
    assert_eq!(
        manager.store().snapshot(&session_id).unwrap().status,
        SessionStatus::Signing
    );

    tokio::time::advance(std::time::Duration::from_secs(301)).await;
    tokio::task::yield_now().await;

    assert_eq!(
        manager.store().snapshot(&session_id).unwrap().status,
        SessionStatus::Expired
    );

    let err = manager
        .submit_signature(&session_id, keys[1], Signature::from_bytes(&[2u8; 64]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err, ProtocolError::SessionExpired);
}
