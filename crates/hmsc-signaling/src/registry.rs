use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Notify};

use hmsc_types::{ParticipantId, SessionId};

use crate::close;
use crate::protocol::ServerMessage;
use crate::timing::OUTBOUND_QUEUE_CAPACITY;

/// One connection's outbound mailbox. The sender side of a bounded
/// channel: a connection that cannot keep up with its mailbox is a slow
/// consumer, not a queue the server should let grow without bound.
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Creates a fresh bounded outbound channel for a new connection.
pub fn new_outbox() -> (Outbox, mpsc::Receiver<ServerMessage>) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

/// Tells a connection's serve loop to close itself, and with which close
/// code. Separate from the bounded outbox on purpose: a full mailbox must
/// still be able to signal "close", which a message sent over that same
/// full channel could not do.
#[derive(Clone)]
pub struct CloseSignal {
    code: Arc<AtomicU16>,
    notify: Arc<Notify>,
}

impl CloseSignal {
    pub fn new() -> Self {
        Self {
            code: Arc::new(AtomicU16::new(close::NORMAL)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Requests the connection close with `code`. If multiple requests
    /// race, the first one recorded wins; later ones still wake the loop.
    pub fn request(&self, code: u16) {
        let _ = self
            .code
            .compare_exchange(close::NORMAL, code, Ordering::SeqCst, Ordering::SeqCst);
        self.notify.notify_one();
    }

    /// Waits for a close request and returns its code.
    pub async fn wait(&self) -> u16 {
        self.notify.notified().await;
        self.code.load(Ordering::SeqCst)
    }
}

impl Default for CloseSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered connection's mailbox plus the side-channel used to tell it
/// to close itself.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub outbox: Outbox,
    pub close_signal: CloseSignal,
}

/// Tracks every live connection, grouped by session, so a session event
/// can be fanned out to every participant currently attached to it.
#[derive(Default)]
pub struct ConnectionRegistry {
    sessions: DashMap<SessionId, DashMap<ParticipantId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
        handle: ConnectionHandle,
    ) {
        self.sessions
            .entry(session_id)
            .or_default()
            .insert(participant_id, handle);
    }

    pub fn unregister(&self, session_id: &SessionId, participant_id: &ParticipantId) {
        if let Some(participants) = self.sessions.get(session_id) {
            participants.remove(participant_id);
        }
    }

    /// Tells the connection registered for `(session_id, participant_id)` to
    /// close itself with `code`, and stops tracking it.
    pub fn close(&self, session_id: &SessionId, participant_id: &ParticipantId, code: u16) {
        if let Some(participants) = self.sessions.get(session_id) {
            if let Some((_, handle)) = participants.remove(participant_id) {
                handle.close_signal.request(code);
            }
        }
    }

    /// Closes every connection attached to `session_id` with `code` and
    /// drops the session's registry entry entirely. Used when a session
    /// reaches a terminal state: there is no reconnecting to it afterward.
    pub fn close_session(&self, session_id: &SessionId, code: u16) {
        if let Some((_, participants)) = self.sessions.remove(session_id) {
            for entry in participants.iter() {
                entry.value().close_signal.request(code);
            }
        }
    }

    /// Sends `message` to every connection registered for `session_id`.
    /// A full mailbox is a backpressure failure for that one connection,
    /// not for the broadcast as a whole: the message still reaches every
    /// participant whose mailbox had room. Returns the participants whose
    /// mailbox was full, so the caller can close those connections.
    pub fn broadcast(&self, session_id: &SessionId, message: ServerMessage) -> Vec<ParticipantId> {
        let Some(participants) = self.sessions.get(session_id) else {
            return Vec::new();
        };

        let mut overflowed = Vec::new();
        for entry in participants.iter() {
            if let Err(mpsc::error::TrySendError::Full(_)) =
                entry.value().outbox.try_send(message.clone())
            {
                overflowed.push(entry.key().clone());
            }
        }
        overflowed
    }

    pub fn connected_count(&self, session_id: &SessionId) -> usize {
        self.sessions.get(session_id).map(|p| p.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(outbox: Outbox) -> ConnectionHandle {
        ConnectionHandle {
            outbox,
            close_signal: CloseSignal::new(),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_registered_connection() {
        let registry = ConnectionRegistry::new();
        let session_id = SessionId::generate();

        let (tx_a, mut rx_a) = new_outbox();
        let (tx_b, mut rx_b) = new_outbox();
        registry.register(session_id.clone(), ParticipantId::generate(), handle(tx_a));
        registry.register(session_id.clone(), ParticipantId::generate(), handle(tx_b));

        let overflowed = registry.broadcast(&session_id, ServerMessage::Pong {});
        assert!(overflowed.is_empty());

        assert!(matches!(rx_a.recv().await, Some(ServerMessage::Pong {})));
        assert!(matches!(rx_b.recv().await, Some(ServerMessage::Pong {})));
    }

    #[tokio::test]
    async fn a_full_mailbox_is_reported_without_blocking_others() {
        let registry = ConnectionRegistry::new();
        let session_id = SessionId::generate();

        let (tx_slow, rx_slow) = mpsc::channel(1);
        let (tx_fast, mut rx_fast) = new_outbox();
        let slow_id = ParticipantId::generate();
        registry.register(session_id.clone(), slow_id.clone(), handle(tx_slow));
        registry.register(session_id.clone(), ParticipantId::generate(), handle(tx_fast));

        // Fill the slow connection's single-slot mailbox.
        registry.broadcast(&session_id, ServerMessage::Pong {});
        let overflowed = registry.broadcast(&session_id, ServerMessage::SessionExpired {});

        assert_eq!(overflowed, vec![slow_id]);
        assert!(matches!(rx_fast.recv().await, Some(ServerMessage::Pong {})));
        assert!(matches!(
            rx_fast.recv().await,
            Some(ServerMessage::SessionExpired {})
        ));
        drop(rx_slow);
    }

    #[tokio::test]
    async fn unregister_removes_the_connection_from_future_broadcasts() {
        let registry = ConnectionRegistry::new();
        let session_id = SessionId::generate();
        let participant_id = ParticipantId::generate();

        let (tx, _rx) = new_outbox();
        registry.register(session_id.clone(), participant_id.clone(), handle(tx));
        assert_eq!(registry.connected_count(&session_id), 1);

        registry.unregister(&session_id, &participant_id);
        assert_eq!(registry.connected_count(&session_id), 0);
    }

    #[tokio::test]
    async fn close_notifies_with_the_requested_code_and_stops_tracking() {
        let registry = ConnectionRegistry::new();
        let session_id = SessionId::generate();
        let participant_id = ParticipantId::generate();

        let (tx, _rx) = new_outbox();
        let signal = CloseSignal::new();
        registry.register(
            session_id.clone(),
            participant_id.clone(),
            ConnectionHandle {
                outbox: tx,
                close_signal: signal.clone(),
            },
        );

        registry.close(&session_id, &participant_id, close::BACKPRESSURE);
        assert_eq!(signal.wait().await, close::BACKPRESSURE);
        assert_eq!(registry.connected_count(&session_id), 0);
    }

    #[tokio::test]
    async fn close_session_closes_every_connection_and_forgets_the_session() {
        let registry = ConnectionRegistry::new();
        let session_id = SessionId::generate();

        let (tx_a, _rx_a) = new_outbox();
        let (tx_b, _rx_b) = new_outbox();
        let signal_a = CloseSignal::new();
        let signal_b = CloseSignal::new();
        registry.register(
            session_id.clone(),
            ParticipantId::generate(),
            ConnectionHandle {
                outbox: tx_a,
                close_signal: signal_a.clone(),
            },
        );
        registry.register(
            session_id.clone(),
            ParticipantId::generate(),
            ConnectionHandle {
                outbox: tx_b,
                close_signal: signal_b.clone(),
            },
        );

        registry.close_session(&session_id, close::SESSION_EXPIRED);

        assert_eq!(signal_a.wait().await, close::SESSION_EXPIRED);
        assert_eq!(signal_b.wait().await, close::SESSION_EXPIRED);
        assert_eq!(registry.connected_count(&session_id), 0);
    }
}
