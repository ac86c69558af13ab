use dashmap::DashMap;
use parking_lot::RwLock;

use hmsc_types::{Session, SessionId, SessionStatus};

use crate::error::StoreError;

/// Concurrent session storage. Sessions live behind a sharded `DashMap`, so
/// unrelated sessions never contend on the same lock; each session is
/// additionally guarded by its own `RwLock`, so mutation of one session is
/// serialized against itself without blocking reads of any other. There is
/// no ordering guarantee across sessions — only within one.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, RwLock<Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Session) -> Result<(), StoreError> {
        let id = session.session_id.clone();
        if self.sessions.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        self.sessions.insert(id, RwLock::new(session));
        Ok(())
    }

    /// A point-in-time clone of the session. Cheap relative to holding a
    /// lock across an `await` point, which this store's callers never do.
    pub fn snapshot(&self, id: &SessionId) -> Result<Session, StoreError> {
        self.sessions
            .get(id)
            .map(|entry| entry.read().clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Runs `f` against the session under its write lock, serializing this
    /// mutation against any other in flight for the same session. `f`'s
    /// error type is the caller's; a failed `f` leaves the session
    /// untouched from the caller's perspective (the mutation function is
    /// responsible for not partially applying changes before failing).
    pub fn mutate<T, E>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut Session) -> Result<T, E>,
    ) -> Result<T, MutateError<E>> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| MutateError::Store(StoreError::NotFound(id.to_string())))?;
        let mut guard = entry.write();
        f(&mut guard).map_err(MutateError::Inner)
    }

    pub fn remove(&self, id: &SessionId) -> Result<(), StoreError> {
        self.sessions
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Transitions every non-terminal session whose `expires_at` has
    /// passed into `Expired`, returning the ids that changed so the caller
    /// can cancel their timers and emit `SessionExpired` events.
    pub fn sweep_expired(&self, now_secs: u64) -> Vec<SessionId> {
        let mut expired = Vec::new();
        for entry in self.sessions.iter() {
            let mut session = entry.value().write();
            if !session.status.is_terminal() && session.expires_at <= now_secs {
                session.status = SessionStatus::Expired;
                expired.push(session.session_id.clone());
            }
        }
        expired
    }

    /// Drops sessions that reached a terminal state before `older_than_secs`,
    /// freeing memory for sessions nobody will query again.
    pub fn evict_terminal(&self, older_than_secs: u64) -> usize {
        let to_remove: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| {
                let session = entry.value().read();
                session.status.is_terminal() && session.expires_at < older_than_secs
            })
            .map(|entry| entry.key().clone())
            .collect();

        for id in &to_remove {
            self.sessions.remove(id);
        }
        to_remove.len()
    }
}

/// Either the store itself failed to find the session, or the caller's
/// mutation closure returned its own error.
#[derive(Debug)]
pub enum MutateError<E> {
    Store(StoreError),
    Inner(E),
}

impl<E: std::fmt::Display> std::fmt::Display for MutateError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(e) => write!(f, "{e}"),
            Self::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for MutateError<E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use hmsc_crypto::PublicKey;

    fn sample_session(id: SessionId, expires_at: u64) -> Session {
        Session::new(
            id,
            "1234".into(),
            1,
            vec![PublicKey::from_bytes(&[1u8; 32]).unwrap()],
            1,
            0,
            expires_at,
        )
    }

    #[test]
    fn insert_then_snapshot_round_trips() {
        let store = SessionStore::new();
        let id = SessionId::generate();
        store.insert(sample_session(id.clone(), 1000)).unwrap();

        let snapshot = store.snapshot(&id).unwrap();
        assert_eq!(snapshot.session_id, id);
    }

    #[test]
    fn inserting_twice_fails() {
        let store = SessionStore::new();
        let id = SessionId::generate();
        store.insert(sample_session(id.clone(), 1000)).unwrap();

        let err = store.insert(sample_session(id, 1000)).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[test]
    fn mutate_is_visible_to_later_snapshots() {
        let store = SessionStore::new();
        let id = SessionId::generate();
        store.insert(sample_session(id.clone(), 1000)).unwrap();

        store
            .mutate(&id, |session| -> Result<(), ()> {
                session.status = SessionStatus::Signing;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.snapshot(&id).unwrap().status, SessionStatus::Signing);
    }

    #[test]
    fn sweep_expired_transitions_past_deadline_sessions() {
        let store = SessionStore::new();
        let id = SessionId::generate();
        store.insert(sample_session(id.clone(), 100)).unwrap();

        let expired = store.sweep_expired(200);
        assert_eq!(expired, vec![id.clone()]);
        assert_eq!(store.snapshot(&id).unwrap().status, SessionStatus::Expired);
    }

    #[test]
    fn sweep_expired_leaves_active_sessions_alone() {
        let store = SessionStore::new();
        let id = SessionId::generate();
        store.insert(sample_session(id.clone(), 1000)).unwrap();

        let expired = store.sweep_expired(200);
        assert!(expired.is_empty());
        assert_eq!(store.snapshot(&id).unwrap().status, SessionStatus::Waiting);
    }

    #[test]
    fn evict_terminal_removes_old_completed_sessions() {
        let store = SessionStore::new();
        let id = SessionId::generate();
        let mut session = sample_session(id.clone(), 100);
        session.status = SessionStatus::Completed;
        store.insert(session).unwrap();

        let removed = store.evict_terminal(200);
        assert_eq!(removed, 1);
        assert!(store.snapshot(&id).is_err());
    }
}
