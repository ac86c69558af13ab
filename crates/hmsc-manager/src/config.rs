/// Tunable lifetimes for a `SessionManager`. Resolved defaults for the
/// session and per-transaction windows described only qualitatively by the
/// original design notes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionManagerConfig {
    /// How long a session may sit in `Waiting` before it expires.
    pub session_ttl_secs: u64,
    /// How long a transaction may sit awaiting signatures before the
    /// session expires out from under it.
    pub tx_ttl_secs: u64,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 600,
            tx_ttl_secs: 300,
        }
    }
}
