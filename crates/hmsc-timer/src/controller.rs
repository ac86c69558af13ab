use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::TimerError;

/// Registry of named, independently cancellable timers. Names are chosen
/// by callers to be globally unique within a controller (`hmsc-manager`
/// uses `session:<id>:<purpose>`), which is what makes
/// [`cancel_by_prefix`](Self::cancel_by_prefix) useful for tearing down
/// every timer belonging to one session in a single call.
#[derive(Default)]
pub struct TimerController {
    handles: Mutex<HashMap<String, JoinHandle<()>>>,
    shut_down: AtomicBool,
}

/// A snapshot of how many timers are currently registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerStats {
    pub active: usize,
}

impl TimerController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Runs `callback` once, after `delay`, unless cancelled first.
    pub fn schedule_once<F>(
        self: &Arc<Self>,
        name: impl Into<String>,
        delay: Duration,
        callback: F,
    ) -> Result<(), TimerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        self.guard_shutdown()?;
        self.guard_unique(&name)?;

        let this = Arc::clone(self);
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
            this.handles.lock().remove(&task_name);
        });

        self.handles.lock().insert(name, handle);
        Ok(())
    }

    /// Runs `callback` every `period`, starting after the first `period`
    /// elapses, until cancelled.
    pub fn schedule_interval<F>(
        self: &Arc<Self>,
        name: impl Into<String>,
        period: Duration,
        callback: F,
    ) -> Result<(), TimerError>
    where
        F: Fn() + Send + 'static,
    {
        let name = name.into();
        self.guard_shutdown()?;
        self.guard_unique(&name)?;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                callback();
            }
        });

        self.handles.lock().insert(name, handle);
        Ok(())
    }

    /// Cancels a single named timer. Returns whether one was found.
    pub fn cancel(&self, name: &str) -> bool {
        match self.handles.lock().remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every timer whose name starts with `prefix`, returning how
    /// many were found.
    pub fn cancel_by_prefix(&self, prefix: &str) -> usize {
        let mut handles = self.handles.lock();
        let matching: Vec<String> = handles
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();

        for name in &matching {
            if let Some(handle) = handles.remove(name) {
                handle.abort();
            }
        }
        matching.len()
    }

    /// Cancels every outstanding timer and latches the controller shut:
    /// no further `schedule_*` call will succeed. Irreversible.
    pub fn cancel_all(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let mut handles = self.handles.lock();
        for (_, handle) in handles.drain() {
            handle.abort();
        }
    }

    pub fn stats(&self) -> TimerStats {
        TimerStats {
            active: self.handles.lock().len(),
        }
    }

    fn guard_shutdown(&self) -> Result<(), TimerError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(TimerError::ShutDown);
        }
        Ok(())
    }

    fn guard_unique(&self, name: &str) -> Result<(), TimerError> {
        if self.handles.lock().contains_key(name) {
            return Err(TimerError::AlreadyScheduled(name.to_string()));
        }
        Ok(())
    }
}
