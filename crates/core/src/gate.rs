//! The pause/resume synchronization primitive.
//!
//! A two-state gate: `wait()` suspends the execution loop while the gate is
//! closed; external handlers call `open()` to release it. No polling — the
//! waiter parks on a `Notify` and is woken exactly when the gate opens.

use std::sync::Mutex;
use tokio::sync::Notify;

/// A closed/open gate for clarification waits.
///
/// Created closed. The loop closes it before suspending and an external
/// actor (clarification or continuation handler) opens it.
#[derive(Debug)]
pub struct ResumeGate {
    open: Mutex<bool>,
    notify: Notify,
}

impl ResumeGate {
    pub fn new() -> Self {
        Self {
            open: Mutex::new(false),
            notify: Notify::new(),
        }
    }

    /// Open the gate and wake the waiting loop task.
    pub fn open(&self) {
        *self.open.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.notify.notify_waiters();
    }

    /// Close the gate so the next `wait()` suspends.
    pub fn close(&self) {
        *self.open.lock().unwrap_or_else(|e| e.into_inner()) = false;
    }

    pub fn is_open(&self) -> bool {
        *self.open.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Suspend until the gate is open.
    ///
    /// The `Notified` future is created before the flag check so an `open()`
    /// racing between the check and the await cannot be lost.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_open() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ResumeGate {
    fn default() -> Self {
        Self::new()
    }
}
