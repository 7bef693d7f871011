//! One-shot rendezvous signals for handing control between the pipeline
//! executor and caller interaction code.
//!
//! A rendezvous fires exactly once. Every waiter — whether it
//! started waiting before or after the firing — observes the same single
//! event, and waiting again after the firing resolves immediately. The
//! primitive imposes no timeout of its own: liveness policy belongs to the
//! run lifecycle layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Shared state of one single-fire broadcast signal.
#[derive(Debug)]
struct RendezvousInner {
    fired: AtomicBool,
    notify: Notify,
}

/// The signalling half of a rendezvous. Cloneable; firing twice is a no-op.
#[derive(Debug, Clone)]
pub struct SignalHandle {
    inner: Arc<RendezvousInner>,
}

impl SignalHandle {
    /// Fire the signal, waking every current waiter and resolving all future
    /// waits immediately. Returns `true` if this call did the firing; a
    /// signal already fired (by this handle or a clone) returns `false` and
    /// has no effect. The swap makes the first-firer decision atomic, so two
    /// racing handles always agree on which of them won.
    pub fn signal(&self) -> bool {
        if !self.inner.fired.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
            true
        } else {
            false
        }
    }

    /// Whether the signal has already fired.
    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }
}

/// The waiting half of a rendezvous. Cloneable; all clones observe the same
/// single firing.
#[derive(Debug, Clone)]
pub struct WaitHandle {
    inner: Arc<RendezvousInner>,
}

impl WaitHandle {
    /// Resolve once the paired [`SignalHandle`] has fired.
    ///
    /// Resolves immediately if the signal already fired. If `signal` is never
    /// called this waits forever; the caller decides whether to bound it.
    pub async fn wait(&self) {
        // Register before checking the flag: `signal` sets the flag first and
        // then wakes registered waiters, so a miss on the flag read means our
        // registration is guaranteed to be notified.
        loop {
            let notified = self.inner.notify.notified();
            if self.inner.fired.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    /// Whether the signal has already fired.
    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }
}

/// Create a fresh one-shot rendezvous and return its two halves.
///
/// Each run owns its own pair of these (one per handoff direction); they are
/// never reused across runs.
pub fn rendezvous() -> (SignalHandle, WaitHandle) {
    let inner = Arc::new(RendezvousInner {
        fired: AtomicBool::new(false),
        notify: Notify::new(),
    });
    (
        SignalHandle {
            inner: inner.clone(),
        },
        WaitHandle { inner },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_after_signal_resolves_immediately() {
        let (signal, wait) = rendezvous();
        signal.signal();
        // Must not hang.
        wait.wait().await;
        assert!(wait.is_fired());
    }

    #[tokio::test]
    async fn test_signal_wakes_pending_waiter() {
        let (signal, wait) = rendezvous();
        let waiter = tokio::spawn(async move { wait.wait().await });

        // Give the waiter a chance to park before firing.
        tokio::task::yield_now().await;
        signal.signal();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter timed out")
            .expect("waiter panicked");
    }

    #[tokio::test]
    async fn test_broadcast_to_multiple_waiters() {
        let (signal, wait) = rendezvous();

        let mut waiters = Vec::new();
        for _ in 0..4 {
            let wait = wait.clone();
            waiters.push(tokio::spawn(async move { wait.wait().await }));
        }
        tokio::task::yield_now().await;
        signal.signal();

        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter timed out")
                .expect("waiter panicked");
        }
    }

    #[tokio::test]
    async fn test_double_signal_is_noop() {
        let (signal, wait) = rendezvous();
        signal.signal();
        signal.signal();
        wait.wait().await;
        // A waiter arriving after the second fire still resolves.
        wait.wait().await;
    }

    #[tokio::test]
    async fn test_unfired_signal_blocks() {
        let (_signal, wait) = rendezvous();
        let blocked = tokio::time::timeout(Duration::from_millis(50), wait.wait()).await;
        assert!(blocked.is_err(), "wait should still be pending");
    }

    #[test]
    fn test_first_fire_wins_exactly_once() {
        let (signal, _wait) = rendezvous();
        let racing = signal.clone();
        assert!(signal.signal());
        // Every later attempt, from any handle, loses.
        assert!(!signal.signal());
        assert!(!racing.signal());
    }

    #[test]
    fn test_is_fired_reflects_state() {
        let (signal, wait) = rendezvous();
        assert!(!signal.is_fired());
        assert!(!wait.is_fired());
        signal.signal();
        assert!(signal.is_fired());
        assert!(wait.is_fired());
    }
}
