//! One-shot stop notifications.
//!
//! A [`StopTrigger`] closes its signal either explicitly through
//! [`StopTrigger::fire`] or implicitly when dropped. Once closed, every
//! [`StopSignal`] clone reports it for good.

use tokio::sync::watch;

/// Creates a connected trigger/signal pair.
pub fn stop_signal() -> (StopTrigger, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopTrigger { tx }, StopSignal { rx: Some(rx) })
}

/// Owning side of a stop notification.
#[derive(Debug)]
pub struct StopTrigger {
    tx: watch::Sender<bool>,
}

impl StopTrigger {
    /// Closes the signal. Calling it more than once has no further effect.
    pub fn fire(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: Some(self.tx.subscribe()),
        }
    }
}

/// Observing side of a stop notification.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl StopSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_fired(&self) -> bool {
        match &self.rx {
            Some(rx) => *rx.borrow() || rx.has_changed().is_err(),
            None => false,
        }
    }

    /// Completes once the trigger fired or was dropped. Cancel safe.
    pub async fn fired(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fire_releases_every_clone() {
        let (trigger, signal) = stop_signal();
        let other = signal.clone();
        assert!(!signal.is_fired());

        trigger.fire();
        trigger.fire();
        signal.fired().await;
        other.fired().await;
        assert!(other.is_fired());
    }

    #[tokio::test]
    async fn dropping_the_trigger_closes_the_signal() {
        let (trigger, signal) = stop_signal();
        let waiter = tokio::spawn(async move { signal.fired().await });
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("signal should close")
            .expect("waiter task");
    }

    #[tokio::test]
    async fn unfired_signal_stays_pending() {
        let (_trigger, signal) = stop_signal();
        let result = tokio::time::timeout(Duration::from_millis(20), signal.fired()).await;
        assert!(result.is_err());
        assert!(!StopSignal::never().is_fired());
    }
}
