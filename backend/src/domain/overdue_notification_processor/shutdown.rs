//! Cooperative shutdown signal observed between records and while idle.

use tokio::sync::watch;

/// Sending half used by the owner of a running loop.
#[derive(Debug)]
pub struct ShutdownTrigger {
    sender: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }
}

/// Receiving half handed to passes and loops.
///
/// Dropping the trigger without calling [`ShutdownTrigger::trigger`] does not
/// count as shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl ShutdownSignal {
    /// Create a connected trigger and signal.
    ///
    /// # Examples
    /// ```
    /// use lending_backend::domain::ShutdownSignal;
    ///
    /// let (trigger, signal) = ShutdownSignal::channel();
    /// assert!(!signal.is_triggered());
    /// trigger.trigger();
    /// assert!(signal.is_triggered());
    /// ```
    pub fn channel() -> (ShutdownTrigger, Self) {
        let (sender, receiver) = watch::channel(false);
        (
            ShutdownTrigger { sender },
            Self {
                receiver: Some(receiver),
            },
        )
    }

    /// A signal that never fires.
    pub const fn never() -> Self {
        Self { receiver: None }
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|receiver| *receiver.borrow())
    }

    /// Resolve once shutdown is requested; pends forever otherwise.
    pub async fn triggered(&mut self) {
        if let Some(receiver) = self.receiver.as_mut() {
            if receiver.wait_for(|stop| *stop).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}
