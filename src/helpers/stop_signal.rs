use std::future::pending;

use tokio::sync::watch;

/// Cooperative cancellation flag checked between devices and between sub-reads
///
/// In-flight transactions are never interrupted; they end on their own I/O
/// timeout.
#[derive(Clone, Debug)]
pub struct StopSignal(Option<watch::Receiver<bool>>);

/// Sending half of a [`StopSignal`]
#[derive(Debug)]
pub struct StopTrigger(watch::Sender<bool>);

impl StopSignal {
    pub fn channel() -> (StopTrigger, StopSignal) {
        let (tx, rx) = watch::channel(false);
        (StopTrigger(tx), StopSignal(Some(rx)))
    }

    /// A signal that never fires, for manually triggered cycles
    pub fn never() -> Self {
        StopSignal(None)
    }

    pub fn is_stopped(&self) -> bool {
        self.0.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once stop was requested or the trigger was dropped
    pub async fn stopped(&mut self) {
        match &mut self.0 {
            Some(rx) => {
                let _ = rx.wait_for(|stop| *stop).await;
            }
            None => pending::<()>().await,
        }
    }
}

impl StopTrigger {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}
