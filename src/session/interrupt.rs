/*!
 * Cooperative cancellation.
 *
 * Ctrl+C only flips a flag. The controller checks it between batches and the
 * translator races it against backoff sleeps; an in-flight request is always
 * allowed to finish so no half-merged batch is ever written.
 */

use log::warn;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shared interrupt flag; clones observe the same flag
#[derive(Debug, Clone)]
pub struct Interrupt {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl Interrupt {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Request an orderly stop
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the flag is set
    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        let outcome = receiver.wait_for(|triggered| *triggered).await.map(|_| ());
        if outcome.is_err() {
            // The sender lives as long as `self`, so this cannot happen; never resolve
            std::future::pending::<()>().await;
        }
    }

    /// Trigger on the first Ctrl+C. A second Ctrl+C exits the process right away.
    ///
    /// Replaces the default SIGINT handling, so install it only after any
    /// blocking prompt has been answered.
    pub fn listen_for_ctrl_c(&self) -> JoinHandle<()> {
        let interrupt = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            warn!("Detected user interrupt (Ctrl+C). Finishing the current batch, press Ctrl+C again to quit now.");
            interrupt.trigger();

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Second interrupt, exiting. The last saved checkpoint is kept.");
                std::process::exit(130);
            }
        })
    }
}
