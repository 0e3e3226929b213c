use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Outcome of one periodic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

/// A cancellable fixed-interval background loop.
///
/// The first tick lands one period after spawning. The loop ends when the
/// tick returns [`Tick::Stop`] or the handle is cancelled; dropping the
/// handle cancels it.
#[derive(Debug)]
pub struct Periodic {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Periodic {
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // tokio intervals fire immediately; consume that tick so the
            // first real one lands a full period out
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if tick().await == Tick::Stop {
                            break;
                        }
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    /// Stop the loop. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Periodic {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
