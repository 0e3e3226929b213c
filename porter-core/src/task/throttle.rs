use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;

type Action = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Rate limiter coalescing rapid calls into at most one run per window.
///
/// The first call in an idle window runs immediately (leading edge); calls
/// landing inside the window collapse into a single deferred run at window
/// close (trailing edge). [`Throttle::flush_now`] bypasses the window and
/// supersedes any pending trailing run — task finish/fail paths need that to
/// not lose buffered writes.
pub struct Throttle {
    window: Duration,
    action: Action,
    state: Arc<tokio::sync::Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
    last_run: Option<Instant>,
    /// Bumped on every run; a scheduled trailing run only fires if the
    /// epoch it captured is still current.
    epoch: u64,
    /// Epoch of the currently scheduled trailing run, if any.
    pending: Option<u64>,
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Throttle");
        debug.field("window", &self.window);
        match self.state.try_lock() {
            Ok(state) => debug.field("state", &*state),
            Err(_) => debug.field("state", &"<locked>"),
        };
        debug.finish()
    }
}

impl Throttle {
    pub fn new<F>(window: Duration, action: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            window,
            action: Arc::new(action),
            state: Arc::new(tokio::sync::Mutex::new(State::default())),
        }
    }

    /// Request a run under the throttle discipline.
    pub async fn call(&self) {
        let run_now = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            match state.last_run {
                Some(last) if now.duration_since(last) < self.window => {
                    if state.pending.is_none() {
                        let epoch = state.epoch;
                        state.pending = Some(epoch);
                        let wait = self.window - now.duration_since(last);
                        self.schedule_trailing(epoch, wait);
                    }
                    false
                }
                _ if state.pending.is_some() => false,
                _ => {
                    state.epoch += 1;
                    state.last_run = Some(Instant::now());
                    true
                }
            }
        };
        if run_now {
            (self.action)().await;
        }
    }

    /// Run the action immediately, bypassing the window. Any scheduled
    /// trailing run is superseded.
    pub async fn flush_now(&self) {
        {
            let mut state = self.state.lock().await;
            state.epoch += 1;
            state.pending = None;
            state.last_run = Some(Instant::now());
        }
        (self.action)().await;
    }

    fn schedule_trailing(&self, epoch: u64, wait: Duration) {
        let action = self.action.clone();
        let shared = self.state.clone();
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let run = {
                let mut state = shared.lock().await;
                if state.pending == Some(epoch) {
                    state.pending = None;
                    state.epoch += 1;
                    state.last_run = Some(Instant::now());
                    true
                } else {
                    false
                }
            };
            if run {
                action().await;
            }
        });
    }
}
