//! Supervised background tasks.
//!
//! A [`Supervisor`] runs a task body inside a panic guard. When the body panics the fault is
//! logged, the supervisor sleeps for the retry delay and enters the body again. A body that
//! returns normally ends the task; so does cancellation of the token, which is also observed
//! during the backoff sleep.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// How many times a panicking body is restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Unlimited,
    Limited(u32),
}

/// Why a supervised task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The body returned normally.
    Completed,
    /// The token was cancelled between runs or during the backoff.
    Cancelled,
    /// The restart budget of [`Retry::Limited`] was exhausted.
    GaveUp,
}

#[derive(Debug, Clone)]
pub struct Supervisor {
    name: String,
    retry: Retry,
    retry_delay: Duration,
}

impl Supervisor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            retry: Retry::Unlimited,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Drives `body` in place until it completes, the token is cancelled, or retries run out.
    pub async fn run<F, Fut>(&self, token: &CancellationToken, mut body: F) -> SupervisorExit
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut restarts: u32 = 0;
        loop {
            if token.is_cancelled() {
                return SupervisorExit::Cancelled;
            }

            match AssertUnwindSafe(body()).catch_unwind().await {
                Ok(()) => return SupervisorExit::Completed,
                Err(payload) => log::error!(
                    "Task '{}' panicked: {} (restarts so far: {})",
                    self.name,
                    panic_message(payload.as_ref()),
                    restarts
                ),
            }

            if let Retry::Limited(max) = self.retry {
                if restarts >= max {
                    log::error!("Task '{}' exhausted {} restarts, giving up", self.name, max);
                    return SupervisorExit::GaveUp;
                }
            }
            restarts = restarts.saturating_add(1);

            tokio::select! {
                _ = token.cancelled() => return SupervisorExit::Cancelled,
                _ = tokio::time::sleep(self.retry_delay) => {
                    log::info!("Restarting task '{}'", self.name);
                }
            }
        }
    }

    /// Spawns the supervised loop on the tokio runtime.
    pub fn spawn<F, Fut>(self, token: CancellationToken, body: F) -> JoinHandle<SupervisorExit>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move { self.run(&token, body).await })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
