// ── Poll pacing ──
//
// Shared budget and delay for the convergence engines. Every pause races
// the caller's cancellation token so a poll loop can be aborted mid-sleep.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CoreError;

/// Bounded polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Fixed pause between polls.
    pub delay: Duration,
    /// Maximum number of status reads.
    pub retries: u32,
    /// Pause before the first read.
    pub initial_delay: Duration,
}

impl PollPolicy {
    pub const fn new(delay: Duration, retries: u32) -> Self {
        Self {
            delay,
            retries,
            initial_delay: Duration::ZERO,
        }
    }

    /// ATC task polling: 30 s apart, 10 reads.
    pub const fn deployment() -> Self {
        Self::new(Duration::from_secs(30), 10)
    }

    /// Config-sync polling: 6 s apart, 50 reads, pausing before each.
    pub const fn config_sync() -> Self {
        Self {
            delay: Duration::from_secs(6),
            retries: 50,
            initial_delay: Duration::from_secs(6),
        }
    }

    /// Package-management task polling: 3 s apart, 60 reads.
    pub const fn package() -> Self {
        Self::new(Duration::from_secs(3), 60)
    }

    /// Same budget with a different delay everywhere.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self {
            delay,
            initial_delay: if self.initial_delay.is_zero() {
                Duration::ZERO
            } else {
                delay
            },
            ..self
        }
    }

    pub fn with_retries(self, retries: u32) -> Self {
        Self { retries, ..self }
    }

    /// A zero budget would submit work and never look at it.
    pub fn check_budget(&self) -> Result<(), CoreError> {
        if self.retries == 0 {
            return Err(CoreError::validation("Poll retries must be at least 1."));
        }
        Ok(())
    }

    /// Delay before read number `poll` (0-based).
    pub(crate) fn delay_before(&self, poll: u32) -> Duration {
        if poll == 0 {
            self.initial_delay
        } else {
            self.delay
        }
    }
}

/// Sleep for `delay` unless `cancel` fires first.
pub(crate) async fn pause(
    delay: Duration,
    cancel: &CancellationToken,
    operation: &str,
) -> Result<(), CoreError> {
    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled {
            operation: operation.to_owned(),
        });
    }
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        () = cancel.cancelled() => Err(CoreError::Cancelled {
            operation: operation.to_owned(),
        }),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Result of one status read.
#[derive(Debug)]
pub(crate) enum Step<T> {
    /// Non-terminal; carries the observed state.
    Pending(String),
    Done(T),
}

/// Read status until `read` reports a terminal value, an error, or the
/// budget runs out.
///
/// Exactly `policy.retries` reads are issued at most. Failures are
/// returned by `read` itself; exhaustion names the last observed state.
pub(crate) async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    operation: &str,
    mut read: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Step<T>, CoreError>>,
{
    let mut last_state = String::from("not polled");

    for poll in 0..policy.retries {
        pause(policy.delay_before(poll), cancel, operation).await?;

        let step = tokio::select! {
            () = cancel.cancelled() => {
                return Err(CoreError::Cancelled {
                    operation: operation.to_owned(),
                });
            }
            step = read() => step?,
        };

        match step {
            Step::Done(value) => return Ok(value),
            Step::Pending(state) => {
                debug!(
                    operation,
                    attempt = poll + 1,
                    retries = policy.retries,
                    %state,
                    "still converging"
                );
                last_state = state;
            }
        }
    }

    Err(CoreError::RetriesExhausted {
        operation: operation.to_owned(),
        last_state,
    })
}
