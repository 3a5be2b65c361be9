use crate::arm::{ControlPlane, WriteAccepted};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Interval and deadline for polling an asynchronous operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: u32,
    /// Total time allowed from the first poll.
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 2,
            deadline: Duration::from_secs(120),
        }
    }
}

impl PollPolicy {
    fn next_interval(&self, current: Duration) -> Duration {
        current
            .saturating_mul(self.multiplier.max(1))
            .min(self.max_interval)
    }
}

/// Status reported by an ARM asynchronous operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationStatus {
    InProgress,
    Succeeded,
    Failed,
    Canceled,
    Other(String),
}

impl OperationStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "InProgress" => OperationStatus::InProgress,
            "Succeeded" => OperationStatus::Succeeded,
            "Failed" => OperationStatus::Failed,
            "Canceled" => OperationStatus::Canceled,
            other => OperationStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationStatus::InProgress => f.write_str("InProgress"),
            OperationStatus::Succeeded => f.write_str("Succeeded"),
            OperationStatus::Failed => f.write_str("Failed"),
            OperationStatus::Canceled => f.write_str("Canceled"),
            OperationStatus::Other(status) => f.write_str(status),
        }
    }
}

/// How polling an operation ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationOutcome {
    Succeeded,
    /// Reached a terminal status other than `Succeeded`.
    Failed(OperationStatus),
    /// Still in progress when the deadline passed.
    TimedOut,
    /// Polling broke off; the operation's fate is unknown.
    Indeterminate(String),
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Succeeded)
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationOutcome::Succeeded => f.write_str("Succeeded"),
            OperationOutcome::Failed(status) => write!(f, "{status}"),
            OperationOutcome::TimedOut => f.write_str("timed out, status unknown"),
            OperationOutcome::Indeterminate(reason) => write!(f, "indeterminate ({reason})"),
        }
    }
}

/// Polls ARM asynchronous operations to a terminal outcome.
pub struct OperationPoller {
    control_plane: Arc<dyn ControlPlane>,
    policy: PollPolicy,
}

impl OperationPoller {
    pub fn new(control_plane: Arc<dyn ControlPlane>, policy: PollPolicy) -> Self {
        Self {
            control_plane,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Waits for the operation behind an accepted write.
    ///
    /// A write accepted without an `Azure-AsyncOperation` URL completed
    /// synchronously.
    pub async fn await_completion(&self, accepted: &WriteAccepted) -> OperationOutcome {
        let outcome = match accepted.operation_url.as_deref() {
            Some(url) => self.poll(url).await,
            None => {
                log::debug!("Write completed without an asynchronous operation");
                OperationOutcome::Succeeded
            }
        };
        log::debug!("ARM async operation outcome: {outcome}");
        outcome
    }

    async fn poll(&self, operation_url: &str) -> OperationOutcome {
        let started = Instant::now();
        let mut interval = self.policy.initial_interval;

        loop {
            let status = match self.control_plane.get_operation_status(operation_url).await {
                Ok(status) => OperationStatus::parse(&status),
                Err(e) => {
                    log::error!("Polling {operation_url} failed: {e}");
                    return OperationOutcome::Indeterminate(e.to_string());
                }
            };
            log::trace!("ARM async operation status: {status}");

            match status {
                OperationStatus::InProgress => {}
                OperationStatus::Succeeded => return OperationOutcome::Succeeded,
                terminal => return OperationOutcome::Failed(terminal),
            }

            if started.elapsed() + interval > self.policy.deadline {
                log::warn!(
                    "ARM async operation still in progress after {:?}, giving up",
                    started.elapsed()
                );
                return OperationOutcome::TimedOut;
            }

            tokio::time::sleep(interval).await;
            interval = self.policy.next_interval(interval);
        }
    }
}
