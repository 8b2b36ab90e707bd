// ── Task convergence engine ──
//
// Polls an accepted ATC submission until it succeeds, reports no change,
// fails, or exhausts its budget.

use bigip_api::Session;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatch::AsyncOperation;
use crate::error::CoreError;
use crate::poll::{PollPolicy, Step, poll_until};
use crate::service::TaskState;

/// Terminal, non-failed task states with the final task body.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    Success(Value),
    NoChange(Value),
}

impl TaskOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn body(&self) -> &Value {
        match self {
            Self::Success(body) | Self::NoChange(body) => body,
        }
    }
}

/// Poll `operation` under `policy`.
///
/// At most `policy.retries` task reads are issued, `policy.delay` apart.
pub async fn await_task(
    session: &Session,
    operation: &AsyncOperation,
    policy: &PollPolicy,
    cancel: &CancellationToken,
) -> Result<TaskOutcome, CoreError> {
    let path = operation.task_path()?;
    let service = operation.service;
    debug!(%service, task_id = %operation.id, "waiting for task");

    let outcome = poll_until(policy, cancel, "task", move || {
        let path = path.clone();
        async move {
            let body: Value = session.get(&path).await?;
            match service.classify_task(&body) {
                TaskState::Pending(state) => Ok(Step::Pending(state)),
                TaskState::Success => Ok(Step::Done(TaskOutcome::Success(body))),
                TaskState::NoChange => Ok(Step::Done(TaskOutcome::NoChange(body))),
                TaskState::Failed { reason, detail } => {
                    Err(CoreError::ConvergenceFailed { reason, detail })
                }
            }
        }
    })
    .await?;

    info!(%service, task_id = %operation.id, changed = outcome.changed(), "task converged");
    Ok(outcome)
}
