//! Post-start polling

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::correlate::selection::{baseline_of, select_candidate};
use crate::correlate::{Options, Target};
use crate::errors::GatewayError;
use crate::models::instance::InstanceRecord;
use crate::scheduler::{InstanceQuery, SchedulerExt};

/// One listing pass over the target workflow's recent instances
async fn snapshot(
    scheduler: &dyn SchedulerExt,
    options: &Options,
    target: &Target<'_>,
    deadline: Instant,
) -> Result<Vec<InstanceRecord>, GatewayError> {
    let query = InstanceQuery {
        workflow_code: target.workflow_code,
        page_no: 1,
        page_size: options.page_size,
        ..Default::default()
    };
    let page = timeout_at(deadline, scheduler.list_instances(target.project, &query))
        .await
        .map_err(|_| GatewayError::Timeout("instance listing".to_string()))??;
    Ok(page.records.iter().map(InstanceRecord::from_value).collect())
}

/// Highest instance id visible before the start, from a single pass.
///
/// Returns `None` when the list is empty or could not be fetched.
pub async fn capture_baseline(
    scheduler: &dyn SchedulerExt,
    options: &Options,
    target: &Target<'_>,
    deadline: Instant,
) -> Option<i64> {
    match snapshot(scheduler, options, target, deadline).await {
        Ok(records) => {
            let baseline = baseline_of(&records, target);
            debug!(
                "Baseline for workflow {}: {:?} ({} records)",
                target.workflow_code,
                baseline,
                records.len()
            );
            baseline
        }
        Err(e) => {
            warn!(
                "Could not capture instance baseline for workflow {}: {}",
                target.workflow_code, e
            );
            None
        }
    }
}

/// Poll until an instance newer than `baseline` shows up.
///
/// Gives up after `options.attempts` passes or at `deadline`, whichever comes
/// first, and returns `None`.
pub async fn await_instance<S, F>(
    scheduler: &dyn SchedulerExt,
    options: &Options,
    target: &Target<'_>,
    baseline: Option<i64>,
    deadline: Instant,
    sleep_fn: S,
) -> Option<InstanceRecord>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    for attempt in 1..=options.attempts {
        if attempt > 1 {
            if Instant::now() + options.interval >= deadline {
                warn!(
                    "Correlation deadline reached for workflow {} after {} attempts",
                    target.workflow_code,
                    attempt - 1
                );
                return None;
            }
            sleep_fn(options.interval).await;
        }

        match snapshot(scheduler, options, target, deadline).await {
            Ok(records) => {
                if let Some(found) = select_candidate(records, target, baseline) {
                    info!(
                        "Workflow {} started instance {:?} (attempt {})",
                        target.workflow_code, found.id, attempt
                    );
                    return Some(found);
                }
                debug!(
                    "No new instance of workflow {} yet (attempt {}/{})",
                    target.workflow_code, attempt, options.attempts
                );
            }
            Err(e) => {
                debug!(
                    "Listing instances of workflow {} failed (attempt {}/{}): {}",
                    target.workflow_code, attempt, options.attempts, e
                );
            }
        }
    }

    warn!(
        "No instance of workflow {} appeared after {} attempts",
        target.workflow_code, options.attempts
    );
    None
}
