//! Candidate selection
//!
//! Picks the instance a start command produced out of a listing snapshot.

use crate::correlate::Target;
use crate::models::instance::InstanceRecord;

/// Highest instance id of the target workflow in a snapshot
pub fn baseline_of(records: &[InstanceRecord], target: &Target<'_>) -> Option<i64> {
    records
        .iter()
        .filter(|r| r.belongs_to(target.workflow_code, target.workflow_name))
        .filter_map(|r| r.id)
        .max()
}

/// Select the instance created after `baseline`.
///
/// Ids are assigned monotonically, so the largest id wins. Start times only
/// break the tie when no candidate has an id. Records without an id cannot be
/// compared to the baseline and are only considered when there is none.
pub fn select_candidate(
    records: Vec<InstanceRecord>,
    target: &Target<'_>,
    baseline: Option<i64>,
) -> Option<InstanceRecord> {
    let candidates: Vec<InstanceRecord> = records
        .into_iter()
        .filter(|r| r.belongs_to(target.workflow_code, target.workflow_name))
        .filter(|r| match (r.id, baseline) {
            (Some(id), Some(baseline)) => id > baseline,
            (Some(_), None) => true,
            (None, baseline) => baseline.is_none(),
        })
        .collect();

    if candidates.iter().any(|r| r.id.is_some()) {
        return candidates.into_iter().filter(|r| r.id.is_some()).max_by_key(|r| r.id);
    }

    candidates
        .into_iter()
        .max_by(|a, b| a.start_time.cmp(&b.start_time))
}
