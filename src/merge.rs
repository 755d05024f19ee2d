//! Merge-on-write against the member store.
//!
//! Re-importing an overlapping register must converge: attendance unions,
//! absent fields fill in, and conflicting names annotate rather than
//! overwrite. Running the same import twice leaves the store unchanged.

use crate::aggregate::recompute_derived;
use crate::error::Result;
use crate::store::MemberStore;
use crate::types::Member;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Change types for merge operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MergeOutcome {
    Created,
    Updated,
    NoChange,
    Error,
}

/// One change record per member written through the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergeRecord {
    pub member_id: String,
    pub member_name: String,
    pub outcome: MergeOutcome,
    pub change_log: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MergeSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errored: usize,
    pub records: Vec<MergeRecord>,
}

/// Merge a freshly parsed member into its stored record.
///
/// Attendance dates are unioned. Start date, plan fields, and the
/// normalized mobile fill only where the stored record lacks them. A
/// differing incoming name becomes a conflict annotation; the stored name
/// stays. Derived dates are recomputed from the merged attendance.
pub fn merge_member(existing: &Member, incoming: &Member) -> Member {
    let mut merged = existing.clone();

    merged.attendance.extend(incoming.attendance.iter().copied());

    if merged.start_date.is_none() {
        merged.start_date = incoming.start_date;
    }
    if merged.plan_type.is_none() && incoming.plan_type.is_some() {
        merged.plan_type = incoming.plan_type;
        merged.plan_months = incoming.plan_months;
    }
    if merged.plan_raw.is_none() {
        merged.plan_raw = incoming.plan_raw.clone();
    }
    if merged.mobile_normalized.is_none() {
        merged.mobile_normalized = incoming.mobile_normalized.clone();
    }
    if merged.import_month_iso.is_empty() && !incoming.import_month_iso.is_empty() {
        merged.import_month = incoming.import_month.clone();
        merged.import_month_iso = incoming.import_month_iso.clone();
    }

    let incoming_name = incoming.name.trim();
    if !incoming_name.is_empty() {
        if merged.name.trim().is_empty() {
            merged.name = incoming_name.to_string();
        } else if !merged.name.trim().eq_ignore_ascii_case(incoming_name)
            && !merged
                .name_conflicts
                .iter()
                .any(|n| n.eq_ignore_ascii_case(incoming_name))
        {
            merged.name_conflicts.push(incoming_name.to_string());
        }
    }

    merged.needs_review =
        merged.needs_review || incoming.needs_review || !merged.name_conflicts.is_empty();
    recompute_derived(&mut merged);
    merged
}

/// Write a batch of parsed members through the store, merging each against
/// whatever is already persisted under its identity key.
///
/// A store failure on one member is recorded and the batch continues.
pub async fn merge_into_store(store: &dyn MemberStore, members: &[Member]) -> Result<MergeSummary> {
    let mut summary = MergeSummary::default();

    for member in members {
        match merge_one(store, member).await {
            Ok(record) => {
                match record.outcome {
                    MergeOutcome::Created => summary.created += 1,
                    MergeOutcome::Updated => summary.updated += 1,
                    MergeOutcome::NoChange => summary.unchanged += 1,
                    MergeOutcome::Error => summary.errored += 1,
                }
                summary.records.push(record);
            }
            Err(e) => {
                error!("Merge failed for member {}: {}", member.id, e);
                summary.errored += 1;
                summary.records.push(MergeRecord {
                    member_id: member.id.clone(),
                    member_name: member.name.clone(),
                    outcome: MergeOutcome::Error,
                    change_log: format!("Merge failed: {e}"),
                });
            }
        }
    }

    info!(
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        errored = summary.errored,
        "merge complete"
    );
    Ok(summary)
}

async fn merge_one(store: &dyn MemberStore, member: &Member) -> Result<MergeRecord> {
    if let Some(existing) = store.get_member(&member.id).await? {
        let merged = merge_member(&existing, member);
        if merged == existing {
            debug!("No changes for member: {}", member.name);
            return Ok(MergeRecord {
                member_id: member.id.clone(),
                member_name: member.name.clone(),
                outcome: MergeOutcome::NoChange,
                change_log: format!("No changes for member: {}", existing.name),
            });
        }
        store.put_member(&merged).await?;
        return Ok(MergeRecord {
            member_id: member.id.clone(),
            member_name: merged.name.clone(),
            outcome: MergeOutcome::Updated,
            change_log: format!(
                "Updated member: {} ({} attendance dates)",
                merged.name, merged.attendance_count
            ),
        });
    }

    store.put_member(member).await?;
    Ok(MergeRecord {
        member_id: member.id.clone(),
        member_name: member.name.clone(),
        outcome: MergeOutcome::Created,
        change_log: format!("Created new member: {}", member.name),
    })
}
