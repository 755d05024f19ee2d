//! Member aggregation: merge row records sharing an identity key into one
//! member each, then compute the trailing derived dates.
//!
//! Aggregation is commutative per key, but members are emitted in first
//! appearance order so identical grids always serialize identically.

use crate::constants::MOBILE_NOT_AVAILABLE;
use crate::extract::RowRecord;
use crate::types::{AttendanceEvent, Member, PlanType};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// `YYYY-MM` prefix of a date.
pub fn year_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Calendar-month addition. Day-of-month clamps to the target month's end
/// (Jan 31 + 1 month = Feb 28), never rolls over into the month after.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Recompute every attendance-derived field from `attendance`, `plan_type`
/// and `plan_months`. The single source of truth for both a fresh parse
/// and a post-merge refresh.
pub fn recompute_derived(member: &mut Member) {
    member.attendance.sort_unstable();
    member.attendance.dedup();
    member.attended_months = member
        .attendance
        .iter()
        .map(|d| year_month(*d))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    member.attendance_count = member.attendance.len();
    member.last_attendance = member.attendance.last().copied();
    member.next_expected_attendance = member.last_attendance.and_then(|d| add_months(d, 1));
    member.next_payment_due_by_plan = match (member.last_attendance, member.plan_months) {
        (Some(last), Some(months)) => add_months(last, months),
        _ => None,
    };
}

/// Identity token for rows with no usable mobile. Derived from stable row
/// facts so re-parsing the same grid reproduces the same member ids.
fn fallback_identity(row_index: usize, name: &str) -> String {
    let seed = format!("register-row-{row_index}:{name}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
}

/// Running merged state for one identity key.
struct Fragment {
    name: String,
    mobile_normalized: Option<String>,
    plan_raw: Option<String>,
    plan_type: Option<PlanType>,
    start_date: Option<NaiveDate>,
    /// Date to the section label of its first contributing row.
    attendance: BTreeMap<NaiveDate, String>,
    section_label: String,
    section_iso: String,
    needs_review: bool,
}

/// Consolidates row records into members plus long-form attendance events.
#[derive(Default)]
pub struct Aggregator {
    order: Vec<String>,
    fragments: HashMap<String, Fragment>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one extracted row into the running state. Union attendance,
    /// fill-if-absent for everything else: a resolved plan or start date is
    /// never overwritten by a later unresolved one.
    pub fn absorb(&mut self, record: &RowRecord) {
        let identity = record
            .mobile_normalized
            .clone()
            .unwrap_or_else(|| fallback_identity(record.row_index, &record.name));

        let flagged = !record.review_reasons.is_empty();
        let order = &mut self.order;
        let fragment = self.fragments.entry(identity.clone()).or_insert_with(|| {
            order.push(identity);
            Fragment {
                name: record.name.clone(),
                mobile_normalized: record.mobile_normalized.clone(),
                plan_raw: None,
                plan_type: None,
                start_date: None,
                attendance: BTreeMap::new(),
                section_label: record.section_label.clone(),
                section_iso: record.section_iso.clone(),
                needs_review: false,
            }
        });

        if fragment.name.is_empty() && !record.name.is_empty() {
            fragment.name = record.name.clone();
        }
        if fragment.plan_type.is_none() && record.plan_type.is_some() {
            fragment.plan_type = record.plan_type;
            fragment.plan_raw = record.plan_raw.clone();
        } else if fragment.plan_raw.is_none() {
            fragment.plan_raw = record.plan_raw.clone();
        }
        if fragment.start_date.is_none() {
            fragment.start_date = record.start_date;
        }
        for date in &record.attendance {
            fragment
                .attendance
                .entry(*date)
                .or_insert_with(|| record.section_label.clone());
        }
        fragment.needs_review |= flagged;
    }

    /// Emit members in first-appearance order and one event per (member,
    /// date) pair, dates ascending within each member.
    pub fn finish(mut self) -> (Vec<Member>, Vec<AttendanceEvent>) {
        let mut members = Vec::with_capacity(self.order.len());
        let mut events = Vec::new();
        for identity in &self.order {
            let fragment = self
                .fragments
                .remove(identity)
                .expect("identity order entries always have a fragment");
            let mut member = Member {
                id: identity.clone(),
                name: fragment.name,
                mobile: fragment
                    .mobile_normalized
                    .clone()
                    .unwrap_or_else(|| MOBILE_NOT_AVAILABLE.to_string()),
                mobile_normalized: fragment.mobile_normalized,
                plan_raw: fragment.plan_raw,
                plan_type: fragment.plan_type,
                plan_months: fragment.plan_type.map(PlanType::months),
                start_date: fragment.start_date,
                attendance: fragment.attendance.keys().copied().collect(),
                attended_months: Vec::new(),
                attendance_count: 0,
                last_attendance: None,
                next_expected_attendance: None,
                next_payment_due_by_plan: None,
                import_month: fragment.section_label,
                import_month_iso: fragment.section_iso,
                needs_review: fragment.needs_review,
                name_conflicts: Vec::new(),
            };
            recompute_derived(&mut member);
            for (date, import_month) in fragment.attendance {
                events.push(AttendanceEvent {
                    member_id: member.id.clone(),
                    member_name: member.name.clone(),
                    attendance_date: date,
                    attended_month: year_month(date),
                    import_month,
                });
            }
            members.push(member);
        }
        (members, events)
    }
}
