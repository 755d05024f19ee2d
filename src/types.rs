use crate::columns::MobileColumnScore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Membership plan tier mapped from a raw duration token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanType {
    Monthly,
    Quarterly,
    #[serde(rename = "Half-Yearly")]
    HalfYearly,
    Yearly,
}

impl PlanType {
    pub fn months(self) -> u32 {
        match self {
            PlanType::Monthly => 1,
            PlanType::Quarterly => 3,
            PlanType::HalfYearly => 6,
            PlanType::Yearly => 12,
        }
    }

    pub fn from_months(months: u32) -> Option<Self> {
        match months {
            1 => Some(PlanType::Monthly),
            3 => Some(PlanType::Quarterly),
            6 => Some(PlanType::HalfYearly),
            12 => Some(PlanType::Yearly),
            _ => None,
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlanType::Monthly => "Monthly",
            PlanType::Quarterly => "Quarterly",
            PlanType::HalfYearly => "Half-Yearly",
            PlanType::Yearly => "Yearly",
        };
        write!(f, "{label}")
    }
}

/// A consolidated member record, one per identity key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Identity key: the normalized mobile, or a generated opaque token.
    pub id: String,
    pub name: String,
    /// Normalized mobile digits, or the "not available" sentinel.
    pub mobile: String,
    pub mobile_normalized: Option<String>,
    pub plan_raw: Option<String>,
    pub plan_type: Option<PlanType>,
    pub plan_months: Option<u32>,
    pub start_date: Option<NaiveDate>,
    /// Ascending, deduplicated.
    pub attendance: Vec<NaiveDate>,
    /// Ascending, deduplicated `YYYY-MM` prefixes of `attendance`.
    pub attended_months: Vec<String>,
    pub attendance_count: usize,
    pub last_attendance: Option<NaiveDate>,
    pub next_expected_attendance: Option<NaiveDate>,
    pub next_payment_due_by_plan: Option<NaiveDate>,
    /// Section key of the first contributing row, e.g. "FEBRUARY-2023".
    pub import_month: String,
    /// ISO form of the section, e.g. "2023-02"; empty when unknown.
    pub import_month_iso: String,
    pub needs_review: bool,
    /// Names seen for this identity that differ from `name`; filled by the
    /// store merge, never by a single parse.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_conflicts: Vec<String>,
}

/// One presence mark, long-form: a (member, date) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub member_id: String,
    pub member_name: String,
    pub attendance_date: NaiveDate,
    /// `YYYY-MM` prefix of `attendance_date`.
    pub attended_month: String,
    /// Section key of the row that contributed the mark.
    pub import_month: String,
}

/// Why a row was flagged for manual review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewReason {
    MissingPlan,
    UnknownPlan,
    NoMobile,
}

impl ReviewReason {
    pub fn tag(self) -> &'static str {
        match self {
            ReviewReason::MissingPlan => "missing_plan",
            ReviewReason::UnknownPlan => "unknown_plan",
            ReviewReason::NoMobile => "no_mobile",
        }
    }
}

/// A row whose data is incomplete or ambiguous and needs human correction.
/// Flagging is additive: the row's partial data still feeds a member record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualReviewItem {
    pub row_index: usize,
    pub name: Option<String>,
    pub mobile_candidate: Option<String>,
    pub mobile_normalized: Option<String>,
    pub plan_raw: Option<String>,
    pub import_month: Option<String>,
    /// Semicolon-joined reason tags, e.g. "missing_plan;no_mobile".
    pub reason: String,
}

impl ManualReviewItem {
    pub fn join_reasons(reasons: &[ReviewReason]) -> String {
        reasons
            .iter()
            .map(|r| r.tag())
            .collect::<Vec<_>>()
            .join(";")
    }
}

/// A section marker row the detector recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHeader {
    pub row_index: usize,
    pub month: String,
    pub year: i32,
}

/// Outcome of the plan-column inference, kept verbatim for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanColumnDetection {
    pub best_column: Option<usize>,
    pub per_column_match_counts: BTreeMap<usize, usize>,
}

/// Run-level detection summary. This is the primary debuggability surface
/// for the heuristics upstream of it; everything here is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub column_header_row: usize,
    pub detected_headers: Vec<DetectedHeader>,
    pub plan_column_detection: PlanColumnDetection,
    pub mobile_column_scores: Vec<MobileColumnScore>,
    pub total_rows: usize,
    pub parsed_rows: usize,
    pub skipped_rows: usize,
}
