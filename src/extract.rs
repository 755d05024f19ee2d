//! Row extraction: pull name, mobile, plan, start date and attendance marks
//! from one data row, using the precomputed section map and column roles.
//!
//! Nothing here ever fails a row outright. Bad cells degrade to `None` and
//! a review flag; only rows with no usable signal at all are dropped.

use crate::columns::{is_header_like, ColumnRoles};
use crate::config::ParserConfig;
use crate::constants::ATTENDANCE_PRESENT_MARK;
use crate::grid::RawGrid;
use crate::interpret::{
    is_likely_mobile, is_placeholder_run, is_upper_name, map_plan_token, normalize_mobile,
    parse_date,
};
use crate::sections::SectionMap;
use crate::types::{ManualReviewItem, PlanType, ReviewReason};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Fixed early column where names conventionally sit.
const NAME_COLUMN: usize = 1;
/// Columns scanned for a name when the fixed column fails.
const NAME_SCAN_COLUMNS: usize = 10;
/// Columns scanned for a mobile when no mobile column was inferred.
const MOBILE_SCAN_COLUMNS: usize = 12;
/// Column range scanned for a plan token when the plan column fails.
const PLAN_SCAN_COLUMNS: std::ops::RangeInclusive<usize> = 2..=8;
/// Columns probed, left to right, for a start date.
const START_DATE_SCAN_COLUMNS: usize = 6;

/// Everything one contributing row yields before aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    pub row_index: usize,
    /// Resolved name; empty when nothing name-like was found.
    pub name: String,
    /// The raw mobile candidate text, post swap.
    pub mobile_raw: String,
    pub mobile_normalized: Option<String>,
    pub plan_raw: Option<String>,
    pub plan_type: Option<PlanType>,
    pub start_date: Option<NaiveDate>,
    pub attendance: BTreeSet<NaiveDate>,
    pub section_label: String,
    pub section_iso: String,
    pub review_reasons: Vec<ReviewReason>,
}

impl RowRecord {
    pub fn plan_months(&self) -> Option<u32> {
        self.plan_type.map(PlanType::months)
    }

    /// Review item for this row, when any flag was raised.
    pub fn review_item(&self) -> Option<ManualReviewItem> {
        if self.review_reasons.is_empty() {
            return None;
        }
        Some(ManualReviewItem {
            row_index: self.row_index,
            name: Some(self.name.clone()).filter(|n| !n.is_empty()),
            mobile_candidate: Some(self.mobile_raw.clone()).filter(|m| !m.is_empty()),
            mobile_normalized: self.mobile_normalized.clone(),
            plan_raw: self.plan_raw.clone(),
            import_month: Some(self.section_label.clone()),
            reason: ManualReviewItem::join_reasons(&self.review_reasons),
        })
    }
}

/// Extract one row, or `None` when the row is blank, a marker, a header
/// repetition, or carries no usable signal at all.
pub fn extract_row(
    grid: &RawGrid,
    row: usize,
    roles: &ColumnRoles,
    sections: &SectionMap,
    config: &ParserConfig,
) -> Option<RowRecord> {
    if grid.is_row_blank(row) || sections.is_marker_row(row) || is_header_like(grid, row, config) {
        return None;
    }

    let mut name = resolve_name(grid, row);
    let mut mobile_raw = resolve_mobile_candidate(grid, row, roles);

    // Swap heuristic: merged-cell artifacts upstream sometimes transpose
    // the two columns. Only fires when the evidence is unambiguous.
    if !is_likely_mobile(&mobile_raw) && is_likely_mobile(&name) {
        std::mem::swap(&mut name, &mut mobile_raw);
    }

    let mobile_normalized = normalize_mobile(&mobile_raw, config.min_mobile_digits);
    let (plan_raw, plan_type) = resolve_plan(grid, row, roles);
    let start_date = resolve_start_date(grid, row);
    let attendance = resolve_attendance(grid, row, roles);

    // A row with no name, no mobile and no marks is a formatting artifact:
    // it contributes nothing, not even a review flag.
    if name.is_empty() && mobile_normalized.is_none() && attendance.is_empty() {
        return None;
    }

    let mut review_reasons = Vec::new();
    if plan_type.is_none() {
        if plan_raw.is_some() {
            review_reasons.push(ReviewReason::UnknownPlan);
        } else {
            review_reasons.push(ReviewReason::MissingPlan);
        }
    }
    if mobile_normalized.is_none() {
        review_reasons.push(ReviewReason::NoMobile);
    }

    Some(RowRecord {
        row_index: row,
        name,
        mobile_raw,
        mobile_normalized,
        plan_raw,
        plan_type,
        start_date,
        attendance,
        section_label: sections.label_for(row),
        section_iso: sections.iso_for(row),
        review_reasons,
    })
}

/// Name resolution: the customary column when it looks like a register
/// name, else the first name-like cell in the early columns, else the raw
/// customary-column text when it carries letters beyond a placeholder run
/// or enough digits to feed the swap heuristic.
fn resolve_name(grid: &RawGrid, row: usize) -> String {
    let fixed = grid.cell(row, NAME_COLUMN).text().trim().to_string();
    if is_upper_name(&fixed) {
        return fixed;
    }
    for col in 0..NAME_SCAN_COLUMNS.min(grid.width()) {
        let text = grid.cell(row, col).text().trim().to_string();
        if is_upper_name(&text) {
            return text;
        }
    }
    let lettered = fixed.chars().any(|c| c.is_alphabetic()) && !is_placeholder_run(&fixed);
    if lettered || is_likely_mobile(&fixed) {
        return fixed;
    }
    String::new()
}

fn resolve_mobile_candidate(grid: &RawGrid, row: usize, roles: &ColumnRoles) -> String {
    if let Some(col) = roles.mobile {
        return grid.cell(row, col).text().trim().to_string();
    }
    for col in 0..MOBILE_SCAN_COLUMNS.min(grid.width()) {
        let text = grid.cell(row, col).text().trim().to_string();
        if is_likely_mobile(&text) {
            return text;
        }
    }
    if let Some(col) = roles.mobile_header_fallback {
        return grid.cell(row, col).text().trim().to_string();
    }
    String::new()
}

/// Plan resolution: the inferred plan column when its token maps, else the
/// first mapping token in the fallback range. An unmappable plan-column
/// value is still kept as `plan_raw` so review items carry the evidence.
fn resolve_plan(grid: &RawGrid, row: usize, roles: &ColumnRoles) -> (Option<String>, Option<PlanType>) {
    let column_text = roles
        .plan
        .map(|col| grid.cell(row, col).text().trim().to_string())
        .filter(|text| !text.is_empty());

    if let Some(text) = &column_text {
        if let Some(plan) = map_plan_token(text) {
            return (Some(text.clone()), Some(plan));
        }
    }
    for col in PLAN_SCAN_COLUMNS {
        let text = grid.cell(row, col).text().trim().to_string();
        if text.is_empty() {
            continue;
        }
        if let Some(plan) = map_plan_token(&text) {
            return (Some(text), Some(plan));
        }
    }
    (column_text, None)
}

fn resolve_start_date(grid: &RawGrid, row: usize) -> Option<NaiveDate> {
    (0..START_DATE_SCAN_COLUMNS).find_map(|col| parse_date(grid.cell(row, col)))
}

fn resolve_attendance(grid: &RawGrid, row: usize, roles: &ColumnRoles) -> BTreeSet<NaiveDate> {
    roles
        .attendance
        .iter()
        .filter(|a| {
            grid.cell(row, a.column)
                .text()
                .trim()
                .eq_ignore_ascii_case(ATTENDANCE_PRESENT_MARK)
        })
        .map(|a| a.date)
        .collect()
}
