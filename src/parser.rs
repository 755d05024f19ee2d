//! The parse core: two passes over one in-memory grid.
//!
//! Pass one builds whole-sheet context (sections, column roles); pass two
//! walks the data rows against that read-only context. No row's
//! interpretation depends on another row's, so extraction order never
//! changes the result.

use crate::aggregate::Aggregator;
use crate::columns::{infer_columns, ColumnInference};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::extract::extract_row;
use crate::grid::RawGrid;
use crate::sections::SectionMap;
use crate::types::{AttendanceEvent, Diagnostics, ManualReviewItem, Member};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Everything one parse run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub members: Vec<Member>,
    pub attendance: Vec<AttendanceEvent>,
    pub manual_review: Vec<ManualReviewItem>,
    pub diagnostics: Diagnostics,
}

/// Parse a raw grid into members, attendance events, review items and
/// diagnostics. Fails only when no column-header row exists; everything
/// row-level degrades to flags instead.
pub fn parse_grid(grid: &RawGrid, config: &ParserConfig) -> Result<ParseOutcome> {
    let sections = SectionMap::build(grid, config);
    let ColumnInference {
        roles,
        mobile_scores,
        plan_detection,
    } = infer_columns(grid, config)?;

    let mut aggregator = Aggregator::new();
    let mut manual_review = Vec::new();
    let mut parsed_rows = 0usize;
    for row in roles.header_row + 1..grid.num_rows() {
        let Some(record) = extract_row(grid, row, &roles, &sections, config) else {
            continue;
        };
        parsed_rows += 1;
        if let Some(item) = record.review_item() {
            manual_review.push(item);
        }
        aggregator.absorb(&record);
    }
    let (members, attendance) = aggregator.finish();

    let total_rows = grid.num_rows();
    let diagnostics = Diagnostics {
        column_header_row: roles.header_row,
        detected_headers: sections.detected_headers(),
        plan_column_detection: plan_detection,
        mobile_column_scores: mobile_scores,
        total_rows,
        parsed_rows,
        skipped_rows: total_rows - parsed_rows,
    };
    info!(
        members = members.len(),
        attendance_events = attendance.len(),
        manual_review = manual_review.len(),
        parsed_rows,
        skipped_rows = diagnostics.skipped_rows,
        "parse complete"
    );
    Ok(ParseOutcome {
        members,
        attendance,
        manual_review,
        diagnostics,
    })
}
