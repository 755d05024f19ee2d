//! Column role inference: find the header row, then decide which column
//! holds mobiles and which holds plan durations, since positions vary from
//! sheet to sheet. Runs once per grid; the scoring evidence is kept
//! verbatim for diagnostics.

use crate::config::ParserConfig;
use crate::constants::{HEADER_KEYWORDS, MOBILE_HEADER_KEYWORDS, SERIAL_HEADER_HINTS};
use crate::error::{RegisterError, Result};
use crate::grid::{Cell, RawGrid};
use crate::interpret::{map_plan_token, parse_date};
use crate::types::PlanColumnDetection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Score bonus for a header naming a contact column.
const MOBILE_HEADER_BONUS: f64 = 50.0;
/// Score malus for a header naming a serial-number column.
const SERIAL_HEADER_MALUS: f64 = -10.0;
/// Weight of the numeric-cell ratio term.
const NUMERIC_RATIO_WEIGHT: f64 = 40.0;
/// Ceiling of the uniqueness term.
const UNIQUENESS_WEIGHT: f64 = 10.0;
/// Weight of the alphabetic-cell ratio penalty.
const ALPHABETIC_RATIO_WEIGHT: f64 = 30.0;
/// Digit counts eligible for the numeric-cell tally. Wider than the
/// per-row mobile band on purpose: scoring tolerates partial numbers.
const SCORING_DIGIT_RANGE: std::ops::RangeInclusive<usize> = 6..=13;

/// A header cell that is itself a date labels an attendance column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendanceColumn {
    pub column: usize,
    pub date: NaiveDate,
}

/// Best-guess column indices, chosen once and applied to all rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRoles {
    pub header_row: usize,
    pub mobile: Option<usize>,
    pub plan: Option<usize>,
    /// Date-labeled columns to the right of the named headers, in order.
    pub attendance: Vec<AttendanceColumn>,
    /// Column whose header names a contact field, kept for the per-row
    /// fallback even when scoring rejects it.
    pub mobile_header_fallback: Option<usize>,
}

/// One row of the mobile-column scoring table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileColumnScore {
    pub column: usize,
    pub header: String,
    pub non_empty_cells: usize,
    /// Cells whose digit count falls in the scoring band.
    pub numeric_cells: usize,
    /// Cells containing any alphabetic character.
    pub alphabetic_cells: usize,
    /// Distinct digit strings among the numeric cells.
    pub distinct_numeric_values: usize,
    pub header_bonus: f64,
    pub score: f64,
}

/// Roles plus the evidence they were inferred from.
#[derive(Debug, Clone)]
pub struct ColumnInference {
    pub roles: ColumnRoles,
    pub mobile_scores: Vec<MobileColumnScore>,
    pub plan_detection: PlanColumnDetection,
}

/// How many of a row's text cells mention at least one header keyword.
/// Counted per cell, not per keyword, so a single banner cell spanning
/// several keywords cannot qualify a row on its own.
pub fn header_keyword_hits(grid: &RawGrid, row: usize) -> usize {
    grid.row(row)
        .iter()
        .filter_map(|cell| match cell {
            Cell::Text(s) => Some(s.to_uppercase()),
            _ => None,
        })
        .filter(|text| HEADER_KEYWORDS.iter().any(|kw| text.contains(kw)))
        .count()
}

/// True for the column-header row and any mid-sheet repetition of it.
pub fn is_header_like(grid: &RawGrid, row: usize, config: &ParserConfig) -> bool {
    header_keyword_hits(grid, row) >= config.header_keyword_min
}

/// Locate the column-header row: the first row near the top that mentions
/// enough of the known header keywords. Without it nothing downstream can
/// anchor, so absence is fatal rather than a silent default to row zero.
pub fn find_header_row(grid: &RawGrid, config: &ParserConfig) -> Result<usize> {
    let scanned = config.header_scan_rows.min(grid.num_rows());
    for row in 0..scanned {
        if is_header_like(grid, row, config) {
            debug!(row, "found column-header row");
            return Ok(row);
        }
    }
    Err(RegisterError::HeaderRowNotFound { scanned })
}

/// Infer every column role for the sheet.
pub fn infer_columns(grid: &RawGrid, config: &ParserConfig) -> Result<ColumnInference> {
    let header_row = find_header_row(grid, config)?;
    let headers = header_texts(grid, header_row);

    let attendance = attendance_columns(grid, header_row);
    let mobile_header_fallback = headers
        .iter()
        .position(|h| MOBILE_HEADER_KEYWORDS.iter().any(|kw| h.contains(kw)));

    let mobile_scores = score_mobile_columns(grid, header_row, &headers);
    let mobile = pick_mobile_column(&mobile_scores, config.mobile_score_threshold);
    let plan_detection = detect_plan_column(grid, config);

    let roles = ColumnRoles {
        header_row,
        mobile,
        plan: plan_detection.best_column,
        attendance,
        mobile_header_fallback,
    };
    debug!(
        header_row,
        mobile = ?roles.mobile,
        plan = ?roles.plan,
        attendance_columns = roles.attendance.len(),
        "inferred column roles"
    );
    Ok(ColumnInference {
        roles,
        mobile_scores,
        plan_detection,
    })
}

fn header_texts(grid: &RawGrid, header_row: usize) -> Vec<String> {
    (0..grid.width())
        .map(|col| grid.cell(header_row, col).text().trim().to_uppercase())
        .collect()
}

/// Header cells that parse as dates mark per-day attendance columns.
fn attendance_columns(grid: &RawGrid, header_row: usize) -> Vec<AttendanceColumn> {
    grid.row(header_row)
        .iter()
        .enumerate()
        .filter_map(|(column, cell)| parse_date(cell).map(|date| AttendanceColumn { column, date }))
        .collect()
}

fn header_bonus(header: &str) -> f64 {
    let mut bonus = 0.0;
    if MOBILE_HEADER_KEYWORDS.iter().any(|kw| header.contains(kw)) {
        bonus += MOBILE_HEADER_BONUS;
    }
    if SERIAL_HEADER_HINTS.iter().any(|kw| header.contains(kw)) {
        bonus += SERIAL_HEADER_MALUS;
    }
    bonus
}

/// Score each column on how much its data below the header looks like
/// phone numbers: mostly-unique digit strings of plausible length, few
/// alphabetic cells, ideally under a contact-ish header.
fn score_mobile_columns(
    grid: &RawGrid,
    header_row: usize,
    headers: &[String],
) -> Vec<MobileColumnScore> {
    (0..grid.width())
        .map(|column| {
            let header = headers.get(column).cloned().unwrap_or_default();
            let mut non_empty_cells = 0usize;
            let mut numeric_cells = 0usize;
            let mut alphabetic_cells = 0usize;
            let mut distinct: BTreeSet<String> = BTreeSet::new();
            for row in header_row + 1..grid.num_rows() {
                let cell = grid.cell(row, column);
                if cell.is_blank() || matches!(cell, Cell::Date(_)) {
                    continue;
                }
                non_empty_cells += 1;
                let text = cell.text();
                let digits = cell.digits();
                if SCORING_DIGIT_RANGE.contains(&digits.len()) {
                    numeric_cells += 1;
                    distinct.insert(digits);
                }
                if text.chars().any(|c| c.is_alphabetic()) {
                    alphabetic_cells += 1;
                }
            }
            let bonus = header_bonus(&header);
            let mut score = bonus + numeric_cells as f64;
            if non_empty_cells > 0 {
                let non_empty = non_empty_cells as f64;
                score += NUMERIC_RATIO_WEIGHT * numeric_cells as f64 / non_empty;
                score -= ALPHABETIC_RATIO_WEIGHT * alphabetic_cells as f64 / non_empty;
            }
            if numeric_cells > 0 {
                score += UNIQUENESS_WEIGHT * distinct.len() as f64 / numeric_cells as f64;
            }
            MobileColumnScore {
                column,
                header,
                non_empty_cells,
                numeric_cells,
                alphabetic_cells,
                distinct_numeric_values: distinct.len(),
                header_bonus: bonus,
                score,
            }
        })
        .collect()
}

fn pick_mobile_column(scores: &[MobileColumnScore], threshold: f64) -> Option<usize> {
    let mut best: Option<&MobileColumnScore> = None;
    for candidate in scores {
        // Strictly-greater keeps the leftmost column on ties.
        if best.map_or(true, |b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    best.filter(|b| b.score >= threshold).map(|b| b.column)
}

/// Count plan-shaped tokens per column across the entire grid. Stray
/// matches in header or marker rows are tolerated since duration tokens
/// never collide with month names or header keywords. The customary plan
/// column wins outright with a single match; otherwise the densest column
/// wins if it clears the floor.
fn detect_plan_column(grid: &RawGrid, config: &ParserConfig) -> PlanColumnDetection {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for column in 0..grid.width() {
        let mut matches = 0usize;
        for row in 0..grid.num_rows() {
            let cell = grid.cell(row, column);
            if cell.is_blank() {
                continue;
            }
            if map_plan_token(&cell.text()).is_some() {
                matches += 1;
            }
        }
        if matches > 0 {
            counts.insert(column, matches);
        }
    }

    let preferred = config.preferred_plan_column;
    let best_column = if counts.get(&preferred).copied().unwrap_or(0) >= 1 {
        Some(preferred)
    } else {
        let best_count = counts.values().copied().max().unwrap_or(0);
        if best_count >= config.plan_column_min_matches {
            counts
                .iter()
                .find(|(_, &count)| count == best_count)
                .map(|(&col, _)| col)
        } else {
            None
        }
    };

    PlanColumnDetection {
        best_column,
        per_column_match_counts: counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn register_grid() -> RawGrid {
        RawGrid::from_rows(vec![
            vec![text("FEBRUARY 2023")],
            vec![
                text("SR NO."),
                text("NAME"),
                text("CONTACT NUMBER"),
                text("START DATE"),
                text("DUE DATE"),
                text("MONTHS"),
                text("01/02/2023"),
                text("02/02/2023"),
            ],
            vec![
                Cell::Number(1.0),
                text("RAVI KUMAR"),
                text("9876543210"),
                text("01/02/2023"),
                text("01/03/2023"),
                text("1M"),
                text("P"),
                Cell::Empty,
            ],
            vec![
                Cell::Number(2.0),
                text("SUNIL SHETTY"),
                Cell::Number(9123456780.0),
                text("02/02/2023"),
                Cell::Empty,
                text("3 MONTHS"),
                text("P"),
                text("P"),
            ],
            vec![
                Cell::Number(3.0),
                text("ARUN NAIR"),
                text("98765 43211"),
                Cell::Empty,
                Cell::Empty,
                text("1"),
                Cell::Empty,
                text("P"),
            ],
        ])
    }

    fn infer(grid: &RawGrid) -> ColumnInference {
        infer_columns(grid, &ParserConfig::default()).unwrap()
    }

    #[test]
    fn resolves_roles_on_a_typical_sheet() {
        let grid = register_grid();
        let inference = infer(&grid);
        let roles = &inference.roles;
        assert_eq!(roles.header_row, 1);
        assert_eq!(roles.mobile, Some(2));
        assert_eq!(roles.plan, Some(5));
        assert_eq!(roles.mobile_header_fallback, Some(2));
        let attendance: Vec<(usize, NaiveDate)> = roles
            .attendance
            .iter()
            .map(|a| (a.column, a.date))
            .collect();
        assert_eq!(
            attendance,
            vec![
                (6, NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()),
                (7, NaiveDate::from_ymd_opt(2023, 2, 2).unwrap()),
            ]
        );
    }

    #[test]
    fn mobile_scoring_rewards_contact_headers_and_punishes_serial_columns() {
        let grid = register_grid();
        let inference = infer(&grid);
        let serial = &inference.mobile_scores[0];
        assert_eq!(serial.header_bonus, SERIAL_HEADER_MALUS);
        assert_eq!(serial.numeric_cells, 0);
        assert!(serial.score < 0.0);
        let contact = &inference.mobile_scores[2];
        assert_eq!(contact.header_bonus, MOBILE_HEADER_BONUS);
        assert_eq!(contact.numeric_cells, 3);
        assert_eq!(contact.distinct_numeric_values, 3);
        assert!(contact.score > 100.0);
    }

    #[test]
    fn the_customary_plan_column_wins_with_a_single_match() {
        let grid = RawGrid::from_rows(vec![
            vec![
                text("NAME"),
                text("CONTACT"),
                text("START DATE"),
                Cell::Empty,
                Cell::Empty,
                text("MONTHS"),
            ],
            vec![text("RAVI KUMAR"), text("9876543210"), Cell::Empty, text("1M"), Cell::Empty, text("3M")],
            vec![text("SUNIL SHETTY"), text("9123456780"), Cell::Empty, text("1M"), Cell::Empty, Cell::Empty],
            vec![text("ARUN NAIR"), text("9988776655"), Cell::Empty, text("6M"), Cell::Empty, Cell::Empty],
        ]);
        let inference = infer(&grid);
        assert_eq!(
            inference.plan_detection.per_column_match_counts.get(&3),
            Some(&3)
        );
        assert_eq!(inference.roles.plan, Some(5), "column 5 wins outright");
    }

    #[test]
    fn without_the_customary_column_the_densest_one_wins() {
        let grid = RawGrid::from_rows(vec![
            vec![text("NAME"), text("CONTACT"), text("DURATION")],
            vec![text("RAVI KUMAR"), text("9876543210"), text("1M")],
            vec![text("SUNIL SHETTY"), text("9123456780"), text("12 MONTHS")],
        ]);
        let inference = infer(&grid);
        assert_eq!(inference.roles.plan, Some(2));
    }

    #[test]
    fn a_single_stray_token_is_not_enough_for_a_plan_column() {
        let grid = RawGrid::from_rows(vec![
            vec![text("NAME"), text("CONTACT"), text("DURATION")],
            vec![text("RAVI KUMAR"), text("9876543210"), text("1M")],
            vec![text("SUNIL SHETTY"), text("9123456780"), Cell::Empty],
        ]);
        let inference = infer(&grid);
        assert_eq!(inference.roles.plan, None);
        assert_eq!(
            inference.plan_detection.per_column_match_counts.get(&2),
            Some(&1)
        );
    }

    #[test]
    fn a_banner_cell_spanning_two_keywords_is_one_hit() {
        let grid = RawGrid::from_rows(vec![
            vec![text("MEMBERSHIP START DATE RECORD")],
            vec![
                text("SR NO."),
                text("NAME"),
                text("CONTACT"),
                text("START DATE"),
                Cell::Empty,
                text("MONTHS"),
            ],
            vec![
                Cell::Number(1.0),
                text("RAVI KUMAR"),
                text("9876543210"),
                Cell::Empty,
                Cell::Empty,
                text("1M"),
            ],
        ]);
        assert_eq!(header_keyword_hits(&grid, 0), 1);
        assert!(!is_header_like(&grid, 0, &ParserConfig::default()));
        let inference = infer(&grid);
        assert_eq!(inference.roles.header_row, 1, "the banner is not the header");
    }

    #[test]
    fn missing_header_row_is_fatal() {
        let grid = RawGrid::from_rows(vec![
            vec![text("JANUARY 2023")],
            vec![text("RAVI KUMAR"), text("9876543210")],
        ]);
        let err = infer_columns(&grid, &ParserConfig::default()).unwrap_err();
        assert!(matches!(err, RegisterError::HeaderRowNotFound { scanned: 2 }));
    }

    #[test]
    fn alphabetic_columns_never_reach_the_mobile_threshold() {
        let grid = RawGrid::from_rows(vec![
            vec![text("NAME"), text("START DATE"), text("MONTHS")],
            vec![text("RAVI KUMAR"), Cell::Empty, text("1M")],
            vec![text("SUNIL SHETTY"), Cell::Empty, text("3M")],
        ]);
        let inference = infer(&grid);
        assert_eq!(inference.roles.mobile, None);
    }
}
