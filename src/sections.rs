//! Section detection: any row mentioning a calendar month acts as a marker,
//! and every data row inherits the nearest marker above it.

use crate::config::ParserConfig;
use crate::constants::{find_month, UNKNOWN_SECTION_LABEL, YEAR_PROBE_COLUMN};
use crate::grid::{Cell, RawGrid};
use crate::interpret::parse_date;
use crate::types::DetectedHeader;
use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// One detected month section.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub row_index: usize,
    pub month: u32,
    pub month_name: &'static str,
    pub year: i32,
}

impl Section {
    /// Human-facing key, e.g. "FEBRUARY-2023".
    pub fn label(&self) -> String {
        format!("{}-{}", self.month_name, self.year)
    }

    /// Sortable key, e.g. "2023-02".
    pub fn iso(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Per-row section lookup built in one pass over the grid.
#[derive(Debug, Clone)]
pub struct SectionMap {
    sections: Vec<Section>,
    marker_rows: BTreeSet<usize>,
}

impl SectionMap {
    pub fn build(grid: &RawGrid, config: &ParserConfig) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        let mut marker_rows = BTreeSet::new();
        for row in 0..grid.num_rows() {
            let Some((month_name, month)) = month_in_row(grid, row) else {
                continue;
            };
            let previous_year = sections.last().map(|s| s.year);
            let year = infer_year(grid, row, config, sections.is_empty(), previous_year);
            debug!(row, month = month_name, year, "detected section marker");
            sections.push(Section {
                row_index: row,
                month,
                month_name,
                year,
            });
            marker_rows.insert(row);
        }
        Self {
            sections,
            marker_rows,
        }
    }

    pub fn is_marker_row(&self, row: usize) -> bool {
        self.marker_rows.contains(&row)
    }

    /// Section governing `row`: the nearest marker strictly above it.
    pub fn section_for(&self, row: usize) -> Option<&Section> {
        self.sections
            .iter()
            .rev()
            .find(|section| section.row_index < row)
    }

    /// Label for `row`, falling back to the unknown sentinel above the
    /// first marker.
    pub fn label_for(&self, row: usize) -> String {
        self.section_for(row)
            .map(Section::label)
            .unwrap_or_else(|| UNKNOWN_SECTION_LABEL.to_string())
    }

    /// ISO `YYYY-MM` for `row`, or an empty string when unknown.
    pub fn iso_for(&self, row: usize) -> String {
        self.section_for(row).map(Section::iso).unwrap_or_default()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn detected_headers(&self) -> Vec<DetectedHeader> {
        self.sections
            .iter()
            .map(|s| DetectedHeader {
                row_index: s.row_index,
                month: s.month_name.to_string(),
                year: s.year,
            })
            .collect()
    }
}

/// A row is a marker as soon as any text cell mentions a month name.
/// Deliberately loose: marker rows never carry member data, and the rare
/// name containing a month substring costs one skipped row.
fn month_in_row(grid: &RawGrid, row: usize) -> Option<(&'static str, u32)> {
    grid.row(row).iter().find_map(|cell| match cell {
        Cell::Text(s) => find_month(s),
        _ => None,
    })
}

/// Year inference chain for a marker row, first hit wins:
/// a 4-digit token in the row itself, then a dated cell in the probe column
/// within the lookahead window, then any dated cell in the window, then the
/// configured fallback (a layout quirk of this dataset: only for a first
/// marker sitting at the second physical row), then the previous section's
/// year, then the current calendar year.
fn infer_year(
    grid: &RawGrid,
    row: usize,
    config: &ParserConfig,
    is_first_marker: bool,
    previous_year: Option<i32>,
) -> i32 {
    if let Some(year) = year_token_in_row(grid, row) {
        return year;
    }
    let window = config.year_scan_window;
    if let Some(year) = probe_column(grid, row, window, YEAR_PROBE_COLUMN) {
        return year;
    }
    if let Some(year) = probe_all_columns(grid, row, window) {
        return year;
    }
    if is_first_marker && row == 1 {
        return config.section_year_fallback;
    }
    if let Some(year) = previous_year {
        return year;
    }
    chrono::Utc::now().year()
}

fn year_token_in_row(grid: &RawGrid, row: usize) -> Option<i32> {
    for cell in grid.row(row) {
        if cell.is_blank() {
            continue;
        }
        let text = cell.text();
        if let Some(token) = YEAR_TOKEN.find(&text) {
            return token.as_str().parse().ok();
        }
    }
    None
}

fn probe_column(grid: &RawGrid, marker_row: usize, window: usize, column: usize) -> Option<i32> {
    let end = (marker_row + window + 1).min(grid.num_rows());
    (marker_row + 1..end).find_map(|row| parse_date(grid.cell(row, column)).map(|d| d.year()))
}

fn probe_all_columns(grid: &RawGrid, marker_row: usize, window: usize) -> Option<i32> {
    let end = (marker_row + window + 1).min(grid.num_rows());
    for row in marker_row + 1..end {
        for cell in grid.row(row) {
            if let Some(date) = parse_date(cell) {
                return Some(date.year());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn grid(rows: Vec<Vec<Cell>>) -> RawGrid {
        RawGrid::from_rows(rows)
    }

    #[test]
    fn rows_inherit_the_nearest_marker_above() {
        let g = grid(vec![
            vec![text("JANUARY 2023")],
            vec![text("RAVI KUMAR"), text("9876543210")],
            vec![text("FEBRUARY 2023")],
            vec![text("SUNIL SHETTY"), text("9123456780")],
        ]);
        let map = SectionMap::build(&g, &ParserConfig::default());
        assert_eq!(map.sections().len(), 2);
        assert_eq!(map.label_for(1), "JANUARY-2023");
        assert_eq!(map.label_for(3), "FEBRUARY-2023");
        assert_eq!(map.iso_for(3), "2023-02");
        assert!(map.is_marker_row(2));
        assert!(!map.is_marker_row(3));
    }

    #[test]
    fn rows_above_the_first_marker_are_unknown() {
        let g = grid(vec![
            vec![text("RAVI KUMAR")],
            vec![text("SUNIL SHETTY")],
            vec![text("MARCH 2024")],
            vec![text("ARUN NAIR")],
        ]);
        let map = SectionMap::build(&g, &ParserConfig::default());
        assert_eq!(map.label_for(0), "UNKNOWN");
        assert_eq!(map.iso_for(0), "");
        assert_eq!(map.label_for(3), "MARCH-2024");
    }

    #[test]
    fn yearless_markers_probe_the_start_date_column() {
        let start = NaiveDate::from_ymd_opt(2022, 7, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let g = grid(vec![
            vec![text("JULY")],
            vec![
                text("RAVI KUMAR"),
                text("9876543210"),
                text("1M"),
                Cell::Date(start),
            ],
        ]);
        let map = SectionMap::build(&g, &ParserConfig::default());
        assert_eq!(map.label_for(1), "JULY-2022");
    }

    #[test]
    fn yearless_markers_probe_every_column_when_the_usual_one_is_empty() {
        let g = grid(vec![
            vec![text("AUGUST")],
            vec![
                text("RAVI KUMAR"),
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                text("15/08/2022"),
            ],
        ]);
        let map = SectionMap::build(&g, &ParserConfig::default());
        assert_eq!(map.label_for(1), "AUGUST-2022");
    }

    #[test]
    fn first_marker_on_the_second_row_uses_the_configured_year() {
        let g = grid(vec![
            vec![text("ATTENDANCE REGISTER")],
            vec![text("JULY")],
            vec![text("RAVI KUMAR")],
        ]);
        let config = ParserConfig {
            section_year_fallback: 2021,
            ..ParserConfig::default()
        };
        let map = SectionMap::build(&g, &config);
        assert_eq!(map.label_for(2), "JULY-2021");
    }

    #[test]
    fn later_yearless_markers_reuse_the_previous_year() {
        let g = grid(vec![
            vec![text("NOVEMBER 2022")],
            vec![text("RAVI KUMAR")],
            vec![text("DECEMBER")],
            vec![text("SUNIL SHETTY")],
        ]);
        let map = SectionMap::build(&g, &ParserConfig::default());
        assert_eq!(map.label_for(3), "DECEMBER-2022");
    }

    #[test]
    fn month_substrings_inside_names_still_mark_sections() {
        let g = grid(vec![
            vec![text("FEBRUARY 2023")],
            vec![text("ROHIT MAYANK"), text("9876543210")],
        ]);
        let map = SectionMap::build(&g, &ParserConfig::default());
        assert!(map.is_marker_row(1), "substring matching is deliberately loose");
        assert_eq!(map.sections()[1].month_name, "MAY");
        assert_eq!(map.sections()[1].year, 2023);
    }
}
