//! Workbook reading: load one worksheet into a `RawGrid`.
//!
//! The grid preserves absolute cell positions. Used ranges rarely start at
//! the sheet origin, so rows and columns are padded back out; column
//! indices and physical row numbers carry meaning downstream.

use crate::error::{RegisterError, Result};
use crate::grid::{Cell, RawGrid};
use crate::interpret::serial_to_datetime;
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::info;

/// Read one worksheet (the first, unless named) as a raw grid.
pub fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<RawGrid> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(RegisterError::NoWorksheet)?,
    };
    let range = workbook.worksheet_range(&sheet_name)?;

    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(start_row + range.height());
    rows.resize_with(start_row, Vec::new);
    for source_row in range.rows() {
        let mut row = Vec::with_capacity(start_col + source_row.len());
        row.resize(start_col, Cell::Empty);
        row.extend(source_row.iter().map(convert_cell));
        rows.push(row);
    }
    info!(
        sheet = %sheet_name,
        rows = rows.len(),
        columns = start_col + range.width(),
        "loaded worksheet"
    );
    Ok(RawGrid::from_rows(rows))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
