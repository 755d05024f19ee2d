//! Cell-level interpretation: turning one untyped cell into a date, a
//! mobile number, or a plan, without looking at any other cell.

use crate::grid::Cell;
use crate::types::PlanType;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Serial-date epoch used by the workbook format (day 0 = 1899-12-30,
/// which absorbs the historical leap-year-1900 offset).
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Serials at or beyond 10000-01-01 are treated as non-dates.
const SERIAL_MAX: f64 = 2_958_466.0;

/// Bare numeric cells below this are member serial numbers, not day counts.
/// Typed date cells bypass this floor; it only gates heuristic coercion.
const SERIAL_DAY_MIN: f64 = 1_000.0;

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());
static SLASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2,4})$").unwrap());
static DASH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-(\d{1,2})-(\d{2,4})$").unwrap());
static PLACEHOLDER_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[xX\s.\-/]+$").unwrap());

/// Convert a workbook serial number into a date-time.
///
/// Returns `None` for serials outside the plausible date range, so stray
/// numeric cells (serial numbers, counts, phone fragments) fall through.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial >= SERIAL_MAX {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let secs = (serial.fract() * 86_400.0).round() as i64;
    epoch
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(secs))
}

/// Interpret a cell as a calendar date, trying the typed value first and
/// falling back to textual patterns.
///
/// Numeric cells only coerce when large enough to be a plausible day count,
/// so serial-number columns never read as dates.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(dt) => Some(dt.date()),
        Cell::Number(n) if *n >= SERIAL_DAY_MIN => serial_to_datetime(*n).map(|dt| dt.date()),
        Cell::Number(_) => None,
        Cell::Text(s) => parse_date_text(s),
        Cell::Empty => None,
    }
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() || is_placeholder_run(text) {
        return None;
    }
    if let Some(caps) = ISO_DATE.captures(text) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = SLASH_DATE.captures(text) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year = expand_year(caps[3].parse().ok()?);
        return resolve_slash(first, second, year);
    }
    if let Some(caps) = DASH_DATE.captures(text) {
        // Short-lead dash dates are day-month-year, no reordering.
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = expand_year(caps[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// Decide which of the two leading numbers is the day. Registers in this
/// locale write day-first, so that wins when both readings are possible.
fn resolve_slash(first: u32, second: u32, year: i32) -> Option<NaiveDate> {
    let (day, month) = if first > 12 {
        (first, second)
    } else if second > 12 {
        (second, first)
    } else {
        (first, second)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(year: u32) -> i32 {
    if year < 100 {
        2000 + year as i32
    } else {
        year as i32
    }
}

/// True for filler strings like "xxxx" or "x-x" that mark an unknown value.
pub fn is_placeholder_run(text: &str) -> bool {
    !text.is_empty() && PLACEHOLDER_RUN.is_match(text) && text.chars().any(|c| c == 'x' || c == 'X')
}

/// Extract a normalized subscriber number from free-form text.
///
/// Strips everything but digits, drops a leading country calling code when
/// the result is longer than a local number, and keeps the trailing ten
/// digits if extras remain. Candidates shorter than `min_digits` are
/// rejected rather than padded.
pub fn normalize_mobile(raw: &str, min_digits: usize) -> Option<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() > 10 && digits.starts_with(crate::constants::COUNTRY_CALLING_CODE) {
        digits = digits[crate::constants::COUNTRY_CALLING_CODE.len()..].to_string();
    }
    if digits.len() > 10 {
        digits = digits[digits.len() - 10..].to_string();
    }
    if digits.len() >= min_digits {
        Some(digits)
    } else {
        None
    }
}

/// True when the cell's digit count sits in the range real subscriber
/// numbers occupy. Used for column scoring and swap detection.
pub fn is_likely_mobile(text: &str) -> bool {
    let digits = text.chars().filter(|c| c.is_ascii_digit()).count();
    (8..=13).contains(&digits)
}

/// Map a raw duration token ("1M", "3 months", bare "12", ...) onto a plan.
///
/// Everything but digits is stripped before mapping, so any month/mth
/// suffix spelling collapses away for free. Unrecognized month counts and
/// placeholder runs map to `None`, which callers treat as "plan unknown".
pub fn map_plan_token(raw: &str) -> Option<PlanType> {
    let token = raw.trim();
    if token.is_empty() || is_placeholder_run(token) {
        return None;
    }
    let digits: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
    let months: u32 = digits.parse().ok()?;
    PlanType::from_months(months)
}

/// True when the text reads like an ALL-CAPS register name: only uppercase
/// letters plus name punctuation, with at least two letters.
pub fn is_upper_name(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 2 || trimmed.len() > 200 {
        return false;
    }
    let mut letters = 0usize;
    for c in trimmed.chars() {
        if c.is_ascii_uppercase() {
            letters += 1;
        } else if c == ' ' || c == '.' || c == '-' || c == '\'' {
            continue;
        } else {
            return false;
        }
    }
    letters >= 2
}
