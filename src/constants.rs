/// Register vocabulary constants to ensure consistency across the codebase.
/// The register format hardcodes these tokens; they are not configurable.

/// Calendar month names as they appear in section marker rows.
pub const MONTH_NAMES: [&str; 12] = [
    "JANUARY",
    "FEBRUARY",
    "MARCH",
    "APRIL",
    "MAY",
    "JUNE",
    "JULY",
    "AUGUST",
    "SEPTEMBER",
    "OCTOBER",
    "NOVEMBER",
    "DECEMBER",
];

/// Keywords that identify the column-header row.
pub const HEADER_KEYWORDS: [&str; 9] = [
    "NAME", "CONTACT", "MOBILE", "DATE", "MONTHS", "DURATION", "START", "DUE", "SR NO",
];

/// Header keywords that boost a column's mobile score.
pub const MOBILE_HEADER_KEYWORDS: [&str; 3] = ["CONTACT", "PHONE", "MOBILE"];

/// Header fragments that mark a serial-number column, penalized in mobile scoring.
pub const SERIAL_HEADER_HINTS: [&str; 2] = ["NO.", "SR"];

/// Cell value marking presence in a date-labeled attendance column.
pub const ATTENDANCE_PRESENT_MARK: &str = "P";

/// Visible mobile field for members whose number could not be recovered.
pub const MOBILE_NOT_AVAILABLE: &str = "Not Available";

/// Section label for rows preceding any detected month section.
pub const UNKNOWN_SECTION_LABEL: &str = "UNKNOWN";

/// Country calling code stripped from over-long mobile numbers.
pub const COUNTRY_CALLING_CODE: &str = "91";

/// Designated column probed for dates when a section marker omits the year.
pub const YEAR_PROBE_COLUMN: usize = 3;

/// Find the first calendar month name contained in `text` (case-insensitive).
/// Returns the canonical upper-case name and its 1-based month number.
pub fn find_month(text: &str) -> Option<(&'static str, u32)> {
    let upper = text.to_uppercase();
    MONTH_NAMES
        .iter()
        .position(|m| upper.contains(m))
        .map(|i| (MONTH_NAMES[i], i as u32 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_month_inside_marker_text() {
        assert_eq!(find_month("FEBRUARY 2023"), Some(("FEBRUARY", 2)));
        assert_eq!(find_month("  march"), Some(("MARCH", 3)));
        assert_eq!(find_month("attendance for December"), Some(("DECEMBER", 12)));
        assert_eq!(find_month("SR NO."), None);
    }
}
