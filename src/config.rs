use crate::error::{RegisterError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Tunable thresholds for the parse heuristics.
///
/// Two legacy parser variants disagreed on several of these numbers (mobile
/// digit floor, plan-column match minimum), so they are configuration rather
/// than constants. The defaults are the permissive documented variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Minimum digits for a normalized mobile to count as an identity.
    pub min_mobile_digits: usize,
    /// Header-keyword hits a row needs to qualify as the column-header row.
    pub header_keyword_min: usize,
    /// How many leading rows are scanned for the column-header row.
    pub header_scan_rows: usize,
    /// Plan-token matches a column needs before it is trusted.
    pub plan_column_min_matches: usize,
    /// Conventional plan-duration column; preferred outright if it has any match.
    pub preferred_plan_column: usize,
    /// Minimum score for the mobile-column inference to pick a winner.
    pub mobile_score_threshold: f64,
    /// Year assumed for a first section marker sitting at the sheet's second row.
    pub section_year_fallback: i32,
    /// Rows scanned below a section marker when probing for its year.
    pub year_scan_window: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_mobile_digits: 8,
            header_keyword_min: 2,
            header_scan_rows: 12,
            plan_column_min_matches: 2,
            preferred_plan_column: 5,
            mobile_score_threshold: 8.0,
            section_year_fallback: 2023,
            year_scan_window: 30,
        }
    }
}

impl ParserConfig {
    /// Load overrides from a TOML file; unspecified fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RegisterError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: ParserConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ParserConfig = toml::from_str("min_mobile_digits = 10").unwrap();
        assert_eq!(config.min_mobile_digits, 10);
        assert_eq!(config.header_keyword_min, 2);
        assert_eq!(config.preferred_plan_column, 5);
    }
}
