use crate::config::ParserConfig;
use crate::error::Result;
use crate::grid::RawGrid;
use crate::merge::{merge_into_store, MergeSummary};
use crate::parser::{parse_grid, ParseOutcome};
use crate::reader::read_workbook;
use crate::store::MemberStore;
use metrics::{counter, histogram};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

/// Result of a complete import run
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub input: String,
    pub total_rows: usize,
    pub parsed_rows: usize,
    pub skipped_rows: usize,
    pub members: usize,
    pub attendance_events: usize,
    pub manual_review: usize,
    pub output_dir: String,
    pub merge: Option<MergeSummary>,
}

impl ImportSummary {
    /// One-line count report for the CLI.
    pub fn one_line(&self) -> String {
        let mut line = format!(
            "✅ {} members, {} attendance events, {} for review ({}/{} rows parsed) → {}",
            self.members,
            self.attendance_events,
            self.manual_review,
            self.parsed_rows,
            self.total_rows,
            self.output_dir
        );
        if let Some(merge) = &self.merge {
            line.push_str(&format!(
                " | store: {} created, {} updated, {} unchanged, {} errored",
                merge.created, merge.updated, merge.unchanged, merge.errored
            ));
        }
        line
    }
}

pub struct ImportPipeline;

impl ImportPipeline {
    /// Run the complete import for one register file.
    #[instrument(skip(config, store), fields(input = %input.display()))]
    pub async fn run(
        input: &Path,
        sheet: Option<&str>,
        output_dir: &Path,
        config: &ParserConfig,
        store: Option<Arc<dyn MemberStore>>,
    ) -> Result<ImportSummary> {
        info!("🚀 Starting register import for {}", input.display());
        println!("🚀 Importing {}", input.display());
        counter!("register_import_runs_total").increment(1);
        let t_run = std::time::Instant::now();

        let t_read = std::time::Instant::now();
        let grid = read_workbook(input, sheet)?;
        histogram!("register_read_duration_seconds").record(t_read.elapsed().as_secs_f64());

        let summary = Self::run_on_grid(
            &grid,
            &input.display().to_string(),
            output_dir,
            config,
            store,
        )
        .await?;

        histogram!("register_import_duration_seconds").record(t_run.elapsed().as_secs_f64());
        Ok(summary)
    }

    /// Parse an already-loaded grid, write the four artifacts, and merge
    /// into the store when one is supplied.
    pub async fn run_on_grid(
        grid: &RawGrid,
        input_label: &str,
        output_dir: &Path,
        config: &ParserConfig,
        store: Option<Arc<dyn MemberStore>>,
    ) -> Result<ImportSummary> {
        info!("🔧 Parsing {} rows...", grid.num_rows());
        println!("🔧 Parsing {} rows...", grid.num_rows());
        let outcome = parse_grid(grid, config)?;

        counter!("register_rows_parsed_total")
            .increment(outcome.diagnostics.parsed_rows as u64);
        counter!("register_rows_skipped_total")
            .increment(outcome.diagnostics.skipped_rows as u64);
        counter!("register_manual_review_total").increment(outcome.manual_review.len() as u64);

        info!(
            "✅ Parsed {} members ({} review items, {} rows skipped)",
            outcome.members.len(),
            outcome.manual_review.len(),
            outcome.diagnostics.skipped_rows
        );
        println!(
            "✅ Parsed {} members ({} review items, {} rows skipped)",
            outcome.members.len(),
            outcome.manual_review.len(),
            outcome.diagnostics.skipped_rows
        );

        Self::persist_artifacts(&outcome, output_dir)?;
        info!("💾 Saved artifacts to {}", output_dir.display());
        println!("💾 Saved artifacts to {}", output_dir.display());

        let merge = match store {
            Some(store) => {
                info!("🔀 Merging {} members into store...", outcome.members.len());
                println!("🔀 Merging {} members into store...", outcome.members.len());
                Some(merge_into_store(store.as_ref(), &outcome.members).await?)
            }
            None => None,
        };

        Ok(ImportSummary {
            input: input_label.to_string(),
            total_rows: outcome.diagnostics.total_rows,
            parsed_rows: outcome.diagnostics.parsed_rows,
            skipped_rows: outcome.diagnostics.skipped_rows,
            members: outcome.members.len(),
            attendance_events: outcome.attendance.len(),
            manual_review: outcome.manual_review.len(),
            output_dir: output_dir.display().to_string(),
            merge,
        })
    }

    /// Write the four output collections as JSON artifacts.
    fn persist_artifacts(outcome: &ParseOutcome, output_dir: &Path) -> Result<()> {
        fs::create_dir_all(output_dir)?;

        let artifacts: [(&str, serde_json::Value); 4] = [
            ("members.json", serde_json::to_value(&outcome.members)?),
            ("attendance.json", serde_json::to_value(&outcome.attendance)?),
            (
                "manual_review.json",
                serde_json::to_value(&outcome.manual_review)?,
            ),
            (
                "diagnostics.json",
                serde_json::to_value(&outcome.diagnostics)?,
            ),
        ];
        for (filename, value) in artifacts {
            let filepath = output_dir.join(filename);
            fs::write(&filepath, serde_json::to_string_pretty(&value)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::store::InMemoryMemberStore;

    fn register_grid() -> RawGrid {
        RawGrid::from_rows(vec![
            vec![Cell::Text("FEBRUARY 2023".into())],
            vec![
                Cell::Text("SR NO.".into()),
                Cell::Text("MEMBER NAME".into()),
                Cell::Text("CONTACT".into()),
                Cell::Text("START DATE".into()),
                Cell::Text("NO. OF MONTHS".into()),
                Cell::Text("01/02/2023".into()),
            ],
            vec![
                Cell::Number(1.0),
                Cell::Text("JOHN DOE".into()),
                Cell::Text("9876543210".into()),
                Cell::Number(44957.0),
                Cell::Text("3M".into()),
                Cell::Text("P".into()),
            ],
            vec![
                Cell::Number(2.0),
                Cell::Text("JANE SMITH".into()),
                Cell::Text("1234567890".into()),
                Cell::Number(44958.0),
                Cell::Text("1M".into()),
                Cell::Text("P".into()),
            ],
            vec![
                Cell::Empty,
                Cell::Text("NO MOBILE".into()),
                Cell::Empty,
                Cell::Empty,
                Cell::Text("6M".into()),
                Cell::Empty,
            ],
        ])
    }

    #[tokio::test]
    async fn import_writes_all_four_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = ParserConfig::default();

        let summary =
            ImportPipeline::run_on_grid(&register_grid(), "register.xlsx", dir.path(), &config, None)
                .await
                .unwrap();

        assert_eq!(summary.members, 3);
        assert_eq!(summary.attendance_events, 2);
        assert_eq!(summary.manual_review, 1);
        assert!(summary.merge.is_none());

        for artifact in [
            "members.json",
            "attendance.json",
            "manual_review.json",
            "diagnostics.json",
        ] {
            let path = dir.path().join(artifact);
            assert!(path.exists(), "missing artifact {artifact}");
            let raw = std::fs::read_to_string(path).unwrap();
            serde_json::from_str::<serde_json::Value>(&raw).unwrap();
        }
    }

    #[tokio::test]
    async fn importing_twice_into_a_store_stays_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = ParserConfig::default();
        let store = Arc::new(InMemoryMemberStore::new());

        let first = ImportPipeline::run_on_grid(
            &register_grid(),
            "register.xlsx",
            dir.path(),
            &config,
            Some(store.clone()),
        )
        .await
        .unwrap();
        let merge = first.merge.unwrap();
        assert_eq!(merge.created, 3);

        let second = ImportPipeline::run_on_grid(
            &register_grid(),
            "register.xlsx",
            dir.path(),
            &config,
            Some(store.clone()),
        )
        .await
        .unwrap();
        let merge = second.merge.unwrap();
        assert_eq!(merge.created, 0);
        assert_eq!(merge.updated, 0);
        assert_eq!(merge.unchanged, 3);

        assert_eq!(store.list_members().await.unwrap().len(), 3);
    }

    #[test]
    fn one_line_summary_reports_counts() {
        let summary = ImportSummary {
            input: "register.xlsx".into(),
            total_rows: 5,
            parsed_rows: 3,
            skipped_rows: 2,
            members: 3,
            attendance_events: 2,
            manual_review: 1,
            output_dir: "output".into(),
            merge: None,
        };
        let line = summary.one_line();
        assert!(line.contains("3 members"));
        assert!(line.contains("3/5 rows parsed"));
    }
}
