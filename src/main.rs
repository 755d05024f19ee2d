use anyhow::Context;
use clap::{Parser, Subcommand};
use gym_register::config::ParserConfig;
use gym_register::logging;
use gym_register::merge::merge_into_store;
use gym_register::pipeline::ImportPipeline;
use gym_register::reader::read_workbook;
use gym_register::store::{JsonFileMemberStore, MemberStore};
use gym_register::types::Member;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

#[derive(Parser)]
#[command(name = "gym_register")]
#[command(about = "Gym attendance/membership register extraction")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a register workbook and write the four JSON artifacts
    Import {
        /// Path to the register workbook (.xlsx/.xls/.ods)
        input: PathBuf,
        /// Worksheet to read (defaults to the first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// Directory for members/attendance/manual_review/diagnostics JSON
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
        /// TOML file overriding parser thresholds
        #[arg(long)]
        config: Option<PathBuf>,
        /// JSON member store to merge results into after parsing
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Merge a members.json artifact into a JSON member store
    Merge {
        /// Path to a members.json artifact from a previous import
        members: PathBuf,
        /// Path to the JSON member store file
        #[arg(long)]
        store: PathBuf,
    },
    /// Parse a register workbook and print detection diagnostics
    Inspect {
        /// Path to the register workbook (.xlsx/.xls/.ods)
        input: PathBuf,
        /// Worksheet to read (defaults to the first sheet)
        #[arg(long)]
        sheet: Option<String>,
        /// TOML file overriding parser thresholds
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ParserConfig> {
    match path {
        Some(path) => {
            ParserConfig::load(path).with_context(|| format!("loading config {}", path.display()))
        }
        None => Ok(ParserConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            input,
            sheet,
            output_dir,
            config,
            store,
        } => {
            let config = load_config(config.as_deref())?;
            let store: Option<Arc<dyn MemberStore>> = match store {
                Some(path) => Some(Arc::new(
                    JsonFileMemberStore::open(&path)
                        .with_context(|| format!("opening store {}", path.display()))?,
                )),
                None => None,
            };

            match ImportPipeline::run(&input, sheet.as_deref(), &output_dir, &config, store).await
            {
                Ok(summary) => {
                    println!("{}", summary.one_line());
                }
                Err(e) => {
                    error!("Import failed: {}", e);
                    anyhow::bail!("import of {} failed: {e}", input.display());
                }
            }
        }
        Commands::Merge { members, store } => {
            let raw = std::fs::read_to_string(&members)
                .with_context(|| format!("reading members artifact {}", members.display()))?;
            let parsed: Vec<Member> = serde_json::from_str(&raw)
                .with_context(|| format!("decoding members artifact {}", members.display()))?;

            let store = JsonFileMemberStore::open(&store)
                .with_context(|| format!("opening store {}", store.display()))?;
            let summary = merge_into_store(&store, &parsed).await?;
            println!(
                "✅ Merged {} members: {} created, {} updated, {} unchanged, {} errored",
                parsed.len(),
                summary.created,
                summary.updated,
                summary.unchanged,
                summary.errored
            );
        }
        Commands::Inspect { input, sheet, config } => {
            let config = load_config(config.as_deref())?;
            let grid = read_workbook(&input, sheet.as_deref())
                .with_context(|| format!("reading {}", input.display()))?;
            let outcome = gym_register::parse_grid(&grid, &config)?;
            println!("{}", serde_json::to_string_pretty(&outcome.diagnostics)?);
        }
    }
    Ok(())
}
