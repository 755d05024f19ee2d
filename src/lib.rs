pub mod aggregate;
pub mod columns;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod grid;
pub mod interpret;
pub mod logging;
pub mod merge;
pub mod parser;
pub mod pipeline;
pub mod reader;
pub mod sections;
pub mod store;
pub mod types;

pub use config::ParserConfig;
pub use error::{RegisterError, Result};
pub use grid::{Cell, RawGrid};
pub use parser::{parse_grid, ParseOutcome};
pub use types::{AttendanceEvent, Diagnostics, ManualReviewItem, Member, PlanType};
