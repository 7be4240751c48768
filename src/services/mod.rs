//! Services that drive the pipeline, independent of the CLI.

pub mod extract;

pub use extract::{
    AggregatedDocument, ExtractError, ExtractService, NoopObserver, PageOutcome, PageStats,
    ProgressObserver, RunOutcome, RunSummary,
};
