//! Pipeline orchestration for genscribe.
//!
//! Ties the completion client, the append-only logs, and the code
//! extractor/materializer together into the welcome and dropdown workflows.

pub mod pipeline;

pub use pipeline::{
    DropdownOutcome, PipelineContext, ProgressReporter, SilentProgress, WelcomeOutcome,
    run_dropdown, run_welcome,
};
