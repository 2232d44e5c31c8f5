//! Pipeline composition and execution for amplicon tidying and ordination.

mod runner;

pub use runner::{Pipeline, PipelineConfig, PipelineOutput};
