//! Error types for the amplicon-tidy library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum TidyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Binary taxonomy error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Input file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Parse error in {} at line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Sample '{sample}' has no row in the sample metadata")]
    Alignment { sample: String },

    #[error("Empty result: {0}")]
    EmptyResult(String),

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<TidyError>,
    },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TidyError {
    /// Attach the name of the pipeline stage that raised this error.
    pub fn in_stage(self, stage: &'static str) -> Self {
        match self {
            // Keep the innermost stage name.
            TidyError::Stage { .. } => self,
            other => TidyError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The error with any stage wrapper removed.
    pub fn root(&self) -> &TidyError {
        match self {
            TidyError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, TidyError>;

/// Fail with [`TidyError::MissingFile`] unless `path` resolves to a file.
pub(crate) fn require_file(path: &std::path::Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(TidyError::MissingFile {
            path: path.to_path_buf(),
        })
    }
}
