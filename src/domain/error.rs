use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    InputValidation(String),
    Classification(String),
    DatasetLoad(String),
    Export(String),
    Config(String),
    LLMError(String),
    /// A newer analysis started before this one finished.
    Cancelled(u64),
    NoAnalysis,
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::InputValidation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Classification(msg) => write!(f, "Classification error: {}", msg),
            AppError::DatasetLoad(msg) => write!(f, "Dataset load error: {}", msg),
            AppError::Export(msg) => write!(f, "Export error: {}", msg),
            AppError::Config(msg) => write!(f, "Config error: {}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::Cancelled(run_id) => {
                write!(f, "Analysis run {} was superseded by a newer run", run_id)
            }
            AppError::NoAnalysis => write!(f, "No successful analysis to export yet"),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
