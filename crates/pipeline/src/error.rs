use chrono::NaiveDate;
use indicatif::style::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),

    #[error("History window of {days} days before {as_of} is out of the supported date range")]
    HistoryWindow { as_of: NaiveDate, days: u32 },

    #[error("Error joining the metrics task: {0}")]
    JoinError(String),

    #[error("Failed to read price file '{path}': {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),
}

impl From<TemplateError> for PipelineError {
    fn from(error: TemplateError) -> Self {
        PipelineError::ProgressBarTemplate(error.to_string())
    }
}
