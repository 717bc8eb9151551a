use thiserror::Error;

/// Failures surfaced by the data pipeline to the presentation layer.
///
/// An empty selection is not an error; see [`super::request::Response::Empty`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// A referenced column is absent from the loaded dataset.
    #[error("column not available: '{column}' (available: {})", available.join(", "))]
    SchemaMismatch {
        column: String,
        available: Vec<String>,
    },

    /// The dataset could not be fetched or opened. Fatal for the session.
    #[error("data source unavailable: {source_name}: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// The source was reachable but its content could not be parsed.
    #[error("could not parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// A numeric operation was asked to work on a text column.
    #[error("column '{column}' is not numeric")]
    NotNumeric { column: String },

    /// Too few non-missing values for a statistical operation.
    #[error("not enough data for {operation}: need at least {needed}, found {found}")]
    InsufficientData {
        operation: &'static str,
        needed: usize,
        found: usize,
    },

    /// The least-squares system has no unique solution (collinear or constant features).
    #[error("not enough data for regression: features are collinear or constant")]
    SingularFit,
}

impl PipelineError {
    pub fn schema_mismatch(column: &str, available: &[String]) -> Self {
        PipelineError::SchemaMismatch {
            column: column.to_string(),
            available: available.to_vec(),
        }
    }

    /// Whether the error means "not enough data" rather than a broken request.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            PipelineError::InsufficientData { .. } | PipelineError::SingularFit
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
