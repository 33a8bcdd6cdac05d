use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Schema error: table '{table}' has no column '{column}'")]
    Schema { table: String, column: String },

    #[error("Parse error: table '{table}', column '{column}', row {row}: cannot parse '{value}'")]
    Parse {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    #[error("Source table '{0}' is missing")]
    SourceMissing(String),

    #[error("Malformed table '{table}': {reason}")]
    MalformedTable { table: String, reason: String },

    #[error("Referential integrity violated: {0}")]
    Integrity(String),

    #[error("Table store error: {0}")]
    Store(StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => PipelineError::SourceMissing(name),
            other => PipelineError::Store(other),
        }
    }
}

impl PipelineError {
    pub fn schema(table: impl Into<String>, column: impl Into<String>) -> Self {
        PipelineError::Schema {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn parse(
        table: impl Into<String>,
        column: impl Into<String>,
        row: usize,
        value: impl Into<String>,
    ) -> Self {
        PipelineError::Parse {
            table: table.into(),
            column: column.into(),
            row,
            value: value.into(),
        }
    }

    pub fn malformed(table: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::MalformedTable {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-friendly label, used for metrics and the run report
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Schema { .. } => "schema",
            PipelineError::Parse { .. } => "parse",
            PipelineError::SourceMissing(_) => "source_missing",
            PipelineError::MalformedTable { .. } => "malformed_table",
            PipelineError::Integrity(_) => "integrity",
            PipelineError::Store(_) => "store",
            PipelineError::Io(_) => "io",
            PipelineError::Json(_) => "json",
            PipelineError::Toml(_) => "toml",
            PipelineError::Config(_) => "config",
            PipelineError::Task(_) => "task",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_becomes_source_missing() {
        let err: PipelineError = StoreError::NotFound("pos_transactions".to_string()).into();
        assert!(matches!(err, PipelineError::SourceMissing(ref t) if t == "pos_transactions"));
        assert_eq!(err.kind(), "source_missing");
    }

    #[test]
    fn test_parse_error_message() {
        let err = PipelineError::parse("ecommerce_orders", "order_date", 3, "31/31/2024");
        assert_eq!(
            err.to_string(),
            "Parse error: table 'ecommerce_orders', column 'order_date', row 3: cannot parse '31/31/2024'"
        );
    }
}
