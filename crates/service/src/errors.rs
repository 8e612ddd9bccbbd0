use thiserror::Error;

/// Failures raised by the file-backed document collection.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("data file is corrupt: {corrupt} of {total} lines unreadable (threshold {threshold})")]
    Corrupt { corrupt: usize, total: usize, threshold: f64 },
    #[error("invalid field name `{0}`: field names cannot begin with '$' or contain '.'")]
    InvalidField(String),
    #[error("cannot change a document's _id")]
    ImmutableId,
    #[error("malformed record {id}: {source}")]
    Malformed { id: String, source: serde_json::Error },
}

impl StoreError {
    pub fn malformed(id: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Malformed { id: id.into(), source }
    }
}
