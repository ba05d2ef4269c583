//! Error types for event decoding and batch analysis.

use std::path::PathBuf;
use thiserror::Error;

/// A single input line could not be turned into an [`crate::models::Event`].
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event {id} of type `{kind}` has no string `data.{field}`")]
    MissingPayload {
        id: String,
        kind: String,
        field: &'static str,
    },
}

/// Fatal errors for a whole batch run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("cannot read input file \"{}\"", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed event on line {line_number}")]
    MalformedLine {
        line_number: usize,
        #[source]
        source: DecodeError,
    },
}
