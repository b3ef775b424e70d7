use thiserror::Error;

use crate::api_client::ApiError;
use crate::draft::{EditError, FieldErrors, Step};

/// Editor-level error type.
/// Every variant is recoverable: the draft is left as it was.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("Please complete all required fields in {}", .step.title())]
    Validation { step: Step, errors: FieldErrors },

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Could not encode CV: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("This CV is open in view-only mode")]
    ReadOnly,
}

impl EditorError {
    /// The single message a UI shows for this error.
    pub fn user_message(&self) -> String {
        match self {
            EditorError::Api(e) => e.user_message(),
            EditorError::Encode(e) => {
                tracing::error!("CV encode error: {e}");
                "Save failed".to_string()
            }
            other => other.to_string(),
        }
    }
}
