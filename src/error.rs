//! Error types for MergePilot

use serde::Serialize;
use thiserror::Error;

use crate::services::error_classifier::GitError;

/// Engine error types
#[derive(Error, Debug)]
pub enum MergePilotError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// A git subprocess failed and its stderr has been classified
    #[error("{0}")]
    GitCommand(GitError),

    #[error("Invalid rebase plan: {}", .0.join("; "))]
    InvalidPlan(Vec<String>),

    #[error("Cannot {action} while rebase is {state}")]
    InvalidTransition { state: String, action: String },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("Operation cannot be {0}")]
    Irreversible(String),
}

impl MergePilotError {
    fn code(&self) -> String {
        match self {
            MergePilotError::Git(_) => "GIT_ERROR".to_string(),
            MergePilotError::Io(_) => "IO_ERROR".to_string(),
            MergePilotError::Serialization(_) => "SERIALIZATION_ERROR".to_string(),
            MergePilotError::RepositoryNotFound(_) => "REPO_NOT_FOUND".to_string(),
            MergePilotError::InvalidPath(_) => "INVALID_PATH".to_string(),
            MergePilotError::OperationFailed(_) => "OPERATION_FAILED".to_string(),
            MergePilotError::GitCommand(err) => err.code.as_str().to_string(),
            MergePilotError::InvalidPlan(_) => "INVALID_REBASE_PLAN".to_string(),
            MergePilotError::InvalidTransition { .. } => "INVALID_REBASE_STATE".to_string(),
            MergePilotError::NothingToUndo => "NOTHING_TO_UNDO".to_string(),
            MergePilotError::NothingToRedo => "NOTHING_TO_REDO".to_string(),
            MergePilotError::Irreversible(_) => "IRREVERSIBLE_OPERATION".to_string(),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            MergePilotError::GitCommand(err) => err.details.clone(),
            MergePilotError::InvalidPlan(errors) => Some(errors.join("\n")),
            _ => None,
        }
    }
}

/// Serializable error response for IPC
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

impl From<MergePilotError> for ErrorResponse {
    fn from(error: MergePilotError) -> Self {
        ErrorResponse {
            code: error.code(),
            message: error.to_string(),
            details: error.details(),
        }
    }
}

// Errors cross the protocol boundary as `{code, message, details}`
impl serde::Serialize for MergePilotError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let response = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            details: self.details(),
        };
        response.serialize(serializer)
    }
}

/// Result type alias for MergePilot operations
pub type Result<T> = std::result::Result<T, MergePilotError>;
