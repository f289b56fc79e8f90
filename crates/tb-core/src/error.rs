//! # AppError
//!
//! Centralized error handling for the thread engine.
//! Every variant is recovered at the user action that raised it and turned
//! into a message via [`AppError::user_message`].

use thiserror::Error;

/// The primary error type for all engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Service unreachable, timed out, or answered with a non-success status
    #[error("transport error: {0}")]
    Transport(String),

    /// Delete attempted by a non-owner or without an identity
    #[error("unauthorized: {0}")]
    Authorization(String),

    /// Resource not found (e.g., Board slug, Comment id)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Comment creation rejected or failed in transit
    #[error("submission failed: {0}")]
    Submission(String),

    /// Form-level validation failure (e.g., empty title)
    #[error("validation error: {0}")]
    Validation(String),

    /// A result arrived for a board view that has since been torn down
    #[error("stale result for generation {0} discarded")]
    Stale(u64),
}

impl AppError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// Text shown to the user when the action that raised this error fails.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Loading failed. Please try again.".to_string(),
            Self::Authorization(_) => {
                "You are not allowed to delete this comment.".to_string()
            }
            Self::NotFound(kind, _) => format!("{kind} no longer exists."),
            Self::Submission(_) => "An error occurred. Please try again.".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Stale(_) => String::new(),
        }
    }
}

/// A specialized Result type for thread engine logic.
pub type Result<T> = std::result::Result<T, AppError>;
