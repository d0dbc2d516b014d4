//! Error types
//!
//! Collaborator failures are transient: the wizard records them as status
//! text and stays in a retryable state. Nothing here is fatal to the host.

use std::time::Duration;
use thiserror::Error;

/// Failure reported by an external collaborator (discovery, permissions,
/// clipboard, auth provider, persistence).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("authorization exchange rejected: {0}")]
    Rejected(String),

    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    /// Short, user-facing description shown as step status text.
    pub fn status_text(&self) -> String {
        match self {
            Self::Timeout(_) => "Timed out, try again".to_string(),
            Self::Unavailable(msg) => format!("Unavailable: {}", msg),
            Self::Rejected(msg) => format!("Code rejected: {}", msg),
            Self::Network(msg) => format!("Network error: {}", msg),
            Self::Io(e) => format!("I/O error: {}", e),
        }
    }
}

/// Errors from wizard operations that are not recoverable by retrying.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("unknown wizard page id: {0}")]
    UnknownPage(u8),

    #[error("unknown connection mode: {0}")]
    UnknownMode(String),

    #[error("invalid authorization code pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("failed to persist onboarding state: {0}")]
    Persistence(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CollaboratorError>;
