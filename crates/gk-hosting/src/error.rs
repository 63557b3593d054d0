//! Error types for the hosting client

use gk_repo::RepoError;
use thiserror::Error;

/// Errors that can occur when talking to the hosting platform
#[derive(Debug, Error)]
pub enum HostingError {
    #[error("Please provide username, token and repository name")]
    MissingCredentials,

    #[error("User \"{0}\" not found")]
    UserNotFound(String),

    #[error("Repository \"{0}\" not found")]
    RepoNotFound(String),

    #[error("Creating repository \"{name}\" failed with status {status}")]
    CreateFailed { name: String, status: u16 },

    #[error("Rate limited while acting as \"{0}\"")]
    RateLimit(String),

    #[error("Forking repository \"{0}\" failed")]
    ForkFailed(String),

    #[error("Repository \"{0}\" is already forked")]
    AlreadyForked(String),

    #[error("Cannot fork own repository \"{0}\"")]
    CannotForkOwn(String),

    #[error("Not a hosted repository URL: {0}")]
    InvalidRemoteUrl(String),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Result type alias for hosting operations
pub type HostingResult<T> = Result<T, HostingError>;
