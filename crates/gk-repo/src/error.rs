use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Path \"{}\" does not exist", .0.display())]
    PathNotFound(PathBuf),

    #[error("Directory \"{}\" is not a git repository", .0.display())]
    NotGitRepository(PathBuf),

    #[error("Directory \"{}\" is already a git repository", .0.display())]
    AlreadyGitRepository(PathBuf),

    #[error("The provided url \"{0}\" is not valid")]
    InvalidUrl(String),

    #[error("The repository is dirty. Either use the force option or stash your changes before trying again")]
    DirtyRepository,

    #[error("Remote \"{0}\" already exists")]
    RemoteAlreadyExists(String),

    #[error("Checkout target cannot be empty")]
    EmptyCheckoutTarget,

    #[error("Missing upstream: either a remote and a branch or a full upstream reference is required")]
    MissingUpstream,

    #[error("Could not count commits for {reference}: {output}")]
    CommitCount { reference: String, output: String },

    #[error("Could not list references of remote: {0}")]
    LsRemote(String),

    #[error("Remote \"{0}\" is not attached to a local repository")]
    DetachedRemote(String),

    #[error("Command execution failed: {command} (exit code: {exit_code})")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Could not spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
