//! Local git working-tree wrapper.
//!
//! [`LocalRepository`] drives the `git` CLI through a [`CommandRunner`];
//! everything git prints is interpreted in [`parse`], so callers only see
//! typed values and [`RepoError`].

pub mod error;
pub mod parse;
pub mod remote;
pub mod repo;
pub mod runner;
pub mod status;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use error::{RepoError, RepoResult};
pub use parse::{RefKind, RemoteDirection, RemoteRef};
pub use remote::{CommitDelta, RemoteLink, DEFAULT_HOST_DOMAIN};
pub use repo::{
    CheckoutTarget, CleanOptions, CloneOptions, LocalRepository, PushOptions, RepoOptions,
    StashSelector, Upstream, DEFAULT_COMMIT_MESSAGE,
};
pub use runner::{CommandOutput, CommandRunner, GitCommand};
pub use status::RepositoryStatus;
