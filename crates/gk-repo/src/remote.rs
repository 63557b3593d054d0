//! Named remotes attached to a working tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RepoError, RepoResult};
use crate::parse::{self, RemoteDescriptor, RemoteDirection, RemoteRef};
use crate::runner::{CommandRunner, GitCommand};

/// Hosting domain used to find the owning account in a remote URL.
pub const DEFAULT_HOST_DOMAIN: &str = "github.com";

/// Which side of a remote/local comparison to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitDelta {
    /// Commits on the remote branch that local HEAD does not have yet.
    RemoteAhead,
    /// Local commits not pushed to the remote branch yet.
    LocalAhead,
}

/// A named remote endpoint: `origin -> https://github.com/alice/repo.git`.
///
/// The URL is fixed at construction. The owning user is taken from the URL
/// when not given explicitly and stays `None` if the URL is not on the
/// hosting domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLink {
    name: String,
    url: String,
    user: Option<String>,
    direction: Option<RemoteDirection>,
    repository: Option<PathBuf>,
}

impl RemoteLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> RepoResult<Self> {
        Self::with_domain(name, url, DEFAULT_HOST_DOMAIN)
    }

    /// Like [`RemoteLink::new`] but derives the owner for another hosting domain.
    pub fn with_domain(
        name: impl Into<String>,
        url: impl Into<String>,
        domain: &str,
    ) -> RepoResult<Self> {
        let url = url.into();
        let user = parse::owner_from_url(&url, domain)?;
        Ok(Self {
            name: name.into(),
            url,
            user,
            direction: None,
            repository: None,
        })
    }

    /// Build from one parsed `git remote -v` line.
    pub fn from_descriptor(descriptor: RemoteDescriptor) -> RepoResult<Self> {
        let mut link = Self::new(descriptor.name, descriptor.url)?;
        link.direction = descriptor.direction;
        Ok(link)
    }

    /// Override the owning user derived from the URL.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_direction(mut self, direction: RemoteDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Attach to the working tree at `root`.
    pub fn attached_to(mut self, root: impl Into<PathBuf>) -> Self {
        self.repository = Some(root.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn direction(&self) -> Option<RemoteDirection> {
        self.direction
    }

    pub fn repository(&self) -> Option<&Path> {
        self.repository.as_deref()
    }

    fn runner(&self) -> RepoResult<CommandRunner> {
        self.repository
            .as_ref()
            .map(|root| CommandRunner::new(root, false))
            .ok_or_else(|| RepoError::DetachedRemote(self.name.clone()))
    }

    /// Fetch this remote, then count the commits between `branch` on the
    /// remote and local HEAD in the requested direction.
    pub fn commit_count(&self, branch: &str, delta: CommitDelta) -> RepoResult<usize> {
        let runner = self.runner()?;
        runner.execute(&GitCommand::new(["fetch", self.name.as_str()]))?;

        let remote_ref = format!("{}/{}", self.name, branch);
        let range = match delta {
            CommitDelta::RemoteAhead => format!("HEAD..{}", remote_ref),
            CommitDelta::LocalAhead => format!("{}..HEAD", remote_ref),
        };
        let output = runner.execute(&GitCommand::new(["rev-list", "--count"]).arg(range.as_str()))?;

        let count = parse::commit_count(&output.stdout).ok_or_else(|| RepoError::CommitCount {
            reference: range.clone(),
            output: if output.stderr.is_empty() {
                output.stdout.clone()
            } else {
                output.stderr.clone()
            },
        })?;
        debug!(remote = %self.name, range = %range, count, "counted commits");
        Ok(count)
    }

    /// List the remote's branches and/or tags keyed by short name.
    pub fn ls_remote(&self, heads: bool, tags: bool) -> RepoResult<BTreeMap<String, RemoteRef>> {
        let runner = self.runner()?;
        let mut command = GitCommand::new(["ls-remote"]);
        if heads {
            command = command.arg("--heads");
        }
        if tags {
            command = command.arg("--tags");
        }
        let output = runner.execute(&command.arg(self.name.as_str()))?;

        if output.stdout.is_empty() && !output.stderr.is_empty() {
            return Err(RepoError::LsRemote(output.stderr));
        }
        parse::ls_remote(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_derived_from_url() {
        let link = RemoteLink::new("origin", "https://github.com/alice/skill.git").unwrap();
        assert_eq!(link.user(), Some("alice"));
        assert_eq!(link.name(), "origin");
        assert!(link.repository().is_none());
    }

    #[test]
    fn test_owner_unknown_off_domain() {
        let link = RemoteLink::new("mirror", "/srv/git/skill.git").unwrap();
        assert_eq!(link.user(), None);

        let link =
            RemoteLink::with_domain("origin", "https://git.example.org/bob/skill.git", "git.example.org")
                .unwrap();
        assert_eq!(link.user(), Some("bob"));
    }

    #[test]
    fn test_explicit_user_wins() {
        let link = RemoteLink::new("origin", "https://github.com/alice/skill.git")
            .unwrap()
            .with_user("carol");
        assert_eq!(link.user(), Some("carol"));
    }

    #[test]
    fn test_from_descriptor_keeps_direction() {
        let descriptor =
            parse::remote_descriptor("upstream\thttps://github.com/org/skill.git (fetch)").unwrap();
        let link = RemoteLink::from_descriptor(descriptor).unwrap();
        assert_eq!(link.direction(), Some(RemoteDirection::Fetch));
        assert_eq!(link.user(), Some("org"));
    }

    #[test]
    fn test_detached_remote_cannot_count() {
        let link = RemoteLink::new("origin", "https://github.com/alice/skill.git").unwrap();
        assert!(matches!(
            link.commit_count("master", CommitDelta::LocalAhead),
            Err(RepoError::DetachedRemote(name)) if name == "origin"
        ));
    }
}
