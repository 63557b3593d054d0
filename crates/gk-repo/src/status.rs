use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::RepoResult;
use crate::parse;
use crate::runner::{CommandRunner, GitCommand};

const UNPUSHED_BASES: [&str; 3] = ["@{upstream}", "origin/HEAD", "origin/master"];

/// Point-in-time view of a working tree. Nothing is cached: every query
/// runs git again.
#[derive(Debug, Clone)]
pub struct RepositoryStatus {
    runner: CommandRunner,
}

impl RepositoryStatus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            runner: CommandRunner::new(root, false),
        }
    }

    pub fn root(&self) -> &Path {
        self.runner.root()
    }

    /// Raw `git status` text.
    pub fn text(&self) -> RepoResult<String> {
        Ok(self.runner.execute(&GitCommand::new(["status"]))?.stdout)
    }

    /// True when the tree has uncommitted modifications or commits that are
    /// not on the tracked upstream (or, without one, on `origin`'s default
    /// branch). An unreadable commit count counts as dirty.
    pub fn is_dirty(&self) -> RepoResult<bool> {
        if !parse::is_clean(&self.text()?) {
            debug!(path = %self.root().display(), "working tree has local modifications");
            return Ok(true);
        }

        match self.unpushed_commits()? {
            Some(0) => Ok(false),
            Some(ahead) => {
                debug!(path = %self.root().display(), ahead, "branch has unpushed commits");
                Ok(true)
            }
            None => {
                warn!(
                    path = %self.root().display(),
                    "could not count unpushed commits, assuming dirty"
                );
                Ok(true)
            }
        }
    }

    /// Commits on HEAD missing from the first base that resolves: the tracked
    /// upstream, then the default remote's HEAD and master branch.
    fn unpushed_commits(&self) -> RepoResult<Option<usize>> {
        for base in UNPUSHED_BASES {
            let range = format!("{}..HEAD", base);
            let output = self
                .runner
                .execute(&GitCommand::new(["rev-list", "--count"]).arg(range.as_str()))?;
            if let Some(count) = parse::commit_count(&output.stdout) {
                return Ok(Some(count));
            }
            debug!(range = %range, stderr = %output.stderr, "base did not resolve");
        }
        Ok(None)
    }

    /// Fetch the default remote, then report whether the branch is up to
    /// date with its remote counterpart.
    pub fn is_up_to_date(&self) -> RepoResult<bool> {
        self.runner.execute(&GitCommand::new(["fetch", "origin"]))?;
        Ok(parse::is_up_to_date(&self.text()?))
    }

    /// Tracked upstream of the current branch, e.g. `origin/master`.
    pub fn upstream(&self) -> RepoResult<Option<String>> {
        parse::upstream(&self.text()?)
    }

    /// Changed paths mapped to their short status code (`M`, `??`, `A`, ...).
    pub fn changes(&self) -> RepoResult<BTreeMap<String, String>> {
        let output = self.runner.execute(&GitCommand::new(["status", "--porcelain"]))?;
        Ok(parse::porcelain_changes(&output.stdout))
    }
}
