use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{RepoError, RepoResult};
use crate::parse;
use crate::remote::RemoteLink;
use crate::runner::{CommandOutput, CommandRunner, GitCommand};
use crate::status::RepositoryStatus;

/// Message used by [`LocalRepository::commit`] when none is given.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Automated commit";

/// Entries every initialized `.git` directory contains.
const GIT_DIR_MARKERS: [&str; 7] = ["hooks", "info", "objects", "refs", "config", "description", "HEAD"];

/// Options for [`LocalRepository::open`].
#[derive(Debug, Clone)]
pub struct RepoOptions {
    /// Create the directory if it does not exist (default: false)
    pub make_dir: bool,
    /// Run `git init` when the directory is not a repository yet (default: false)
    pub init: bool,
    /// Origin URL to remember for the repository (default: none)
    pub url: Option<String>,
    /// With `init`, fail when the directory already is a repository (default: false)
    pub raise_if_existing: bool,
    /// Pass `--quiet` to commands that accept it (default: true)
    pub quiet: bool,
}

impl RepoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn make_dir(mut self, make_dir: bool) -> Self {
        self.make_dir = make_dir;
        self
    }

    pub fn init(mut self, init: bool) -> Self {
        self.init = init;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn raise_if_existing(mut self, raise: bool) -> Self {
        self.raise_if_existing = raise;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

impl Default for RepoOptions {
    fn default() -> Self {
        Self {
            make_dir: false,
            init: false,
            url: None,
            raise_if_existing: false,
            quiet: true,
        }
    }
}

/// Options for [`LocalRepository::clone`].
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Branch to check out after cloning (default: "master")
    pub branch: String,
    /// Create the target directory if missing (default: false)
    pub make_dir: bool,
    /// Destroy an existing repository at the target first (default: false)
    pub force: bool,
    /// Pass `--quiet` to commands that accept it (default: true)
    pub quiet: bool,
}

impl CloneOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn make_dir(mut self, make_dir: bool) -> Self {
        self.make_dir = make_dir;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            branch: "master".to_string(),
            make_dir: false,
            force: false,
            quiet: true,
        }
    }
}

/// Options for [`LocalRepository::push`].
#[derive(Debug, Clone)]
pub struct PushOptions {
    /// Value for `--repo`; omitted when `None`
    pub repository: Option<String>,
    /// Remote to set as upstream (default: "origin")
    pub upstream: String,
    /// Branch to push (default: "master")
    pub branch: String,
}

impl PushOptions {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..Self::default()
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.upstream = upstream.into();
        self
    }
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            repository: None,
            upstream: "origin".to_string(),
            branch: "master".to_string(),
        }
    }
}

/// Which untracked content `git clean` removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    pub untracked_files: bool,
    pub untracked_directories: bool,
    pub ignored: bool,
}

impl CleanOptions {
    fn flags(&self) -> Option<String> {
        let mut flags = String::new();
        if self.untracked_files {
            flags.push('f');
        }
        if self.untracked_directories {
            flags.push('d');
        }
        if self.ignored {
            flags.push('x');
        }
        (!flags.is_empty()).then(|| format!("-{}", flags))
    }
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            untracked_files: true,
            untracked_directories: true,
            ignored: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutTarget {
    Branch(String),
    /// Checked out onto a branch named `Branch_<tag>`, created or reset.
    Tag(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StashSelector {
    Index(usize),
    All,
}

/// Upstream for [`LocalRepository::set_upstream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream<'a> {
    Remote { remote: &'a str, branch: &'a str },
    Reference(&'a str),
}

/// A git working tree on disk.
#[derive(Debug)]
pub struct LocalRepository {
    root: PathBuf,
    url: Option<String>,
    runner: CommandRunner,
}

impl LocalRepository {
    /// Wrap (or with `init`, bootstrap) the working tree at `directory`.
    pub fn open<P: AsRef<Path>>(directory: P, options: RepoOptions) -> RepoResult<Self> {
        let directory = directory.as_ref();

        if !directory.exists() && !options.make_dir {
            return Err(RepoError::PathNotFound(directory.to_path_buf()));
        }
        if directory.exists() && !directory.join(".git").exists() && !options.init {
            return Err(RepoError::NotGitRepository(directory.to_path_buf()));
        }

        fs::create_dir_all(directory)?;
        let root = directory.canonicalize()?;
        let repository = Self {
            runner: CommandRunner::new(&root, options.quiet),
            root,
            url: options.url,
        };

        let is_repository = Self::is_repository(&repository.root);
        if options.init {
            if !is_repository {
                repository.runner.execute_checked(&GitCommand::new(["init"]))?;
                info!(path = %repository.root.display(), "initialized repository");
            } else if options.raise_if_existing {
                return Err(RepoError::AlreadyGitRepository(repository.root));
            }
        } else if !is_repository {
            return Err(RepoError::NotGitRepository(repository.root));
        }

        Ok(repository)
    }

    /// Create `directory` if needed and initialize a repository in it.
    pub fn init<P: AsRef<Path>>(directory: P) -> RepoResult<Self> {
        Self::open(directory, RepoOptions::new().make_dir(true).init(true))
    }

    /// Clone `url` into `directory` after checking that the URL is reachable.
    pub fn clone<P: AsRef<Path>>(url: &str, directory: P, options: CloneOptions) -> RepoResult<Self> {
        let directory = directory.as_ref();
        probe_url(url)?;

        if !directory.exists() && !options.make_dir {
            return Err(RepoError::PathNotFound(directory.to_path_buf()));
        }

        if Self::is_repository(directory) {
            if !options.force {
                return Err(RepoError::AlreadyGitRepository(directory.to_path_buf()));
            }
            warn!(path = %directory.display(), "destroying existing repository before clone");
            remove_tree(directory)?;
        }

        fs::create_dir_all(directory)?;
        let command = GitCommand::new(["clone", url])
            .arg(directory.display().to_string())
            .arg("--branch")
            .arg(options.branch.as_str())
            .arg("--recurse-submodules")
            .outside_repo();
        CommandRunner::new(directory, options.quiet).execute_checked(&command)?;
        info!(path = %directory.display(), branch = %options.branch, "cloned repository");

        Self::open(directory, RepoOptions::new().url(url).quiet(options.quiet))
    }

    /// True when `directory/.git` holds every expected entry.
    pub fn is_repository<P: AsRef<Path>>(directory: P) -> bool {
        let git_dir = directory.as_ref().join(".git");
        git_dir.exists() && GIT_DIR_MARKERS.iter().all(|item| git_dir.join(item).exists())
    }

    /// Absolute path of the working tree.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Origin URL given at construction, clone or the last successful `remote_add`.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Whether `--quiet` is passed to commands that accept it.
    pub fn quiet(&self) -> bool {
        self.runner.quiet()
    }

    /// Toggle `--quiet` for subsequent commands.
    pub fn set_quiet(&mut self, quiet: bool) {
        self.runner.set_quiet(quiet);
    }

    /// Path of `file` inside the working tree.
    pub fn file<P: AsRef<Path>>(&self, file: P) -> PathBuf {
        self.root.join(file)
    }

    /// Run an arbitrary git command in this working tree.
    pub fn execute(&self, command: &GitCommand) -> RepoResult<CommandOutput> {
        self.runner.execute(command)
    }

    /// Local tag names.
    pub fn tags(&self) -> RepoResult<BTreeSet<String>> {
        let output = self.runner.execute(&GitCommand::new(["tag"]))?;
        Ok(parse::lines(&output.stdout).into_iter().collect())
    }

    /// Local branch names, without the current-branch marker.
    pub fn branches(&self) -> RepoResult<BTreeSet<String>> {
        let output = self.runner.execute(&GitCommand::new(["branch"]))?;
        Ok(parse::branch_names(&output.stdout).into_iter().collect())
    }

    /// Every line of `git remote -v`, in order.
    pub fn remote_links(&self) -> RepoResult<Vec<RemoteLink>> {
        let output = self.runner.execute(&GitCommand::new(["remote", "-v"]))?;
        parse::remote_descriptors(&output.stdout)
            .into_iter()
            .map(|d| RemoteLink::from_descriptor(d).map(|link| link.attached_to(&self.root)))
            .collect()
    }

    /// Remotes keyed by owning user, or by remote name when the owner is
    /// unknown. The push line of a remote replaces its fetch line.
    pub fn remotes(&self) -> RepoResult<BTreeMap<String, RemoteLink>> {
        Ok(self
            .remote_links()?
            .into_iter()
            .map(|link| (link.user().unwrap_or(link.name()).to_string(), link))
            .collect())
    }

    /// Fresh status view of this working tree.
    pub fn status(&self) -> RepositoryStatus {
        RepositoryStatus::new(&self.root)
    }

    /// See [`RepositoryStatus::is_dirty`].
    pub fn is_dirty(&self) -> RepoResult<bool> {
        self.status().is_dirty()
    }

    /// See [`RepositoryStatus::is_up_to_date`]; fetches `origin` first.
    pub fn is_up_to_date(&self) -> RepoResult<bool> {
        self.status().is_up_to_date()
    }

    /// Refuse to continue over a dirty tree unless `force`, in which case
    /// local changes are thrown away.
    fn ensure_clean(&self, force: bool) -> RepoResult<()> {
        if self.is_dirty()? {
            if !force {
                return Err(RepoError::DirtyRepository);
            }
            warn!(path = %self.root.display(), "discarding local changes");
            self.revert()?;
        }
        Ok(())
    }

    /// Check out a branch or tag; a dirty tree is refused unless `force` discards it.
    pub fn checkout(&self, target: &CheckoutTarget, force: bool) -> RepoResult<()> {
        let command = match target {
            CheckoutTarget::Branch(branch) if !branch.trim().is_empty() => {
                GitCommand::new(["checkout", branch.as_str()])
            }
            CheckoutTarget::Tag(tag) if !tag.trim().is_empty() => GitCommand::new(["checkout", "-B"])
                .arg(format!("Branch_{}", tag))
                .arg(format!("tags/{}", tag)),
            _ => return Err(RepoError::EmptyCheckoutTarget),
        };

        self.ensure_clean(force)?;
        self.runner
            .execute_checked(&command.arg("--recurse-submodules"))?;
        debug!(path = %self.root.display(), target = ?target, "checked out");
        Ok(())
    }

    /// Hard reset, remove untracked files and directories, check out HEAD.
    pub fn revert(&self) -> RepoResult<()> {
        self.reset(None)?;
        self.clean(CleanOptions::default())?;
        self.runner.execute_checked(&GitCommand::new(["checkout", "HEAD"]))?;
        Ok(())
    }

    /// Pull the current branch, optionally pulling every submodule afterwards.
    pub fn pull(&self, force: bool, submodules: bool) -> RepoResult<()> {
        self.ensure_clean(force)?;
        self.runner.execute_checked(&GitCommand::new(["pull"]))?;
        if submodules {
            self.pull_submodules(force)?;
        }
        Ok(())
    }

    /// Pull inside every submodule; with `force` their local changes are stashed first.
    pub fn pull_submodules(&self, force: bool) -> RepoResult<()> {
        if force {
            self.runner
                .execute_checked(&GitCommand::new(["submodule", "foreach", "git", "stash"]))?;
        }
        self.runner
            .execute_checked(&GitCommand::new(["submodule", "foreach", "git", "pull"]))?;
        Ok(())
    }

    /// Fetch without touching the working tree, optionally in every submodule too.
    pub fn fetch(&self, submodules: bool) -> RepoResult<()> {
        self.runner.execute_checked(&GitCommand::new(["fetch"]))?;
        if submodules {
            self.fetch_submodules()?;
        }
        Ok(())
    }

    /// Fetch inside every submodule.
    pub fn fetch_submodules(&self) -> RepoResult<()> {
        self.runner
            .execute_checked(&GitCommand::new(["submodule", "foreach", "git", "fetch"]))?;
        Ok(())
    }

    /// `git reset --hard`, optionally onto `target`.
    pub fn reset(&self, target: Option<&str>) -> RepoResult<()> {
        let mut command = GitCommand::new(["reset", "--hard"]);
        if let Some(target) = target {
            command = command.arg(target);
        }
        self.runner.execute_checked(&command)?;
        Ok(())
    }

    /// Remove untracked content selected by `options`.
    pub fn clean(&self, options: CleanOptions) -> RepoResult<()> {
        let mut command = GitCommand::new(["clean"]);
        if let Some(flags) = options.flags() {
            command = command.arg(flags);
        }
        self.runner.execute_checked(&command)?;
        Ok(())
    }

    /// Discard unstaged modifications of tracked files.
    pub fn restore(&self) -> RepoResult<()> {
        self.runner
            .execute_checked(&GitCommand::new(["restore", "--", "."]))?;
        Ok(())
    }

    /// Lines of `git stash list`, newest first.
    pub fn list_stash(&self) -> RepoResult<Vec<String>> {
        let output = self.runner.execute(&GitCommand::new(["stash", "list"]))?;
        Ok(parse::lines(&output.stdout))
    }

    /// Stash every change under the working tree. Returns the stash count
    /// minus one, or `None` when there was nothing to stash. Fails with
    /// [`RepoError::CommandFailed`] when git refuses to stash.
    pub fn stash(&self) -> RepoResult<Option<usize>> {
        let before = self.list_stash()?.len();
        self.runner.execute_checked(
            &GitCommand::new(["stash", "push", "--"]).arg(format!("{}/", self.root.display())),
        )?;
        let after = self.list_stash()?.len();

        if after == before {
            debug!(path = %self.root.display(), "nothing to stash");
            return Ok(None);
        }
        Ok(after.checked_sub(1))
    }

    /// Drop one stash entry or all of them; returns the remaining entries.
    pub fn drop_stash(&self, selector: StashSelector) -> RepoResult<Vec<String>> {
        match selector {
            StashSelector::All => {
                self.runner.execute_checked(&GitCommand::new(["stash", "clear"]))?;
                Ok(Vec::new())
            }
            StashSelector::Index(index) => {
                self.runner
                    .execute_checked(&GitCommand::new(["stash", "drop"]).arg(format!("stash@{{{}}}", index)))?;
                self.list_stash()
            }
        }
    }

    /// Stage every change, untracked files included.
    pub fn add(&self) -> RepoResult<CommandOutput> {
        self.runner.execute(&GitCommand::new(["add", "--all"]))
    }

    /// Commit staged changes. Returns `false` when staging fails, when git
    /// refuses the commit, or when there is nothing to commit.
    pub fn commit(&self, message: &str, auto_add: bool) -> RepoResult<bool> {
        let message = if message.trim().is_empty() {
            DEFAULT_COMMIT_MESSAGE
        } else {
            message
        };

        if auto_add {
            let staged = self.add()?;
            if !staged.success() {
                warn!(path = %self.root.display(), stderr = %staged.stderr, "staging failed");
                return Ok(false);
            }
        }

        let output = self.runner.execute(&GitCommand::new(["commit", "-m", message]))?;
        if !output.success() || parse::reports_nothing_to_commit(&output.stdout) {
            debug!(path = %self.root.display(), "nothing committed");
            return Ok(false);
        }
        Ok(true)
    }

    /// `git push [--repo=<repository>] --set-upstream <upstream> <branch>`.
    pub fn push(&self, options: &PushOptions) -> RepoResult<CommandOutput> {
        let mut command = GitCommand::new(["push"]);
        if let Some(repository) = &options.repository {
            command = command.arg(format!("--repo={}", repository));
        }
        let command = command
            .arg("--set-upstream")
            .arg(options.upstream.as_str())
            .arg(options.branch.as_str());
        self.runner.execute(&command)
    }

    /// Set the tracked upstream of the current branch.
    pub fn set_upstream(&self, upstream: Upstream<'_>) -> RepoResult<CommandOutput> {
        let reference = match upstream {
            Upstream::Remote { remote, branch } if !remote.is_empty() && !branch.is_empty() => {
                format!("{}/{}", remote, branch)
            }
            Upstream::Reference(reference) if !reference.is_empty() => reference.to_string(),
            _ => return Err(RepoError::MissingUpstream),
        };
        self.runner
            .execute(&GitCommand::new(["branch", "--set-upstream-to"]).arg(reference))
    }

    /// Set a config value in the repository, or globally with `global`.
    pub fn config(&self, key: &str, value: &str, global: bool) -> RepoResult<()> {
        let scope = if global { "--global" } else { "--local" };
        self.runner
            .execute_checked(&GitCommand::new(["config", scope, key, value]))?;
        Ok(())
    }

    /// Register `url` as remote `name`. Returns `false` on failures other
    /// than the name being taken.
    pub fn remote_add(&mut self, url: &str, name: &str) -> RepoResult<bool> {
        let output = self
            .runner
            .execute(&GitCommand::new(["remote", "add", name, url]))?;
        if parse::reports_remote_exists(&output.stderr) {
            return Err(RepoError::RemoteAlreadyExists(name.to_string()));
        }
        if !output.success() {
            warn!(remote = %name, stderr = %output.stderr, "could not add remote");
            return Ok(false);
        }
        self.url = Some(url.to_string());
        Ok(true)
    }

    /// Remove the working tree from disk, read-only entries included.
    pub fn destroy(self) -> RepoResult<()> {
        remove_tree(&self.root)?;
        info!(path = %self.root.display(), "destroyed repository");
        Ok(())
    }
}

fn probe_url(url: &str) -> RepoResult<()> {
    let reachable = match local_path(url) {
        Some(path) => path.exists(),
        None => {
            let https = parse::ssh_to_https(url)?;
            match ureq::get(&https).call() {
                Ok(response) => response.status() == 200,
                Err(err) => {
                    debug!(error = %err, "url probe failed");
                    false
                }
            }
        }
    };

    if reachable {
        Ok(())
    } else {
        Err(RepoError::InvalidUrl(url.to_string()))
    }
}

/// Filesystem path behind a local clone URL.
fn local_path(url: &str) -> Option<PathBuf> {
    if let Some(path) = url.strip_prefix("file://") {
        return Some(PathBuf::from(path));
    }
    if url.contains("://") || parse::is_scp_style(url) {
        None
    } else {
        Some(PathBuf::from(url))
    }
}

pub(crate) fn remove_tree(path: &Path) -> RepoResult<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            debug!(path = %path.display(), "fixing permissions before removal");
            make_writable(path)?;
            fs::remove_dir_all(path)?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

fn make_writable(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mut permissions = metadata.permissions();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = permissions.mode();
        let wanted = if metadata.is_dir() { mode | 0o700 } else { mode | 0o200 };
        if wanted != mode {
            permissions.set_mode(wanted);
            fs::set_permissions(path, permissions)?;
        }
    }
    #[cfg(not(unix))]
    {
        if permissions.readonly() {
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
        }
    }

    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            make_writable(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_flags() {
        assert_eq!(CleanOptions::default().flags().as_deref(), Some("-fd"));
        let all = CleanOptions {
            untracked_files: true,
            untracked_directories: true,
            ignored: true,
        };
        assert_eq!(all.flags().as_deref(), Some("-fdx"));
        let none = CleanOptions {
            untracked_files: false,
            untracked_directories: false,
            ignored: false,
        };
        assert_eq!(none.flags(), None);
    }

    #[test]
    fn test_local_path_detection() {
        assert_eq!(local_path("/srv/git/a.git"), Some(PathBuf::from("/srv/git/a.git")));
        assert_eq!(local_path("file:///srv/git/a.git"), Some(PathBuf::from("/srv/git/a.git")));
        assert_eq!(local_path("https://github.com/a/b.git"), None);
        assert_eq!(local_path("git@github.com:a/b.git"), None);
        assert_eq!(local_path("deploy@git.internal:org/b.git"), None);
        assert_eq!(local_path("./relative/repo"), Some(PathBuf::from("./relative/repo")));
    }

    #[test]
    fn test_options_defaults() {
        let options = RepoOptions::new();
        assert!(options.quiet);
        assert!(!options.make_dir && !options.init && !options.raise_if_existing);

        let clone = CloneOptions::new().branch("main").force(true);
        assert_eq!(clone.branch, "main");
        assert!(clone.force && clone.quiet && !clone.make_dir);

        let push = PushOptions::new("develop").with_upstream("fork");
        assert_eq!(push.branch, "develop");
        assert_eq!(push.upstream, "fork");
        assert_eq!(push.repository, None);
    }

    #[test]
    fn test_missing_path_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            LocalRepository::open(&missing, RepoOptions::new()),
            Err(RepoError::PathNotFound(p)) if p == missing
        ));
    }

    #[test]
    fn test_plain_directory_is_not_a_repository() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(!LocalRepository::is_repository(dir.path()));
        assert!(matches!(
            LocalRepository::open(dir.path(), RepoOptions::new()),
            Err(RepoError::NotGitRepository(_))
        ));
    }

    #[test]
    fn test_remove_tree_with_read_only_entries() {
        let dir = tempfile::TempDir::new().unwrap();
        let tree = dir.path().join("tree");
        let nested = tree.join("nested");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("locked.txt");
        fs::write(&file, "x").unwrap();

        let mut permissions = fs::metadata(&file).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&file, permissions).unwrap();
        let mut permissions = fs::metadata(&nested).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&nested, permissions).unwrap();

        remove_tree(&tree).unwrap();
        assert!(!tree.exists());
    }
}
