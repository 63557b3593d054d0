//! Git repository fixtures for unit and integration tests.
//!
//! Repositories are created in temporary directories with a local identity
//! and signing disabled, so tests never depend on the user's git config.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;

pub type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Check if git is available on the system.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Install a test-friendly tracing subscriber once per process.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Configuration options for fixture repositories.
#[derive(Debug, Clone)]
pub struct GitRepoConfig {
    /// Git user email (default: "test@example.com")
    pub user_email: String,
    /// Git user name (default: "Test User")
    pub user_name: String,
    /// Initial branch (default: "master")
    pub branch: String,
    /// Initial commit message (default: "Initial commit")
    pub initial_commit_message: String,
}

impl GitRepoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = email.into();
        self
    }

    pub fn user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn initial_commit_message(mut self, message: impl Into<String>) -> Self {
        self.initial_commit_message = message.into();
        self
    }
}

impl Default for GitRepoConfig {
    fn default() -> Self {
        Self {
            user_email: "test@example.com".to_string(),
            user_name: "Test User".to_string(),
            branch: "master".to_string(),
            initial_commit_message: "Initial commit".to_string(),
        }
    }
}

/// A working tree with one commit, tracking a bare `origin`.
pub struct TrackedRepo {
    /// Keeps the working tree alive
    pub local_dir: TempDir,
    /// Keeps the bare remote alive
    pub remote_dir: TempDir,
    pub local_path: PathBuf,
    pub remote_path: PathBuf,
}

/// A working tree with one commit and no remote.
pub struct SimpleRepo {
    pub dir: TempDir,
    pub path: PathBuf,
}

/// Run git in `dir` and return trimmed stdout, failing on a non-zero exit.
pub fn git(dir: &Path, args: &[&str]) -> FixtureResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {}", args.join(" "), stderr.trim()).into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Configure identity and signing for an existing repository.
pub fn configure_identity(repo_path: &Path, config: &GitRepoConfig) -> FixtureResult<()> {
    git(repo_path, &["config", "user.email", &config.user_email])?;
    git(repo_path, &["config", "user.name", &config.user_name])?;
    git(repo_path, &["config", "commit.gpgsign", "false"])?;
    git(repo_path, &["config", "tag.gpgsign", "false"])?;
    Ok(())
}

/// Initialize a repository with an initial commit in `repo_path`.
pub fn initialize_repo(repo_path: &Path, config: &GitRepoConfig) -> FixtureResult<()> {
    git(repo_path, &["init", "-b", &config.branch])?;
    configure_identity(repo_path, config)?;
    std::fs::write(repo_path.join("README.md"), "Initial content\n")?;
    git(repo_path, &["add", "README.md"])?;
    git(repo_path, &["commit", "-m", &config.initial_commit_message])?;
    Ok(())
}

pub fn create_repo(config: Option<GitRepoConfig>) -> FixtureResult<SimpleRepo> {
    let config = config.unwrap_or_default();
    let dir = TempDir::new()?;
    let path = dir.path().canonicalize()?;
    initialize_repo(&path, &config)?;
    Ok(SimpleRepo { dir, path })
}

/// Create a repository pushed to a bare remote with upstream tracking set.
pub fn create_repo_with_remote(config: Option<GitRepoConfig>) -> FixtureResult<TrackedRepo> {
    let config = config.unwrap_or_default();
    let remote_dir = TempDir::new()?;
    let local_dir = TempDir::new()?;
    let remote_path = remote_dir.path().canonicalize()?;
    let local_path = local_dir.path().canonicalize()?;

    git(&remote_path, &["init", "--bare", "-b", &config.branch])?;
    initialize_repo(&local_path, &config)?;
    git(&local_path, &["remote", "add", "origin", &remote_path.to_string_lossy()])?;
    git(&local_path, &["push", "-u", "origin", &config.branch])?;

    Ok(TrackedRepo {
        local_dir,
        remote_dir,
        local_path,
        remote_path,
    })
}

/// A tracked repository whose working tree contains a submodule.
pub struct SubmoduleRepo {
    pub parent: TrackedRepo,
    /// Repository the submodule was cloned from; `child.remote_path` is its remote
    pub child: TrackedRepo,
    /// Submodule checkout inside the parent working tree
    pub submodule_path: PathBuf,
}

/// Create a tracked repository with the bare remote of a second fixture
/// added as submodule `name`, committed and pushed.
pub fn create_repo_with_submodule(name: &str) -> FixtureResult<SubmoduleRepo> {
    let child = create_repo_with_remote(None)?;
    let parent = create_repo_with_remote(None)?;
    let child_url = child.remote_path.to_string_lossy().to_string();

    // Local-path submodules need the file transport allowed explicitly.
    git(
        &parent.local_path,
        &["-c", "protocol.file.allow=always", "submodule", "add", &child_url, name],
    )?;
    let submodule_path = parent.local_path.join(name);
    git(&submodule_path, &["config", "protocol.file.allow", "always"])?;
    configure_identity(&submodule_path, &GitRepoConfig::default())?;

    git(&parent.local_path, &["commit", "-m", "Add submodule"])?;
    git(&parent.local_path, &["push", "origin", &GitRepoConfig::default().branch])?;

    Ok(SubmoduleRepo {
        parent,
        child,
        submodule_path,
    })
}

/// Write `content` to `filename` and commit it.
pub fn commit_file(repo_path: &Path, filename: &str, content: &str, message: &str) -> FixtureResult<String> {
    std::fs::write(repo_path.join(filename), content)?;
    git(repo_path, &["add", filename])?;
    git(repo_path, &["commit", "-m", message])?;
    git(repo_path, &["rev-parse", "HEAD"])
}

/// Push a new commit to the bare remote from a throwaway clone, so the
/// fixture's working tree falls behind.
pub fn advance_remote(remote_path: &Path, branch: &str, filename: &str) -> FixtureResult<()> {
    let scratch = TempDir::new()?;
    let clone_path = scratch.path().join("clone");
    git(
        scratch.path(),
        &["clone", "--branch", branch, &remote_path.to_string_lossy(), "clone"],
    )?;
    configure_identity(&clone_path, &GitRepoConfig::default())?;
    commit_file(&clone_path, filename, "from elsewhere\n", "Remote change")?;
    git(&clone_path, &["push", "origin", branch])?;
    Ok(())
}
