//! Translation of git's textual output into typed values.
//!
//! All substring checks and line splitting on git output live here so the
//! rest of the crate works with structured data only.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{RepoError, RepoResult};

const CLEAN_MARKER: &str = "working tree clean";
const UP_TO_DATE_MARKER: &str = "Your branch is up to date with";
const NOTHING_TO_COMMIT_MARKER: &str = "nothing to commit";
const REMOTE_EXISTS_MARKER: &str = "already exists";

/// `git status` reports no pending modification.
pub fn is_clean(status: &str) -> bool {
    status.contains(CLEAN_MARKER)
}

/// `git status` states the branch matches its remote counterpart.
pub fn is_up_to_date(status: &str) -> bool {
    status.contains(UP_TO_DATE_MARKER)
}

pub fn reports_nothing_to_commit(output: &str) -> bool {
    output.contains(NOTHING_TO_COMMIT_MARKER)
}

pub fn reports_remote_exists(stderr: &str) -> bool {
    stderr.contains(REMOTE_EXISTS_MARKER)
}

/// Extract the tracked upstream (e.g. `origin/master`) from `git status`.
pub fn upstream(status: &str) -> RepoResult<Option<String>> {
    let re = Regex::new(r"Your branch is .* '(.+?)'")?;
    Ok(re.captures(status).map(|c| c[1].to_string()))
}

/// Parse the output of `git rev-list --count`.
pub fn commit_count(output: &str) -> Option<usize> {
    output.trim().parse().ok()
}

/// Non-empty lines of a listing (`git tag`, `git stash list`, ...).
pub fn lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Branch names from `git branch`, without the current-branch marker.
pub fn branch_names(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim_start_matches(|c: char| c == '*' || c == ' ').trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Map of changed path to its short status code from `git status --porcelain`.
///
/// Lines with fewer than two whitespace-separated tokens are skipped. For
/// renames (`R  old -> new`) the new path is used.
pub fn porcelain_changes(output: &str) -> BTreeMap<String, String> {
    let mut changes = BTreeMap::new();
    for line in output.lines() {
        let line = line.trim();
        let Some((code, path)) = line.split_once(char::is_whitespace) else {
            continue;
        };
        let path = path.trim();
        if path.is_empty() {
            continue;
        }
        let path = path.rsplit_once(" -> ").map_or(path, |(_, new)| new);
        changes.insert(path.to_string(), code.to_string());
    }
    changes
}

/// Direction column of `git remote -v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteDirection {
    Fetch,
    Push,
}

impl RemoteDirection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "fetch" => Some(Self::Fetch),
            "push" => Some(Self::Push),
            _ => None,
        }
    }
}

/// One line of `git remote -v`: `<name>\t<url> (<direction>)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    pub name: String,
    pub url: String,
    pub direction: Option<RemoteDirection>,
}

pub fn remote_descriptor(line: &str) -> Option<RemoteDescriptor> {
    let (name, rest) = line.trim().split_once('\t')?;
    let rest = rest.trim();
    let (url, direction) = match rest.rsplit_once(' ') {
        Some((url, tag)) if tag.starts_with('(') && tag.ends_with(')') => {
            (url.trim(), RemoteDirection::parse(&tag[1..tag.len() - 1]))
        }
        _ => (rest, None),
    };
    if name.is_empty() || url.is_empty() {
        return None;
    }
    Some(RemoteDescriptor {
        name: name.to_string(),
        url: url.to_string(),
        direction,
    })
}

pub fn remote_descriptors(output: &str) -> Vec<RemoteDescriptor> {
    output.lines().filter_map(remote_descriptor).collect()
}

/// Owning account of a repository URL hosted on `domain`: the path segment
/// right after the domain.
pub fn owner_from_url(url: &str, domain: &str) -> RepoResult<Option<String>> {
    let re = Regex::new(&format!(r"{}[/:](.+?)/", regex::escape(domain)))?;
    Ok(re.captures(url).map(|c| c[1].to_string()))
}

/// `(owner, repository)` of a hosted repository URL, `.git` suffix removed.
pub fn repository_slug(url: &str) -> Option<(String, String)> {
    let path = match url::Url::parse(url) {
        Ok(parsed) if parsed.has_host() => parsed.path().to_string(),
        _ => url.rsplit_once(':').map_or(url, |(_, p)| p).to_string(),
    };
    let mut segments = path.trim_end_matches('/').rsplit('/').filter(|s| !s.is_empty());
    let repo = segments.next()?;
    let owner = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// `user@host:path`, the scp-like syntax git accepts for SSH remotes.
pub fn is_scp_style(url: &str) -> bool {
    match url.split_once(':') {
        Some((authority, path)) => {
            !path.is_empty()
                && !authority.contains('/')
                && authority
                    .split_once('@')
                    .is_some_and(|(user, host)| !user.is_empty() && !host.is_empty())
        }
        None => false,
    }
}

/// Convert SSH remote URLs to their HTTPS form; other URLs are returned unchanged.
pub fn ssh_to_https(url: &str) -> RepoResult<String> {
    if let Some(captures) = Regex::new(r"^[^@/:]+@([^:/]+):(.+)$")?.captures(url) {
        return Ok(format!("https://{}/{}", &captures[1], &captures[2]));
    }
    if let Some(captures) = Regex::new(r"^ssh://(?:[^@/]+@)?([^/:]+)(?::\d+)?/(.+)$")?.captures(url) {
        return Ok(format!("https://{}/{}", &captures[1], &captures[2]));
    }
    Ok(url.to_string())
}

/// Kind of reference reported by `git ls-remote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Head,
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Full reference, e.g. `refs/heads/master`.
    pub reference: String,
    pub kind: RefKind,
    pub commit: String,
}

/// Parse `git ls-remote` output keyed by short branch or tag name.
pub fn ls_remote(output: &str) -> RepoResult<BTreeMap<String, RemoteRef>> {
    let mut refs = BTreeMap::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (commit, reference) = line
            .split_once('\t')
            .ok_or_else(|| RepoError::LsRemote(format!("unexpected line: {}", line)))?;
        let (kind, short) = if let Some(tag) = reference.strip_prefix("refs/tags/") {
            (RefKind::Tag, tag)
        } else if let Some(head) = reference.strip_prefix("refs/heads/") {
            (RefKind::Head, head)
        } else {
            (RefKind::Head, reference)
        };
        refs.insert(
            short.to_string(),
            RemoteRef {
                reference: reference.to_string(),
                kind,
                commit: commit.to_string(),
            },
        );
    }
    Ok(refs)
}
