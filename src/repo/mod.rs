pub mod types;

pub use types::RepoSlug;

use std::process::Command;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Failed to run git: {0}")]
    Git(String),

    #[error("No git remote configured; pass --url to choose a repository")]
    NoRemote,

    #[error("Cannot determine repository from remote URL: {0:?}")]
    Unresolvable(String),
}

/// Derive the `owner/repo` slug from a remote URL.
///
/// Accepts `git@host:owner/repo(.git)` and `http(s)://host/owner/repo(.git)`.
/// Nested paths such as `group/subgroup/repo` keep only the last two
/// segments. Returns `None` when no slug can be derived.
pub fn resolve(url: &str) -> Option<RepoSlug> {
    let path = strip_host_prefix(url.trim());
    let path = path.strip_suffix(".git").unwrap_or(path);

    if path.is_empty() || !path.contains('/') {
        return None;
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [] => None,
        [only] => Some(RepoSlug::new(*only)),
        [.., owner, repo] => Some(RepoSlug::new(format!("{}/{}", owner, repo))),
    }
}

/// Like [`resolve`], but reports failure as an error naming the URL.
pub fn resolve_or_err(url: &str) -> Result<RepoSlug, RepoError> {
    resolve(url).ok_or_else(|| RepoError::Unresolvable(url.to_string()))
}

/// Host part of a remote URL, without user info or port.
pub fn host_of(url: &str) -> Option<&str> {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("git@") {
        let (host, _) = rest.split_once(':')?;
        return Some(host).filter(|h| !h.is_empty());
    }

    let (_, rest) = url.split_once("://")?;
    let authority = rest.split('/').next()?;
    let host = authority.rsplit('@').next()?;
    let host = host.split(':').next()?;
    Some(host).filter(|h| !h.is_empty())
}

fn strip_host_prefix(url: &str) -> &str {
    if let Some(rest) = url.strip_prefix("git@") {
        return match rest.split_once(':') {
            Some((_, path)) => path,
            None => url,
        };
    }

    for scheme in ["https://", "http://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return rest.split_once('/').map(|(_, path)| path).unwrap_or("");
        }
    }

    url
}

/// URL of the first remote configured in the current git repository.
pub fn first_remote_url() -> Result<String, RepoError> {
    let remotes = run_git(&["remote"])?;
    let first = remotes
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or(RepoError::NoRemote)?;
    debug!(remote = %first, "using first configured git remote");

    run_git(&["remote", "get-url", first])
}

fn run_git(args: &[&str]) -> Result<String, RepoError> {
    let output = Command::new("git")
        .args(args)
        .output()
        .map_err(|e| RepoError::Git(format!("Failed to execute git: {}", e)))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(RepoError::Git(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )))
    }
}
