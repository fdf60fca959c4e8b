use std::collections::HashSet;

use serde::Deserialize;

/// Full changed-file list of one pull request.
pub type ChangedFiles = HashSet<String>;

/// An open pull request as returned by the provider listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrSummary {
    /// Provider-assigned number (GitHub `number`, GitLab `iid`)
    pub id: u64,
    /// Source branch name
    pub branch: String,
}

impl PrSummary {
    pub fn new(id: u64, branch: impl Into<String>) -> Self {
        Self {
            id,
            branch: branch.into(),
        }
    }
}

/// Git hosting service a repository lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    GitHub,
    GitLab,
}

impl Provider {
    /// Guess the provider from a remote URL's host name.
    pub fn detect(url: &str) -> Option<Provider> {
        let host = crate::repo::host_of(url)?.to_ascii_lowercase();
        if host.contains("github") {
            Some(Provider::GitHub)
        } else if host.contains("gitlab") {
            Some(Provider::GitLab)
        } else {
            None
        }
    }

    /// Name of the authenticated command-line helper.
    pub fn cli_program(self) -> &'static str {
        match self {
            Provider::GitHub => "gh",
            Provider::GitLab => "glab",
        }
    }

    /// Environment variable holding the API access token.
    pub fn token_env(self) -> &'static str {
        match self {
            Provider::GitHub => "GITHUB_TOKEN",
            Provider::GitLab => "GITLAB_TOKEN",
        }
    }

    pub fn default_api_base(self) -> &'static str {
        match self {
            Provider::GitHub => "https://api.github.com",
            Provider::GitLab => "https://gitlab.com/api/v4",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::GitHub => write!(f, "GitHub"),
            Provider::GitLab => write!(f, "GitLab"),
        }
    }
}

/// How the provider is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Method {
    /// Authenticated provider CLI (`gh` / `glab`)
    Cli,
    /// REST API with an access token
    Api,
}
