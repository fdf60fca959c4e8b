/// Canonical repository identifier used in provider API paths.
///
/// Normally `owner/repo`. A remote with a single path segment resolves to
/// that segment alone; providers will usually reject it, which is reported
/// as a transport error rather than at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug(String);

impl RepoSlug {
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Slug with `/` percent-encoded, as GitLab expects for project ids.
    pub fn url_encoded(&self) -> String {
        self.0.replace('/', "%2F")
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
