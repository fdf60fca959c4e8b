use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::pagination::{self, PageSource, PAGE_CEILING};
use super::{ChangedFiles, PrSummary, Provider, ProviderError, ProviderGateway};
use crate::repo::RepoSlug;

#[derive(Deserialize)]
struct GitHubPull {
    number: u64,
    head: GitHubHead,
}

#[derive(Deserialize)]
struct GitHubHead {
    #[serde(rename = "ref")]
    ref_name: String,
}

#[derive(Deserialize)]
struct GitHubFile {
    filename: String,
}

#[derive(Deserialize)]
struct GitLabMergeRequest {
    iid: u64,
    source_branch: String,
}

#[derive(Deserialize)]
struct GitLabChanges {
    changes: Vec<GitLabChange>,
}

#[derive(Deserialize)]
struct GitLabChange {
    new_path: String,
}

/// Gateway talking to the provider's REST API with an access token.
pub struct ApiGateway {
    client: reqwest::Client,
    provider: Provider,
    api_base: String,
    token: String,
}

impl ApiGateway {
    /// Fails with `MissingToken` when `token` is absent or blank, before
    /// any request is made.
    pub fn new(
        provider: Provider,
        api_base: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, ProviderError> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(ProviderError::MissingToken {
                provider,
                env: provider.token_env(),
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            provider,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let provider = self.provider;
        let request = self
            .client
            .get(url)
            .header("User-Agent", "pr-overlap")
            .query(query);
        let request = match provider {
            Provider::GitHub => request
                .bearer_auth(&self.token)
                .header("Accept", "application/vnd.github+json"),
            Provider::GitLab => request.header("PRIVATE-TOKEN", &self.token),
        };

        debug!(url = %url, "sending API request");
        let response = request
            .send()
            .await
            .map_err(|source| ProviderError::Http { provider, source })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ProviderError::Http { provider, source })?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider,
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Malformed {
            provider,
            reason: e.to_string(),
        })
    }

    async fn github_files(&self, slug: &RepoSlug, number: u64) -> Result<ChangedFiles, ProviderError> {
        let url = format!("{}/repos/{}/pulls/{}/files", self.api_base, slug, number);
        let mut files = ChangedFiles::new();
        let mut page: u32 = 1;

        loop {
            let batch: Vec<GitHubFile> = self
                .get_json(
                    &url,
                    &[
                        ("per_page", PAGE_CEILING.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;
            let received = batch.len();
            files.extend(batch.into_iter().map(|f| f.filename));

            if received < PAGE_CEILING {
                break;
            }
            page += 1;
        }

        Ok(files)
    }

    async fn gitlab_files(&self, slug: &RepoSlug, iid: u64) -> Result<ChangedFiles, ProviderError> {
        let url = format!(
            "{}/projects/{}/merge_requests/{}/changes",
            self.api_base,
            slug.url_encoded(),
            iid
        );
        let changes: GitLabChanges = self.get_json(&url, &[]).await?;
        Ok(changes.changes.into_iter().map(|c| c.new_path).collect())
    }
}

#[async_trait]
impl PageSource for ApiGateway {
    async fn fetch_page(
        &self,
        slug: &RepoSlug,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<PrSummary>, ProviderError> {
        match self.provider {
            Provider::GitHub => {
                let url = format!("{}/repos/{}/pulls", self.api_base, slug);
                let pulls: Vec<GitHubPull> = self
                    .get_json(
                        &url,
                        &[
                            ("state", "open".to_string()),
                            ("per_page", per_page.to_string()),
                            ("page", page.to_string()),
                        ],
                    )
                    .await?;
                Ok(pulls
                    .into_iter()
                    .map(|p| PrSummary::new(p.number, p.head.ref_name))
                    .collect())
            }
            Provider::GitLab => {
                let url = format!(
                    "{}/projects/{}/merge_requests",
                    self.api_base,
                    slug.url_encoded()
                );
                let requests: Vec<GitLabMergeRequest> = self
                    .get_json(
                        &url,
                        &[
                            ("state", "opened".to_string()),
                            ("per_page", per_page.to_string()),
                            ("page", page.to_string()),
                        ],
                    )
                    .await?;
                Ok(requests
                    .into_iter()
                    .map(|mr| PrSummary::new(mr.iid, mr.source_branch))
                    .collect())
            }
        }
    }
}

#[async_trait]
impl ProviderGateway for ApiGateway {
    fn name(&self) -> String {
        format!("{} API", self.provider)
    }

    #[instrument(skip(self), fields(provider = %self.provider, slug = %slug))]
    async fn list_open_pull_requests(
        &self,
        slug: &RepoSlug,
        limit: usize,
    ) -> Result<Vec<PrSummary>, ProviderError> {
        pagination::fetch_bounded(self, slug, limit, PAGE_CEILING).await
    }

    #[instrument(skip(self), fields(provider = %self.provider, slug = %slug, pr = pr.id))]
    async fn changed_files(
        &self,
        slug: &RepoSlug,
        pr: &PrSummary,
    ) -> Result<ChangedFiles, ProviderError> {
        let files = match self.provider {
            Provider::GitHub => self.github_files(slug, pr.id).await?,
            Provider::GitLab => self.gitlab_files(slug, pr.id).await?,
        };
        debug!(files = files.len(), "received changed files");
        Ok(files)
    }
}
