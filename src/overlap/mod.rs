pub mod types;

pub use types::{OverlapEntry, OverlapMapping};

use thiserror::Error;
use tracing::{debug, info};

use crate::provider::{ProviderError, ProviderGateway};
use crate::repo::RepoSlug;

#[derive(Debug, Error)]
pub enum OverlapError {
    #[error("At least one --file is required")]
    NoTargetFiles,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Normalize `--file` values: split on commas, trim, drop blanks and
/// repeated paths while keeping first-seen order.
pub fn parse_targets<S: AsRef<str>>(raw: &[S]) -> Result<Vec<String>, OverlapError> {
    let mut targets: Vec<String> = Vec::new();
    for value in raw {
        for path in value.as_ref().split(',').map(str::trim) {
            if !path.is_empty() && !targets.iter().any(|t| t == path) {
                targets.push(path.to_string());
            }
        }
    }

    if targets.is_empty() {
        return Err(OverlapError::NoTargetFiles);
    }
    Ok(targets)
}

/// List up to `limit` open pull requests and match each one's changed
/// files against `targets`.
///
/// Pull requests are processed one at a time in provider order. The first
/// error aborts the run and no mapping is returned.
pub async fn find_overlaps(
    gateway: &dyn ProviderGateway,
    slug: &RepoSlug,
    targets: &[String],
    limit: usize,
) -> Result<(OverlapMapping, usize), OverlapError> {
    if targets.is_empty() {
        return Err(OverlapError::NoTargetFiles);
    }

    info!(gateway = %gateway.name(), slug = %slug, limit, "listing open pull requests");
    let prs = gateway.list_open_pull_requests(slug, limit).await?;
    info!(count = prs.len(), "fetched open pull requests");

    let mut mapping = OverlapMapping::new();
    for pr in &prs {
        let changed = gateway.changed_files(slug, pr).await?;
        debug!(pr = pr.id, branch = %pr.branch, files = changed.len(), "checking pull request");
        mapping.accumulate(pr, &changed, targets);
    }

    Ok((mapping, prs.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::api::ApiGateway;
    use crate::provider::cli::{CliGateway, ScriptedRunner};
    use crate::provider::{fixtures, ChangedFiles, PrSummary, Provider};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Gateway serving fixed data; optionally fails on one PR's files.
    struct StaticGateway {
        prs: Vec<(PrSummary, Vec<&'static str>)>,
        fail_files_for: Option<u64>,
        file_calls: AtomicUsize,
    }

    impl StaticGateway {
        fn fixture() -> Self {
            Self {
                prs: vec![
                    (
                        PrSummary::new(2, fixtures::PR2_BRANCH),
                        vec!["README.md", fixtures::AI_FILE],
                    ),
                    (PrSummary::new(1, fixtures::PR1_BRANCH), vec!["README.md"]),
                ],
                fail_files_for: None,
                file_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProviderGateway for StaticGateway {
        fn name(&self) -> String {
            "static".to_string()
        }

        async fn list_open_pull_requests(
            &self,
            _slug: &RepoSlug,
            limit: usize,
        ) -> Result<Vec<PrSummary>, ProviderError> {
            Ok(self.prs.iter().take(limit).map(|(pr, _)| pr.clone()).collect())
        }

        async fn changed_files(
            &self,
            _slug: &RepoSlug,
            pr: &PrSummary,
        ) -> Result<ChangedFiles, ProviderError> {
            self.file_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_files_for == Some(pr.id) {
                return Err(ProviderError::Status {
                    provider: Provider::GitHub,
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(self
                .prs
                .iter()
                .find(|(p, _)| p.id == pr.id)
                .map(|(_, files)| files.iter().map(|f| f.to_string()).collect())
                .unwrap_or_default())
        }
    }

    fn targets() -> Vec<String> {
        parse_targets(&[format!("README.md,{}", fixtures::AI_FILE)]).unwrap()
    }

    fn slug() -> RepoSlug {
        RepoSlug::new("owner/repo")
    }

    fn entry(branch: &str, pr_id: u64) -> OverlapEntry {
        OverlapEntry {
            branch: branch.to_string(),
            pr_id,
        }
    }

    fn assert_fixture_mapping(mapping: &OverlapMapping) {
        assert_eq!(mapping.len(), 2);
        assert_eq!(
            mapping.get("README.md"),
            Some(&vec![
                entry(fixtures::PR2_BRANCH, 2),
                entry(fixtures::PR1_BRANCH, 1)
            ])
        );
        assert_eq!(
            mapping.get(fixtures::AI_FILE),
            Some(&vec![entry(fixtures::PR2_BRANCH, 2)])
        );
    }

    #[test]
    fn test_parse_targets_splits_and_trims() {
        let targets = parse_targets(&["a.rs, b.rs", " c.rs ", "a.rs", ","]).unwrap();
        assert_eq!(targets, vec!["a.rs", "b.rs", "c.rs"]);
    }

    #[test]
    fn test_parse_targets_requires_one() {
        assert!(matches!(
            parse_targets(&[" ", ","]),
            Err(OverlapError::NoTargetFiles)
        ));
        let empty: [&str; 0] = [];
        assert!(matches!(parse_targets(&empty), Err(OverlapError::NoTargetFiles)));
    }

    #[tokio::test]
    async fn test_pipeline_follows_provider_order() {
        let gateway = StaticGateway::fixture();
        let (mapping, checked) = find_overlaps(&gateway, &slug(), &targets(), 200)
            .await
            .unwrap();
        assert_eq!(checked, 2);
        assert_fixture_mapping(&mapping);
    }

    #[tokio::test]
    async fn test_pipeline_respects_limit() {
        let gateway = StaticGateway::fixture();
        let (mapping, checked) = find_overlaps(&gateway, &slug(), &targets(), 1)
            .await
            .unwrap();
        assert_eq!(checked, 1);
        assert_eq!(gateway.file_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            mapping.get("README.md"),
            Some(&vec![entry(fixtures::PR2_BRANCH, 2)])
        );
    }

    #[tokio::test]
    async fn test_pipeline_aborts_on_first_failure() {
        let mut gateway = StaticGateway::fixture();
        gateway.fail_files_for = Some(2);
        let result = find_overlaps(&gateway, &slug(), &targets(), 200).await;
        assert!(matches!(
            result,
            Err(OverlapError::Provider(ProviderError::Status { status: 500, .. }))
        ));
        assert_eq!(gateway.file_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_overlaps_is_success() {
        let gateway = StaticGateway::fixture();
        let (mapping, _) = find_overlaps(&gateway, &slug(), &["LICENSE".to_string()], 200)
            .await
            .unwrap();
        assert!(mapping.is_empty());
    }

    #[tokio::test]
    async fn test_api_and_cli_produce_identical_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/repo/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::github_pulls_json()))
            .mount(&server)
            .await;
        for pr in [1u64, 2] {
            Mock::given(method("GET"))
                .and(path(format!("/repos/owner/repo/pulls/{}/files", pr)))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(fixtures::github_files_json(pr)),
                )
                .expect(1)
                .mount(&server)
                .await;
        }

        let api = ApiGateway::new(Provider::GitHub, server.uri(), Some("secret".into())).unwrap();
        let cli = CliGateway::new(Provider::GitHub, Box::new(fixtures::gh_runner()));

        let (from_api, _) = find_overlaps(&api, &slug(), &targets(), 200).await.unwrap();
        let (from_cli, _) = find_overlaps(&cli, &slug(), &targets(), 200).await.unwrap();

        assert_fixture_mapping(&from_api);
        assert_eq!(from_api, from_cli);
    }

    #[tokio::test]
    async fn test_cli_failure_returns_no_mapping() {
        let runner = ScriptedRunner::new().on("gh pr list", 1, "", "gh: not logged in");
        let cli = CliGateway::new(Provider::GitHub, Box::new(runner));
        let result = find_overlaps(&cli, &slug(), &targets(), 200).await;
        assert!(matches!(
            result,
            Err(OverlapError::Provider(ProviderError::CommandFailed { .. }))
        ));
    }
}
