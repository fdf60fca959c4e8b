use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::pagination::{self, PageSource, PAGE_CEILING};
use super::{ChangedFiles, PrSummary, Provider, ProviderError, ProviderGateway};
use crate::repo::RepoSlug;

/// Most files `gh pr list/view --json files` reports for one pull request.
const GH_FILES_CAP: usize = 100;

/// Captured result of one external command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Seam between the CLI gateway and process spawning.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProviderError>;
}

/// Runs commands on the host with `tokio::process`.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProviderError> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| ProviderError::CommandSpawn {
                program: program.to_string(),
                reason: e.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Whether the provider CLI is installed and logged in.
pub async fn is_authenticated(runner: &dyn CommandRunner, provider: Provider) -> bool {
    let program = provider.cli_program();
    match runner
        .run(program, &["auth".to_string(), "status".to_string()])
        .await
    {
        Ok(output) => {
            debug!(program, code = ?output.code, "checked CLI auth status");
            output.success()
        }
        Err(e) => {
            debug!(program, error = %e, "CLI not available");
            false
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhPullRequest {
    number: u64,
    head_ref_name: String,
    #[serde(default)]
    files: Vec<GhFile>,
}

#[derive(Deserialize)]
struct GhFile {
    path: String,
}

#[derive(Deserialize)]
struct GhFilesOnly {
    #[serde(default)]
    files: Vec<GhFile>,
}

#[derive(Deserialize)]
struct GlabMergeRequest {
    iid: u64,
    source_branch: String,
}

#[derive(Deserialize)]
struct GlabChanges {
    changes: Vec<GlabChange>,
}

#[derive(Deserialize)]
struct GlabChange {
    new_path: String,
}

/// Gateway that shells out to the provider's authenticated CLI.
///
/// `gh` returns changed files together with the listing; those are kept
/// here until `changed_files` asks for them. `glab` listings are paged the
/// same way as the REST API.
pub struct CliGateway {
    provider: Provider,
    runner: Box<dyn CommandRunner>,
    prefetched: Mutex<HashMap<u64, ChangedFiles>>,
}

impl CliGateway {
    pub fn new(provider: Provider, runner: Box<dyn CommandRunner>) -> Self {
        Self {
            provider,
            runner,
            prefetched: Mutex::new(HashMap::new()),
        }
    }

    /// Run the provider CLI and return its stdout; non-zero exit is fatal.
    async fn run_checked(&self, args: Vec<String>) -> Result<String, ProviderError> {
        let program = self.provider.cli_program();
        debug!(program, args = ?args, "running provider CLI");
        let output = self.runner.run(program, &args).await?;

        if !output.success() {
            return Err(ProviderError::CommandFailed {
                program: format!("{} {}", program, args.join(" ")),
                code: output
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    async fn run_json<T: DeserializeOwned>(&self, args: Vec<String>) -> Result<T, ProviderError> {
        let stdout = self.run_checked(args).await?;
        serde_json::from_str(&stdout).map_err(|e| ProviderError::Malformed {
            provider: self.provider,
            reason: e.to_string(),
        })
    }

    async fn gh_list(&self, slug: &RepoSlug, limit: usize) -> Result<Vec<PrSummary>, ProviderError> {
        let args = vec![
            "pr".to_string(),
            "list".to_string(),
            "--repo".to_string(),
            slug.to_string(),
            "--state".to_string(),
            "open".to_string(),
            "--search".to_string(),
            "is:unmerged".to_string(),
            "--limit".to_string(),
            limit.to_string(),
            "--json".to_string(),
            "number,headRefName,files".to_string(),
        ];
        let mut pulls: Vec<GhPullRequest> = self.run_json(args).await?;
        pulls.truncate(limit);

        let mut prefetched = self
            .prefetched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(pulls
            .into_iter()
            .map(|pr| {
                let files = pr.files.into_iter().map(|f| f.path).collect();
                prefetched.insert(pr.number, files);
                PrSummary::new(pr.number, pr.head_ref_name)
            })
            .collect())
    }

    async fn gh_files(&self, slug: &RepoSlug, number: u64) -> Result<ChangedFiles, ProviderError> {
        let cached = self
            .prefetched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&number);
        let files = match cached {
            Some(files) => files,
            None => {
                let args = vec![
                    "pr".to_string(),
                    "view".to_string(),
                    number.to_string(),
                    "--repo".to_string(),
                    slug.to_string(),
                    "--json".to_string(),
                    "files".to_string(),
                ];
                let view: GhFilesOnly = self.run_json(args).await?;
                view.files.into_iter().map(|f| f.path).collect()
            }
        };

        if files.len() < GH_FILES_CAP {
            return Ok(files);
        }
        debug!(pr = number, listed = files.len(), "file list may be capped, paging REST files");
        self.gh_all_files(slug, number).await
    }

    /// Complete file list through the REST endpoint, which `gh` pages for us.
    async fn gh_all_files(&self, slug: &RepoSlug, number: u64) -> Result<ChangedFiles, ProviderError> {
        let args = vec![
            "api".to_string(),
            "--paginate".to_string(),
            format!("repos/{}/pulls/{}/files", slug, number),
            "--jq".to_string(),
            ".[].filename".to_string(),
        ];
        let stdout = self.run_checked(args).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn glab_page(
        &self,
        slug: &RepoSlug,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<PrSummary>, ProviderError> {
        let args = vec![
            "mr".to_string(),
            "list".to_string(),
            "--repo".to_string(),
            slug.to_string(),
            "--page".to_string(),
            page.to_string(),
            "--per-page".to_string(),
            per_page.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        let requests: Vec<GlabMergeRequest> = self.run_json(args).await?;
        Ok(requests
            .into_iter()
            .map(|mr| PrSummary::new(mr.iid, mr.source_branch))
            .collect())
    }

    async fn glab_files(&self, slug: &RepoSlug, iid: u64) -> Result<ChangedFiles, ProviderError> {
        let args = vec![
            "api".to_string(),
            format!(
                "projects/{}/merge_requests/{}/changes",
                slug.url_encoded(),
                iid
            ),
        ];
        let changes: GlabChanges = self.run_json(args).await?;
        Ok(changes.changes.into_iter().map(|c| c.new_path).collect())
    }
}

/// `glab mr list` pages, which GitLab caps at 100 merge requests each.
struct GlabPages<'a> {
    gateway: &'a CliGateway,
}

#[async_trait]
impl<'a> PageSource for GlabPages<'a> {
    async fn fetch_page(
        &self,
        slug: &RepoSlug,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<PrSummary>, ProviderError> {
        self.gateway.glab_page(slug, page, per_page).await
    }
}

#[async_trait]
impl ProviderGateway for CliGateway {
    fn name(&self) -> String {
        format!("{} CLI ({})", self.provider, self.provider.cli_program())
    }

    #[instrument(skip(self), fields(provider = %self.provider, slug = %slug))]
    async fn list_open_pull_requests(
        &self,
        slug: &RepoSlug,
        limit: usize,
    ) -> Result<Vec<PrSummary>, ProviderError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        match self.provider {
            Provider::GitHub => self.gh_list(slug, limit).await,
            Provider::GitLab => {
                let pages = GlabPages { gateway: self };
                pagination::fetch_bounded(&pages, slug, limit, PAGE_CEILING).await
            }
        }
    }

    #[instrument(skip(self), fields(provider = %self.provider, slug = %slug, pr = pr.id))]
    async fn changed_files(
        &self,
        slug: &RepoSlug,
        pr: &PrSummary,
    ) -> Result<ChangedFiles, ProviderError> {
        match self.provider {
            Provider::GitHub => self.gh_files(slug, pr.id).await,
            Provider::GitLab => self.glab_files(slug, pr.id).await,
        }
    }
}

/// Runner answering commands from a script, keyed by command-line prefix.
#[cfg(test)]
pub(crate) struct ScriptedRunner {
    rules: Vec<(String, CommandOutput)>,
    calls: std::sync::Arc<Mutex<Vec<String>>>,
}

#[cfg(test)]
impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: std::sync::Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn on(mut self, prefix: &str, code: i32, stdout: &str, stderr: &str) -> Self {
        self.rules.push((
            prefix.to_string(),
            CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        ));
        self
    }

    /// Shared log of every command line run, for assertions after the
    /// runner has been moved into a gateway.
    pub fn calls(&self) -> std::sync::Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, ProviderError> {
        let line = format!("{} {}", program, args.join(" "));
        self.calls.lock().unwrap().push(line.clone());
        self.rules
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .ok_or_else(|| ProviderError::CommandSpawn {
                program: program.to_string(),
                reason: format!("no scripted response for {:?}", line),
            })
    }
}
