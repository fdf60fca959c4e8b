pub mod api;
pub mod cli;
pub mod pagination;
pub mod types;

pub use types::{ChangedFiles, Method, PrSummary, Provider};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::repo::RepoSlug;
use api::ApiGateway;
use cli::{CliGateway, CommandRunner, SystemRunner};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} access token not found; set {env} or use --method cli")]
    MissingToken { provider: Provider, env: &'static str },

    #[error("Unsupported hosting provider for remote {0:?}")]
    UnsupportedProvider(String),

    #[error("{provider} API request failed: {source}")]
    Http {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API returned {status}: {body}")]
    Status {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("Failed to run {program}: {reason}")]
    CommandSpawn { program: String, reason: String },

    #[error("{program} exited with {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: String,
        stderr: String,
    },

    #[error("Malformed {provider} response: {reason}")]
    Malformed { provider: Provider, reason: String },
}

/// Access to the open pull requests of one hosting provider.
///
/// Implementations must not re-sort: callers rely on provider list order.
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Human-readable name of this access method (e.g., "GitHub API")
    fn name(&self) -> String;

    /// Open, unmerged pull requests, at most `limit`, in provider order.
    async fn list_open_pull_requests(
        &self,
        slug: &RepoSlug,
        limit: usize,
    ) -> Result<Vec<PrSummary>, ProviderError>;

    /// Every file changed by `pr`, unfiltered.
    async fn changed_files(
        &self,
        slug: &RepoSlug,
        pr: &PrSummary,
    ) -> Result<ChangedFiles, ProviderError>;
}

/// Build the gateway for `method`, or auto-detect when `method` is `None`.
///
/// Auto-detection prefers the CLI helper when it reports a logged-in
/// session and otherwise falls back to the REST API.
pub async fn select_gateway(
    method: Option<Method>,
    provider: Provider,
    config: &Config,
) -> Result<Box<dyn ProviderGateway>, ProviderError> {
    select_with_runner(method, provider, config, Box::new(SystemRunner)).await
}

async fn select_with_runner(
    method: Option<Method>,
    provider: Provider,
    config: &Config,
    runner: Box<dyn CommandRunner>,
) -> Result<Box<dyn ProviderGateway>, ProviderError> {
    let method = match method {
        Some(method) => method,
        None => {
            if cli::is_authenticated(runner.as_ref(), provider).await {
                Method::Cli
            } else {
                Method::Api
            }
        }
    };
    info!(%provider, ?method, "selected access method");

    match method {
        Method::Cli => Ok(Box::new(CliGateway::new(provider, runner))),
        Method::Api => {
            let api_base = config.api_base_for(provider);
            debug!(api_base = %api_base, "using REST API");
            let gateway = ApiGateway::new(provider, api_base, config.token_for(provider))?;
            Ok(Box::new(gateway))
        }
    }
}
