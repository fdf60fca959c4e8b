mod config;
mod overlap;
mod provider;
mod repo;
mod report;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info, info_span};
use tracing_subscriber::EnvFilter;

use provider::{Method, Provider, ProviderError};

/// PR Overlap: CLI tool that lists open pull requests touching the files
/// you are about to change, so merge conflicts show up before you push.
#[derive(Parser, Debug)]
#[command(name = "pr-overlap", version, about)]
struct Cli {
    /// File to check; repeat the flag or separate paths with commas
    #[arg(short, long = "file", required = true, value_name = "PATH")]
    files: Vec<String>,

    /// Repository remote URL (defaults to the first configured git remote)
    #[arg(short, long)]
    url: Option<String>,

    /// Access method; auto-detected when omitted (CLI if logged in, else API)
    #[arg(short, long, value_enum)]
    method: Option<Method>,

    /// Maximum number of open pull requests to inspect [default: 200]
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    limit: Option<u32>,

    /// Optional output file path for a markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let targets = overlap::parse_targets(&cli.files)?;

    info!("loading configuration");
    let config = config::Config::load()?;
    let limit = config.effective_limit(cli.limit.map(|l| l as usize));

    let url = match cli.url {
        Some(url) => url,
        None => repo::first_remote_url()?,
    };
    let _main_span = info_span!("pr_overlap", url = %url).entered();

    let provider = config
        .provider
        .or_else(|| Provider::detect(&url))
        .ok_or_else(|| ProviderError::UnsupportedProvider(url.clone()))?;
    let slug = repo::resolve_or_err(&url)?;
    debug!(%provider, slug = %slug, limit, targets = targets.len(), "resolved repository");

    let gateway = provider::select_gateway(cli.method, provider, &config).await?;
    let (mapping, prs_checked) =
        overlap::find_overlaps(gateway.as_ref(), &slug, &targets, limit).await?;
    info!(prs_checked, overlapping_files = mapping.len(), "overlap check complete");

    let built_report = report::build(&mapping, &targets, &slug, prs_checked);
    report::output(&built_report, cli.output.as_deref())?;

    Ok(())
}

/// `PR_OVERLAP_DEBUG` turns on debug output for this crate; otherwise
/// `RUST_LOG` decides.
fn env_filter() -> EnvFilter {
    let debug_enabled = std::env::var("PR_OVERLAP_DEBUG")
        .map(|v| debug_flag_enabled(&v))
        .unwrap_or(false);

    if debug_enabled {
        EnvFilter::new("pr_overlap=debug")
    } else {
        EnvFilter::from_default_env()
    }
}

fn debug_flag_enabled(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_repeated_and_comma_files() {
        let cli = Cli::try_parse_from([
            "pr-overlap",
            "--file",
            "README.md,src/a.rs",
            "-f",
            "src/b.rs",
            "--method",
            "api",
            "--limit",
            "5",
        ])
        .unwrap();
        assert_eq!(
            overlap::parse_targets(&cli.files).unwrap(),
            vec!["README.md", "src/a.rs", "src/b.rs"]
        );
        assert_eq!(cli.method, Some(Method::Api));
        assert_eq!(cli.limit, Some(5));
    }

    #[test]
    fn test_cli_rejects_bad_values() {
        assert!(Cli::try_parse_from(["pr-overlap"]).is_err());
        assert!(Cli::try_parse_from(["pr-overlap", "-f", "a", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["pr-overlap", "-f", "a", "--limit", "-3"]).is_err());
        assert!(Cli::try_parse_from(["pr-overlap", "-f", "a", "--method", "ssh"]).is_err());
    }

    #[test]
    fn test_debug_flag_values() {
        assert!(debug_flag_enabled("1"));
        assert!(debug_flag_enabled("true"));
        assert!(!debug_flag_enabled("0"));
        assert!(!debug_flag_enabled("FALSE"));
        assert!(!debug_flag_enabled(""));
    }
}
