pub mod types;

pub use types::{FileOverlap, Report};

use crate::overlap::OverlapMapping;
use crate::repo::RepoSlug;
use colored::Colorize;
use std::ffi::OsStr;
use std::io::IsTerminal;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

const NO_OVERLAPS: &str = "No open pull requests modify the given files.";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Build a Report from the finished mapping.
///
/// Blocks follow the order of `targets`; files without overlaps are left
/// out.
pub fn build(
    mapping: &OverlapMapping,
    targets: &[String],
    slug: &RepoSlug,
    prs_checked: usize,
) -> Report {
    let overlaps = targets
        .iter()
        .filter_map(|path| {
            mapping.get(path.trim()).map(|entries| FileOverlap {
                path: path.trim().to_string(),
                entries: entries.clone(),
            })
        })
        .collect();

    Report {
        slug: slug.to_string(),
        prs_checked,
        overlaps,
    }
}

/// Output the report to terminal (default) or to a markdown file.
#[instrument(skip(report), fields(slug = %report.slug, overlaps = report.overlaps.len()))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            print_terminal_report(report);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            write_markdown_report(report, path)
        }
    }
}

/// Print one block per overlapping file:
///
/// File: **README.md** is modified in PRs:
/// PR #2: feat/improve_sparkling_water_with_ai
/// PR #1: feat/nanowarofsteel/zen_of_python
fn print_terminal_report(report: &Report) {
    let color = color_enabled(
        std::io::stdout().is_terminal(),
        std::env::var_os("NO_COLOR").as_deref(),
    );
    print!("{}", render_terminal(report, color));
}

/// Colour only an interactive stdout, and never when `NO_COLOR` is set to
/// a non-empty value.
fn color_enabled(stdout_is_terminal: bool, no_color: Option<&OsStr>) -> bool {
    stdout_is_terminal && no_color.map_or(true, |value| value.is_empty())
}

fn render_terminal(report: &Report, color: bool) -> String {
    if !report.has_overlaps() {
        let line = if color {
            NO_OVERLAPS.green().to_string()
        } else {
            NO_OVERLAPS.to_string()
        };
        return format!("{}\n", line);
    }

    let mut out = String::new();
    for file in &report.overlaps {
        let path = if color {
            file.path.yellow().bold().to_string()
        } else {
            file.path.clone()
        };
        out.push_str(&format!("File: **{}** is modified in PRs:\n", path));
        for entry in &file.entries {
            let label = format!("PR #{}", entry.pr_id);
            let label = if color { label.cyan().to_string() } else { label };
            out.push_str(&format!("{}: {}\n", label, entry.branch));
        }
        out.push('\n');
    }
    out
}

fn render_markdown(report: &Report) -> String {
    let mut md = String::new();
    md.push_str(&format!(
        "# Open pull requests in {} ({} checked)\n\n",
        report.slug, report.prs_checked
    ));

    if !report.has_overlaps() {
        md.push_str(NO_OVERLAPS);
        md.push('\n');
        return md;
    }

    for file in &report.overlaps {
        md.push_str(&format!("File: **{}** is modified in PRs:\n\n", file.path));
        for entry in &file.entries {
            md.push_str(&format!("- PR #{}: {}\n", entry.pr_id, entry.branch));
        }
        md.push('\n');
    }
    md
}

fn write_markdown_report(report: &Report, path: &Path) -> Result<(), ReportError> {
    std::fs::write(path, render_markdown(report))?;
    Ok(())
}
