use std::collections::BTreeMap;

use crate::provider::{ChangedFiles, PrSummary};

/// One open pull request that touches a target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapEntry {
    /// Source branch of the pull request
    pub branch: String,
    /// Provider-assigned pull request number
    pub pr_id: u64,
}

/// Matches for one file, in the order pull requests were processed.
pub type OverlapRecord = Vec<OverlapEntry>;

/// Target file path → pull requests that also change it.
///
/// A path with no entry has no overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapMapping {
    records: BTreeMap<String, OverlapRecord>,
}

impl OverlapMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `pr` against every target file it changes.
    ///
    /// Matching is exact, case-sensitive string equality after trimming the
    /// target. A pull request is recorded at most once per file, even when
    /// it is accumulated again after other pull requests.
    pub fn accumulate<S: AsRef<str>>(
        &mut self,
        pr: &PrSummary,
        changed: &ChangedFiles,
        targets: &[S],
    ) {
        for target in targets {
            let target = target.as_ref().trim();
            if target.is_empty() || !changed.contains(target) {
                continue;
            }

            let record = self.records.entry(target.to_string()).or_default();
            if !record.iter().any(|e| e.pr_id == pr.id) {
                record.push(OverlapEntry {
                    branch: pr.branch.clone(),
                    pr_id: pr.id,
                });
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&OverlapRecord> {
        self.records.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of files with at least one overlap.
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changed(paths: &[&str]) -> ChangedFiles {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_accumulate_exact_match_only() {
        let mut mapping = OverlapMapping::new();
        let pr = PrSummary::new(5, "topic");
        mapping.accumulate(
            &pr,
            &changed(&["README.md", "other.py"]),
            &["README.md", "src/main.py"],
        );

        assert_eq!(mapping.len(), 1);
        assert_eq!(
            mapping.get("README.md"),
            Some(&vec![OverlapEntry {
                branch: "topic".to_string(),
                pr_id: 5
            }])
        );
        assert!(mapping.get("src/main.py").is_none());
    }

    #[test]
    fn test_accumulate_trims_targets() {
        let mut mapping = OverlapMapping::new();
        mapping.accumulate(
            &PrSummary::new(1, "a"),
            &changed(&["src/lib.rs"]),
            &["  src/lib.rs\n"],
        );
        assert!(mapping.get("src/lib.rs").is_some());
    }

    #[test]
    fn test_accumulate_is_case_sensitive_and_unnormalized() {
        let mut mapping = OverlapMapping::new();
        mapping.accumulate(
            &PrSummary::new(1, "a"),
            &changed(&["readme.md", "src/lib.rs"]),
            &["README.md", "./src/lib.rs", "src/*.rs"],
        );
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_accumulate_keeps_processing_order() {
        let mut mapping = OverlapMapping::new();
        let files = changed(&["Cargo.toml"]);
        for (id, branch) in [(9, "nine"), (3, "three"), (7, "seven")] {
            mapping.accumulate(&PrSummary::new(id, branch), &files, &["Cargo.toml"]);
        }
        let ids: Vec<u64> = mapping
            .get("Cargo.toml")
            .unwrap()
            .iter()
            .map(|e| e.pr_id)
            .collect();
        assert_eq!(ids, vec![9, 3, 7]);
    }

    #[test]
    fn test_duplicate_targets_collapse() {
        let mut mapping = OverlapMapping::new();
        mapping.accumulate(
            &PrSummary::new(1, "a"),
            &changed(&["a.txt"]),
            &["a.txt", " a.txt", "a.txt"],
        );
        assert_eq!(mapping.get("a.txt").map(Vec::len), Some(1));
    }

    #[test]
    fn test_repeated_pr_recorded_once_after_others() {
        let mut mapping = OverlapMapping::new();
        let files = changed(&["Cargo.toml"]);
        for (id, branch) in [(4, "four"), (8, "eight"), (4, "four")] {
            mapping.accumulate(&PrSummary::new(id, branch), &files, &["Cargo.toml"]);
        }
        let ids: Vec<u64> = mapping
            .get("Cargo.toml")
            .unwrap()
            .iter()
            .map(|e| e.pr_id)
            .collect();
        assert_eq!(ids, vec![4, 8]);
    }
}
