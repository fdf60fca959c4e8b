use crate::overlap::OverlapEntry;

/// Pull requests touching one target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOverlap {
    /// Target file path as given on the command line (trimmed)
    pub path: String,
    /// Matching pull requests in provider order
    pub entries: Vec<OverlapEntry>,
}

/// Everything the presenter needs for one run.
#[derive(Debug)]
pub struct Report {
    /// Repository the pull requests were listed from
    pub slug: String,
    /// Number of open pull requests inspected
    pub prs_checked: usize,
    /// One block per overlapping file, in target order
    pub overlaps: Vec<FileOverlap>,
}

impl Report {
    pub fn has_overlaps(&self) -> bool {
        !self.overlaps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_overlaps() {
        let mut report = Report {
            slug: "owner/repo".to_string(),
            prs_checked: 3,
            overlaps: vec![],
        };
        assert!(!report.has_overlaps());

        report.overlaps.push(FileOverlap {
            path: "README.md".to_string(),
            entries: vec![OverlapEntry {
                branch: "docs".to_string(),
                pr_id: 4,
            }],
        });
        assert!(report.has_overlaps());
    }
}
