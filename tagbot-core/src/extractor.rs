//! Extraction of `Repository:`, `Version:` and `Commit:` from an MR description.
//!
//! Registration bots write these as labelled lines, often as markdown list
//! items:
//!
//! ```text
//! - Repository: https://gitlab.example.com/group/Package.jl
//! - Version: v1.2.3
//! - Commit: 0123456789abcdef
//! ```
//!
//! The repository keeps only the last two path segments, so nested groups
//! (`a/b/c/project`) resolve to `c/project`.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use thiserror::Error;

static REPOSITORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Repository:[ \t]*(?:\S*/)?([^/\s]+/[^/\s]+)").expect("valid repository regex")
});
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Version:[ \t]*(v[^\r\n]*)").expect("valid version regex"));
static COMMIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Commit:[ \t]*([^\r\n]*)").expect("valid commit regex"));

/// Labelled field of the description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionField {
    Repository,
    Version,
    Commit,
}

impl fmt::Display for DescriptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DescriptionField::Repository => "repo",
            DescriptionField::Version => "version",
            DescriptionField::Commit => "commit",
        })
    }
}

/// A required field could not be located.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("No {field} match")]
pub struct ExtractionError {
    pub field: DescriptionField,
}

/// What to tag, derived from the description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTagInfo {
    /// `group/project`.
    pub project: String,
    /// Tag name, always starting with `v`.
    pub version: String,
    /// Ref or SHA the tag points at.
    pub commit: String,
}

/// Extracts all three fields.
///
/// Each field is searched independently; the error names the first missing
/// one in the order repository, version, commit.
pub fn extract_tag_info(description: &str) -> Result<ExtractedTagInfo, ExtractionError> {
    let project = find_field(&REPOSITORY_RE, description);
    let version = find_field(&VERSION_RE, description);
    let commit = find_field(&COMMIT_RE, description);

    match (project, version, commit) {
        (Some(project), Some(version), Some(commit)) => Ok(ExtractedTagInfo {
            project,
            version,
            commit,
        }),
        (None, _, _) => Err(ExtractionError {
            field: DescriptionField::Repository,
        }),
        (_, None, _) => Err(ExtractionError {
            field: DescriptionField::Version,
        }),
        (_, _, None) => Err(ExtractionError {
            field: DescriptionField::Commit,
        }),
    }
}

/// First non-empty, trimmed capture of `re` in `text`.
fn find_field(re: &Regex, text: &str) -> Option<String> {
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_BODY: &str = "\nRepository: gitlab.foo.com/foo/bar\nVersion: v0.1.2\nCommit: abcdef\n";

    fn missing(body: &str) -> DescriptionField {
        extract_tag_info(body).unwrap_err().field
    }

    #[test]
    fn extracts_all_three_fields() {
        let info = extract_tag_info(GOOD_BODY).unwrap();
        assert_eq!(
            info,
            ExtractedTagInfo {
                project: "foo/bar".into(),
                version: "v0.1.2".into(),
                commit: "abcdef".into(),
            }
        );
    }

    #[test]
    fn accepts_bare_group_project() {
        let info = extract_tag_info("Repository: foo/bar\nVersion: v1.2.3\nCommit: abcdef\n").unwrap();
        assert_eq!(info.project, "foo/bar");
        assert_eq!(info.version, "v1.2.3");
        assert_eq!(info.commit, "abcdef");
    }

    #[test]
    fn reads_registrator_markdown_list() {
        let body = "## Package registration\n\
                    - Registering package: Foo\n\
                    - Repository: https://gitlab.example.com/group/Foo.jl\r\n\
                    - Created by: @someone\n\
                    - Version: v2.0.0\r\n\
                    - Commit: 0123456789abcdef0123456789abcdef01234567\n\
                    - Git reference: HEAD\n";
        let info = extract_tag_info(body).unwrap();
        assert_eq!(info.project, "group/Foo.jl");
        assert_eq!(info.version, "v2.0.0");
        assert_eq!(info.commit, "0123456789abcdef0123456789abcdef01234567");
    }

    #[test]
    fn nested_groups_keep_last_two_segments() {
        let body = "Repository: https://gitlab.foo.com/p1/p2/p3/goodRepo\nVersion: v0.1.2\nCommit: abcdef";
        assert_eq!(extract_tag_info(body).unwrap().project, "p3/goodRepo");

        let body = "Repository: foo/bar/\nVersion: v0.1.2\nCommit: abcdef";
        assert_eq!(extract_tag_info(body).unwrap().project, "foo/bar");
    }

    #[test]
    fn names_the_first_missing_field() {
        assert_eq!(missing(""), DescriptionField::Repository);
        assert_eq!(missing("Repository: gitlab.foo.com/foo/bar"), DescriptionField::Version);
        assert_eq!(
            missing("Repository: gitlab.foo.com/foo/bar\nVersion: v0.1.2"),
            DescriptionField::Commit
        );
        // Missing repository is reported even when the others are present.
        assert_eq!(missing("Version: v0.1.2\nCommit: abcdef"), DescriptionField::Repository);
        assert_eq!(
            extract_tag_info("").unwrap_err().to_string(),
            "No repo match"
        );
    }

    #[test]
    fn version_must_start_with_v() {
        let body = "Repository: foo/bar\nVersion: 1.2.3\nCommit: abcdef";
        assert_eq!(missing(body), DescriptionField::Version);
    }

    #[test]
    fn single_segment_repository_is_not_recognised() {
        let body = "Repository: goodRepo\nVersion: v0.1.2\nCommit: abcdef";
        assert_eq!(missing(body), DescriptionField::Repository);
    }

    #[test]
    fn empty_label_does_not_borrow_the_next_line() {
        let body = "Repository: foo/bar\nVersion: v1.0.0\nCommit:\nabcdef";
        assert_eq!(missing(body), DescriptionField::Commit);
    }

    #[test]
    fn values_are_trimmed() {
        let body = "Repository:   foo/bar  \nVersion:\tv1.0.0   \nCommit:   abc123   \n";
        let info = extract_tag_info(body).unwrap();
        assert_eq!(info.project, "foo/bar");
        assert_eq!(info.version, "v1.0.0");
        assert_eq!(info.commit, "abc123");
    }
}
