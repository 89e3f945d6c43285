//! Data model exchanged with the hosting service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Options for accepting (merging) a merge request.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct AcceptOptions {
    /// Defer the merge until the head pipeline succeeds.
    pub merge_when_pipeline_succeeds: bool,
    /// Delete the source branch once merged.
    pub should_remove_source_branch: bool,
}

/// A repository tag as returned by `GET /projects/:id/repository/tags`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub commit: TagCommit,
}

/// The commit a tag points at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCommit {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Minimal user info embedded in merge requests and issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRef {
    pub id: u64,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// A merged merge request, used to assemble release notes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeRequestSummary {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub author: Option<UserRef>,
    /// Deprecated by GitLab in favour of `merge_user`, still populated.
    #[serde(default)]
    pub merged_by: Option<UserRef>,
    #[serde(default)]
    pub merge_user: Option<UserRef>,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub squash_commit_sha: Option<String>,
    #[serde(default)]
    pub web_url: String,
}

impl MergeRequestSummary {
    /// Who merged the request, preferring the newer `merge_user` field.
    pub fn merger(&self) -> Option<&UserRef> {
        self.merge_user.as_ref().or(self.merged_by.as_ref())
    }

    /// True if the merge (or squash) commit is one of `shas`.
    pub fn landed_in(&self, shas: &[String]) -> bool {
        [&self.merge_commit_sha, &self.squash_commit_sha]
            .into_iter()
            .flatten()
            .any(|sha| shas.iter().any(|s| s == sha))
    }
}

/// A closed issue, used to assemble release notes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IssueSummary {
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub author: Option<UserRef>,
    #[serde(default)]
    pub web_url: String,
}

/// Commit entry of list/compare responses; only the SHA is used.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommitRef {
    pub id: String,
}

/// `GET /projects/:id/repository/compare` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct CompareResponse {
    #[serde(default)]
    pub commits: Vec<CommitRef>,
}

/// Entry of `GET /projects/:id/issues/:iid/closed_by`.
#[derive(Debug, Deserialize)]
pub(crate) struct ClosingMergeRequest {
    pub iid: u64,
}
