//! In-memory [`HostingGateway`] that records calls instead of talking HTTP.
//!
//! Available under `cfg(test)` and the `test-util` feature.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};

use crate::errors::{GatewayError, GatewayResult};
use crate::git_providers::{
    AcceptOptions, HostingGateway, IssueSummary, MergeRequestSummary, Tag, TagCommit,
};

/// Gateway operation, used to prime failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Approve,
    Accept,
    CreateTag,
    ListTags,
    CommitsBetween,
    ListMergedMergeRequests,
    ListClosedIssues,
    IssueClosedBy,
    CreateRelease,
}

/// One recorded gateway call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Approve {
        project: String,
        iid: u64,
    },
    Accept {
        project: String,
        iid: u64,
        options: AcceptOptions,
    },
    CreateTag {
        project: String,
        tag_name: String,
        git_ref: String,
    },
    ListTags {
        project: String,
    },
    CommitsBetween {
        project: String,
        from: Option<String>,
        to: String,
    },
    ListMergedMergeRequests {
        project: String,
        updated_after: DateTime<Utc>,
    },
    ListClosedIssues {
        project: String,
        updated_after: DateTime<Utc>,
    },
    IssueClosedBy {
        project: String,
        issue_iid: u64,
    },
    CreateRelease {
        project: String,
        tag_name: String,
        description: String,
    },
}

impl GatewayCall {
    pub fn operation(&self) -> Operation {
        match self {
            GatewayCall::Approve { .. } => Operation::Approve,
            GatewayCall::Accept { .. } => Operation::Accept,
            GatewayCall::CreateTag { .. } => Operation::CreateTag,
            GatewayCall::ListTags { .. } => Operation::ListTags,
            GatewayCall::CommitsBetween { .. } => Operation::CommitsBetween,
            GatewayCall::ListMergedMergeRequests { .. } => Operation::ListMergedMergeRequests,
            GatewayCall::ListClosedIssues { .. } => Operation::ListClosedIssues,
            GatewayCall::IssueClosedBy { .. } => Operation::IssueClosedBy,
            GatewayCall::CreateRelease { .. } => Operation::CreateRelease,
        }
    }
}

/// Records every call; answers from canned data or primed failures.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    failures: HashMap<Operation, GatewayError>,
    tags: Vec<Tag>,
    commits: Vec<String>,
    merge_requests: Vec<MergeRequestSummary>,
    issues: Vec<IssueSummary>,
    closed_by: HashMap<u64, Vec<u64>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `operation` fail with `error` every time it is called.
    pub fn failing(mut self, operation: Operation, error: GatewayError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_commits(mut self, commits: Vec<String>) -> Self {
        self.commits = commits;
        self
    }

    pub fn with_merge_requests(mut self, merge_requests: Vec<MergeRequestSummary>) -> Self {
        self.merge_requests = merge_requests;
        self
    }

    pub fn with_issues(mut self, issues: Vec<IssueSummary>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_closed_by(mut self, issue_iid: u64, merge_request_iids: Vec<u64>) -> Self {
        self.closed_by.insert(issue_iid, merge_request_iids);
        self
    }

    /// Snapshot of the calls made so far, in order.
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls that change state on the hosting service.
    pub fn mutating_calls(&self) -> Vec<GatewayCall> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c.operation(),
                    Operation::Approve
                        | Operation::Accept
                        | Operation::CreateTag
                        | Operation::CreateRelease
                )
            })
            .collect()
    }

    fn record(&self, call: GatewayCall) -> GatewayResult<()> {
        let operation = call.operation();
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
        match self.failures.get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl HostingGateway for RecordingGateway {
    async fn approve_merge_request(&self, project: &str, iid: u64) -> GatewayResult<()> {
        self.record(GatewayCall::Approve {
            project: project.to_string(),
            iid,
        })
    }

    async fn accept_merge_request(
        &self,
        project: &str,
        iid: u64,
        options: AcceptOptions,
    ) -> GatewayResult<()> {
        self.record(GatewayCall::Accept {
            project: project.to_string(),
            iid,
            options,
        })
    }

    async fn create_tag(&self, project: &str, tag_name: &str, git_ref: &str) -> GatewayResult<Tag> {
        self.record(GatewayCall::CreateTag {
            project: project.to_string(),
            tag_name: tag_name.to_string(),
            git_ref: git_ref.to_string(),
        })?;
        Ok(Tag {
            name: tag_name.to_string(),
            commit: TagCommit {
                id: git_ref.to_string(),
                created_at: None,
            },
        })
    }

    async fn list_tags(&self, project: &str) -> GatewayResult<Vec<Tag>> {
        self.record(GatewayCall::ListTags {
            project: project.to_string(),
        })?;
        Ok(self.tags.clone())
    }

    async fn commits_between(
        &self,
        project: &str,
        from: Option<&str>,
        to: &str,
    ) -> GatewayResult<Vec<String>> {
        self.record(GatewayCall::CommitsBetween {
            project: project.to_string(),
            from: from.map(str::to_string),
            to: to.to_string(),
        })?;
        Ok(self.commits.clone())
    }

    async fn list_merged_merge_requests(
        &self,
        project: &str,
        updated_after: DateTime<Utc>,
    ) -> GatewayResult<Vec<MergeRequestSummary>> {
        self.record(GatewayCall::ListMergedMergeRequests {
            project: project.to_string(),
            updated_after,
        })?;
        Ok(self.merge_requests.clone())
    }

    async fn list_closed_issues(
        &self,
        project: &str,
        updated_after: DateTime<Utc>,
    ) -> GatewayResult<Vec<IssueSummary>> {
        self.record(GatewayCall::ListClosedIssues {
            project: project.to_string(),
            updated_after,
        })?;
        Ok(self.issues.clone())
    }

    async fn issue_closed_by(&self, project: &str, issue_iid: u64) -> GatewayResult<Vec<u64>> {
        self.record(GatewayCall::IssueClosedBy {
            project: project.to_string(),
            issue_iid,
        })?;
        Ok(self.closed_by.get(&issue_iid).cloned().unwrap_or_default())
    }

    async fn create_release(
        &self,
        project: &str,
        tag_name: &str,
        description: &str,
    ) -> GatewayResult<()> {
        self.record(GatewayCall::CreateRelease {
            project: project.to_string(),
            tag_name: tag_name.to_string(),
            description: description.to_string(),
        })
    }
}
