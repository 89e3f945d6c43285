//! Hosting API facade without async-trait or dynamic trait objects.
//!
//! The decision core is generic over [`HostingGateway`], so production code
//! runs against [`gitlab::GitLabClient`] while tests plug in a recording
//! double. Methods return `impl Future + Send` so callers can hold the
//! futures across axum handlers.
//!
//! Operations:
//!   * approve / accept a merge request (registration auto-merge)
//!   * create a tag (release tagging)
//!   * read tags, commits, merged MRs and closed issues, and publish a
//!     release (release notes)

pub mod types;
pub use types::*;

pub mod gitlab;

use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};

use crate::errors::GatewayResult;

/// Runtime configuration for the GitLab client.
///
/// Built once at startup and moved into [`gitlab::GitLabClient::from_config`].
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API base, e.g. "https://gitlab.com/api/v4".
    pub base_api: String,
    /// Access token sent as `PRIVATE-TOKEN`.
    pub token: String,
    /// Whole-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(base_api: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_api: base_api.into(),
            token: token.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Operations the decision core performs against the hosting service.
///
/// `project` is either a numeric project id or a `group/project` path; the
/// implementation is responsible for URL-encoding it.
pub trait HostingGateway: Send + Sync {
    /// Approves merge request `iid` of `project`.
    fn approve_merge_request(
        &self,
        project: &str,
        iid: u64,
    ) -> impl Future<Output = GatewayResult<()>> + Send;

    /// Accepts (merges) merge request `iid` of `project`.
    fn accept_merge_request(
        &self,
        project: &str,
        iid: u64,
        options: AcceptOptions,
    ) -> impl Future<Output = GatewayResult<()>> + Send;

    /// Creates tag `tag_name` at `git_ref` (branch, tag or SHA).
    fn create_tag(
        &self,
        project: &str,
        tag_name: &str,
        git_ref: &str,
    ) -> impl Future<Output = GatewayResult<Tag>> + Send;

    /// Lists every tag of the project.
    fn list_tags(&self, project: &str) -> impl Future<Output = GatewayResult<Vec<Tag>>> + Send;

    /// SHAs of the commits reachable from `to` but not from `from`.
    /// With `from = None`, every commit reachable from `to`.
    fn commits_between(
        &self,
        project: &str,
        from: Option<&str>,
        to: &str,
    ) -> impl Future<Output = GatewayResult<Vec<String>>> + Send;

    /// Merged merge requests updated after `updated_after`, oldest first.
    fn list_merged_merge_requests(
        &self,
        project: &str,
        updated_after: DateTime<Utc>,
    ) -> impl Future<Output = GatewayResult<Vec<MergeRequestSummary>>> + Send;

    /// Closed issues updated after `updated_after`, oldest first.
    fn list_closed_issues(
        &self,
        project: &str,
        updated_after: DateTime<Utc>,
    ) -> impl Future<Output = GatewayResult<Vec<IssueSummary>>> + Send;

    /// IIDs of the merge requests that closed issue `issue_iid`.
    fn issue_closed_by(
        &self,
        project: &str,
        issue_iid: u64,
    ) -> impl Future<Output = GatewayResult<Vec<u64>>> + Send;

    /// Publishes a release for an existing tag.
    fn create_release(
        &self,
        project: &str,
        tag_name: &str,
        description: &str,
    ) -> impl Future<Output = GatewayResult<()>> + Send;
}
