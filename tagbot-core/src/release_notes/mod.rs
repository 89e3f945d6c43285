//! Release notes attached to freshly created tags.
//!
//! Notes cover everything between the previous semver release and the new
//! tag: merge requests whose merge (or squash) commit landed in that range,
//! and issues those merge requests closed. Items labelled with one of the
//! ignore labels are left out.

use chrono::{DateTime, TimeDelta, Utc};
use handlebars::Handlebars;
use hosting_gateway::{GatewayError, HostingGateway, IssueSummary, MergeRequestSummary, Tag, UserRef};
use semver::Version;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

const TEMPLATE: &str = include_str!("template.hbs");

/// Labels (compared as slugs) that keep an item out of the notes.
const IGNORE_LABELS: &[&str] = &[
    "changelog skip",
    "duplicate",
    "exclude from changelog",
    "invalid",
    "no changelog",
    "question",
    "wont fix",
];

#[derive(Debug, Error)]
pub enum ReleaseNotesError {
    #[error("invalid version {version}: {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("template error: {0}")]
    Template(String),
}

/// Builds and publishes release notes for new tags.
#[derive(Debug, Clone)]
pub struct ReleaseNotes {
    web_url: String,
}

#[derive(Debug, Serialize)]
struct ReleaseData {
    package: String,
    version: String,
    sha: String,
    version_url: String,
    previous_release: Option<String>,
    compare_url: Option<String>,
    merge_requests: Vec<MergeRequestEntry>,
    issues: Vec<IssueEntry>,
}

#[derive(Debug, Serialize)]
struct UserEntry {
    username: String,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct MergeRequestEntry {
    number: u64,
    title: String,
    url: String,
    author: Option<UserEntry>,
    merger: Option<UserEntry>,
}

#[derive(Debug, Serialize)]
struct IssueEntry {
    number: u64,
    title: String,
    url: String,
    author: Option<UserEntry>,
}

impl ReleaseNotes {
    pub fn new(web_url: impl Into<String>) -> Self {
        let web_url = web_url.into().trim_end_matches('/').to_string();
        Self { web_url }
    }

    /// Builds the notes for `version` and publishes them as its release.
    pub async fn publish<G: HostingGateway>(
        &self,
        gateway: &G,
        project: &str,
        version: &str,
        sha: &str,
    ) -> Result<(), ReleaseNotesError> {
        let notes = self.build(gateway, project, version, sha).await?;
        gateway.create_release(project, version, &notes).await?;
        info!(project, tag = version, "release notes published");
        Ok(())
    }

    /// Renders the notes without publishing them.
    pub async fn build<G: HostingGateway>(
        &self,
        gateway: &G,
        project: &str,
        version: &str,
        sha: &str,
    ) -> Result<String, ReleaseNotesError> {
        let data = self.collect(gateway, project, version, sha).await?;
        render(&data)
    }

    async fn collect<G: HostingGateway>(
        &self,
        gateway: &G,
        project: &str,
        version: &str,
        sha: &str,
    ) -> Result<ReleaseData, ReleaseNotesError> {
        let tags = gateway.list_tags(project).await?;
        let previous = previous_release(&tags, version)?;

        let mut start = DateTime::<Utc>::UNIX_EPOCH;
        let mut previous_name = None;
        let mut compare_url = None;
        if let Some(tag) = previous {
            if let Some(created_at) = tag.commit.created_at {
                start = created_at + TimeDelta::minutes(1);
            }
            compare_url = Some(format!(
                "{}/{}/-/compare/{}...{}",
                self.web_url, project, tag.name, version
            ));
            previous_name = Some(tag.name.clone());
        }
        debug!(project, version, previous = ?previous_name, %start, "collecting release data");

        let shas = gateway
            .commits_between(project, previous_name.as_deref(), version)
            .await?;

        let merge_requests: Vec<MergeRequestSummary> = gateway
            .list_merged_merge_requests(project, start)
            .await?
            .into_iter()
            .filter(|mr| mr.landed_in(&shas) && !is_ignored(&mr.labels))
            .collect();
        let merged_iids: Vec<u64> = merge_requests.iter().map(|mr| mr.iid).collect();

        let mut issues = Vec::new();
        if !merged_iids.is_empty() {
            for issue in gateway.list_closed_issues(project, start).await? {
                if is_ignored(&issue.labels) {
                    continue;
                }
                let closers = gateway.issue_closed_by(project, issue.iid).await?;
                if closers.iter().any(|iid| merged_iids.contains(iid)) {
                    issues.push(issue);
                }
            }
        }

        Ok(ReleaseData {
            package: project.rsplit('/').next().unwrap_or(project).to_string(),
            version: version.to_string(),
            sha: sha.to_string(),
            version_url: format!("{}/{}/-/tree/{}", self.web_url, project, version),
            previous_release: previous_name,
            compare_url,
            merge_requests: merge_requests.into_iter().map(MergeRequestEntry::from).collect(),
            issues: issues.into_iter().map(IssueEntry::from).collect(),
        })
    }
}

/// Highest stable `v`-prefixed semver tag strictly lower than `version`.
///
/// Backports work as expected: releasing `v1.1.0` after `v2.0.0` picks `v1.0.0`.
pub fn previous_release<'a>(
    tags: &'a [Tag],
    version: &str,
) -> Result<Option<&'a Tag>, ReleaseNotesError> {
    let current = Version::parse(version.strip_prefix('v').unwrap_or(version)).map_err(|source| {
        ReleaseNotesError::InvalidVersion {
            version: version.to_string(),
            source,
        }
    })?;

    let previous = tags
        .iter()
        .filter_map(|tag| {
            let v = Version::parse(tag.name.strip_prefix('v')?).ok()?;
            (v.pre.is_empty() && v.build.is_empty() && v < current).then_some((v, tag))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag);

    Ok(previous)
}

fn is_ignored(labels: &[String]) -> bool {
    labels
        .iter()
        .map(|l| slug(l))
        .any(|l| IGNORE_LABELS.iter().any(|ignored| slug(ignored) == l))
}

/// Case-folded label without whitespace, `_` and `-`.
fn slug(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .collect()
}

fn render(data: &ReleaseData) -> Result<String, ReleaseNotesError> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
        .register_template_string("release", TEMPLATE)
        .map_err(|e| ReleaseNotesError::Template(e.to_string()))?;

    let raw = handlebars
        .render("release", data)
        .map_err(|e| ReleaseNotesError::Template(e.to_string()))?;

    Ok(collapse_blank_lines(&raw))
}

/// Drops leading, trailing and repeated blank lines left by block helpers.
fn collapse_blank_lines(s: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in s.lines().map(str::trim_end) {
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last() == Some(&"") {
        out.pop();
    }
    out.join("\n")
}

impl From<&UserRef> for UserEntry {
    fn from(u: &UserRef) -> Self {
        Self {
            username: u.username.clone(),
            url: u.web_url.clone(),
        }
    }
}

impl From<MergeRequestSummary> for MergeRequestEntry {
    fn from(mr: MergeRequestSummary) -> Self {
        Self {
            author: mr.author.as_ref().map(UserEntry::from),
            merger: mr.merger().map(UserEntry::from),
            number: mr.iid,
            title: mr.title,
            url: mr.web_url,
        }
    }
}

impl From<IssueSummary> for IssueEntry {
    fn from(issue: IssueSummary) -> Self {
        Self {
            author: issue.author.as_ref().map(UserEntry::from),
            number: issue.iid,
            title: issue.title,
            url: issue.web_url,
        }
    }
}
