//! GitLab provider (REST v4).
//!
//! Endpoints used:
//!   * POST /projects/:id/merge_requests/:iid/approve
//!   * PUT  /projects/:id/merge_requests/:iid/merge
//!   * POST /projects/:id/repository/tags
//!   * GET  /projects/:id/repository/tags
//!   * GET  /projects/:id/repository/compare?from=:from&to=:to
//!   * GET  /projects/:id/repository/commits?ref_name=:ref
//!   * GET  /projects/:id/merge_requests?state=merged
//!   * GET  /projects/:id/issues?state=closed
//!   * GET  /projects/:id/issues/:iid/closed_by
//!   * POST /projects/:id/releases

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    Client, Response,
    header::{ACCEPT, HeaderMap, HeaderValue, RETRY_AFTER, USER_AGENT},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::errors::{GatewayError, GatewayResult};
use crate::git_providers::{HostingGateway, ProviderConfig, types::*};

/// Page size requested from list endpoints (GitLab maximum).
const PER_PAGE: &str = "100";

/// GitLab HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    base_api: String, // e.g. "https://gitlab.com/api/v4", no trailing slash
}

#[derive(Serialize)]
struct CreateTagBody<'a> {
    tag_name: &'a str,
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

#[derive(Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    description: &'a str,
}

impl GitLabClient {
    /// Builds the client with the token header and timeouts baked in.
    pub fn from_config(cfg: ProviderConfig) -> GatewayResult<Self> {
        debug!(
            base_api = %cfg.base_api,
            timeout_secs = cfg.timeout.as_secs(),
            "Initializing GitLab client"
        );

        if cfg.token.trim().is_empty() {
            return Err(GatewayError::Config("missing provider token".into()));
        }

        let http = Client::builder()
            .default_headers(build_gitlab_headers(&cfg.token)?)
            .connect_timeout(Duration::from_secs(10))
            .timeout(cfg.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            http,
            base_api: cfg.base_api.trim_end_matches('/').to_string(),
        })
    }

    fn project_url(&self, project: &str, rest: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.base_api,
            urlencoding::encode(project),
            rest
        )
    }

    /// GETs every page of a list endpoint, following `x-next-page`.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> GatewayResult<Vec<T>> {
        let mut out = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!(%url, page, "GitLab list page");
            let page_param = page.to_string();
            let resp = self
                .http
                .get(url)
                .query(query)
                .query(&[("per_page", PER_PAGE), ("page", page_param.as_str())])
                .send()
                .await?;
            let resp = check_status(resp).await?;

            let next = resp
                .headers()
                .get("x-next-page")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok());

            let items: Vec<T> = resp.json().await?;
            out.extend(items);

            match next {
                Some(n) if n > page => page = n,
                _ => break,
            }
        }

        Ok(out)
    }
}

impl HostingGateway for GitLabClient {
    async fn approve_merge_request(&self, project: &str, iid: u64) -> GatewayResult<()> {
        let url = self.project_url(project, &format!("merge_requests/{iid}/approve"));
        debug!("GitLab approve: {}", url);

        let resp = self.http.post(url).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn accept_merge_request(
        &self,
        project: &str,
        iid: u64,
        options: AcceptOptions,
    ) -> GatewayResult<()> {
        let url = self.project_url(project, &format!("merge_requests/{iid}/merge"));
        debug!(
            merge_when_pipeline_succeeds = options.merge_when_pipeline_succeeds,
            should_remove_source_branch = options.should_remove_source_branch,
            "GitLab accept: {}",
            url
        );

        let resp = self.http.put(url).json(&options).send().await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn create_tag(&self, project: &str, tag_name: &str, git_ref: &str) -> GatewayResult<Tag> {
        let url = self.project_url(project, "repository/tags");
        debug!(tag_name, git_ref, "GitLab create_tag: {}", url);

        let resp = self
            .http
            .post(url)
            .json(&CreateTagBody { tag_name, git_ref })
            .send()
            .await?;
        let tag = check_status(resp).await?.json().await?;
        Ok(tag)
    }

    async fn list_tags(&self, project: &str) -> GatewayResult<Vec<Tag>> {
        let url = self.project_url(project, "repository/tags");
        self.get_paged(&url, &[]).await
    }

    async fn commits_between(
        &self,
        project: &str,
        from: Option<&str>,
        to: &str,
    ) -> GatewayResult<Vec<String>> {
        let commits: Vec<CommitRef> = match from {
            Some(from) => {
                let url = self.project_url(project, "repository/compare");
                debug!(from, to, "GitLab compare: {}", url);
                let resp = self
                    .http
                    .get(url)
                    .query(&[("from", from), ("to", to)])
                    .send()
                    .await?;
                let body: CompareResponse = check_status(resp).await?.json().await?;
                body.commits
            }
            None => {
                let url = self.project_url(project, "repository/commits");
                self.get_paged(&url, &[("ref_name", to.to_string())]).await?
            }
        };

        Ok(commits.into_iter().map(|c| c.id).collect())
    }

    async fn list_merged_merge_requests(
        &self,
        project: &str,
        updated_after: DateTime<Utc>,
    ) -> GatewayResult<Vec<MergeRequestSummary>> {
        let url = self.project_url(project, "merge_requests");
        self.get_paged(&url, &window_query("merged", updated_after))
            .await
    }

    async fn list_closed_issues(
        &self,
        project: &str,
        updated_after: DateTime<Utc>,
    ) -> GatewayResult<Vec<IssueSummary>> {
        let url = self.project_url(project, "issues");
        self.get_paged(&url, &window_query("closed", updated_after))
            .await
    }

    async fn issue_closed_by(&self, project: &str, issue_iid: u64) -> GatewayResult<Vec<u64>> {
        let url = self.project_url(project, &format!("issues/{issue_iid}/closed_by"));
        let closing: Vec<ClosingMergeRequest> = self.get_paged(&url, &[]).await?;
        Ok(closing.into_iter().map(|mr| mr.iid).collect())
    }

    async fn create_release(
        &self,
        project: &str,
        tag_name: &str,
        description: &str,
    ) -> GatewayResult<()> {
        let url = self.project_url(project, "releases");
        debug!(tag_name, "GitLab create_release: {}", url);

        let resp = self
            .http
            .post(url)
            .json(&CreateReleaseBody {
                tag_name,
                description,
            })
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }
}

fn build_gitlab_headers(token: &str) -> GatewayResult<HeaderMap> {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static("tagbot-gitlab/0.1"));
    h.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let mut token = HeaderValue::from_str(token)
        .map_err(|e| GatewayError::Config(format!("bad token: {e}")))?;
    token.set_sensitive(true);
    // GitLab Private Token header:
    h.insert("PRIVATE-TOKEN", token);
    Ok(h)
}

/// Query for the time-windowed list endpoints used by release notes.
fn window_query(state: &str, updated_after: DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![
        ("state", state.to_string()),
        (
            "updated_after",
            updated_after.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        ("order_by", "updated_at".to_string()),
        ("sort", "asc".to_string()),
    ]
}

/// Passes 2xx responses through and turns anything else into a
/// [`GatewayError`] carrying GitLab's own message.
async fn check_status(resp: Response) -> GatewayResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = resp.text().await.unwrap_or_default();
    let message = provider_message(&body);

    warn!(status = status.as_u16(), %message, "GitLab request failed");
    Err(GatewayError::from_status(
        status.as_u16(),
        retry_after,
        message,
    ))
}

/// Extracts the human message from a GitLab error body.
///
/// GitLab answers with `{"message": "..."}`, `{"message": {"field": [...]}}`
/// or `{"error": "..."}`; anything else is passed through trimmed.
fn provider_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(v) => match v.get("message").or_else(|| v.get("error")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.trim().to_string(),
        },
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GitLabClient {
        let cfg = ProviderConfig::new(format!("{}/api/v4/", server.uri()), "glpat-test");
        GitLabClient::from_config(cfg).unwrap()
    }

    #[test]
    fn provider_message_reads_gitlab_error_shapes() {
        assert_eq!(
            provider_message(r#"{"message":"Tag v1.0.0 already exists"}"#),
            "Tag v1.0.0 already exists"
        );
        assert_eq!(
            provider_message(r#"{"message":{"tag_name":["is invalid"]}}"#),
            r#"{"tag_name":["is invalid"]}"#
        );
        assert_eq!(provider_message(r#"{"error":"insufficient_scope"}"#), "insufficient_scope");
        assert_eq!(provider_message("  Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn empty_token_is_a_config_error() {
        let err = GitLabClient::from_config(ProviderConfig::new("https://gitlab.com/api/v4", " "))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[tokio::test]
    async fn create_tag_posts_name_and_ref_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/foo%2Fbar/repository/tags"))
            .and(header("PRIVATE-TOKEN", "glpat-test"))
            .and(body_json(json!({"tag_name": "v1.2.3", "ref": "abcdef"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "name": "v1.2.3",
                "commit": {"id": "abcdef", "created_at": "2024-01-01T00:00:00Z"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tag = client_for(&server)
            .await
            .create_tag("foo/bar", "v1.2.3", "abcdef")
            .await
            .unwrap();
        assert_eq!(tag.name, "v1.2.3");
        assert_eq!(tag.commit.id, "abcdef");
    }

    #[tokio::test]
    async fn create_tag_surfaces_gitlab_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/foo%2Fbar/repository/tags"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"message": "Tag v1.2.3 already exists"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .create_tag("foo/bar", "v1.2.3", "abcdef")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Rejected("Tag v1.2.3 already exists".into()));
    }

    #[tokio::test]
    async fn approve_then_accept_hit_merge_request_endpoints() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/42/merge_requests/7/approve"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/v4/projects/42/merge_requests/7/merge"))
            .and(body_json(json!({
                "merge_when_pipeline_succeeds": true,
                "should_remove_source_branch": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"iid": 7})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.approve_merge_request("42", 7).await.unwrap();
        client
            .accept_merge_request(
                "42",
                7,
                AcceptOptions {
                    merge_when_pipeline_succeeds: true,
                    should_remove_source_branch: true,
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn accept_maps_405_to_not_allowed() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v4/projects/42/merge_requests/7/merge"))
            .respond_with(
                ResponseTemplate::new(405).set_body_json(json!({"message": "405 Method Not Allowed"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .accept_merge_request(
                "42",
                7,
                AcceptOptions {
                    merge_when_pipeline_succeeds: true,
                    should_remove_source_branch: false,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::NotAllowed("405 Method Not Allowed".into()));
    }

    #[tokio::test]
    async fn list_tags_follows_next_page_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/foo%2Fbar/repository/tags"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-next-page", "2")
                    .set_body_json(json!([{"name": "v1.0.0", "commit": {"id": "a"}}])),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/foo%2Fbar/repository/tags"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-next-page", "")
                    .set_body_json(json!([{"name": "v1.1.0", "commit": {"id": "b"}}])),
            )
            .mount(&server)
            .await;

        let tags = client_for(&server).await.list_tags("foo/bar").await.unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["v1.0.0", "v1.1.0"]);
    }

    #[tokio::test]
    async fn commits_between_uses_compare_when_previous_tag_known() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v4/projects/foo%2Fbar/repository/compare"))
            .and(query_param("from", "v1.0.0"))
            .and(query_param("to", "v1.1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "commit": null,
                "commits": [{"id": "c1"}, {"id": "c2"}]
            })))
            .mount(&server)
            .await;

        let shas = client_for(&server)
            .await
            .commits_between("foo/bar", Some("v1.0.0"), "v1.1.0")
            .await
            .unwrap();
        assert_eq!(shas, ["c1", "c2"]);
    }

    #[tokio::test]
    async fn create_release_posts_description() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/projects/foo%2Fbar/releases"))
            .and(body_json(json!({"tag_name": "v1.2.3", "description": "notes"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"tag_name": "v1.2.3"})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .create_release("foo/bar", "v1.2.3", "notes")
            .await
            .unwrap();
    }
}
