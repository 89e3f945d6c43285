use std::{fmt, time::Duration};

use hosting_gateway::{HostingGateway, ProviderConfig};
use tagbot_core::{Dispatcher, TagbotConfig};

use crate::error_handler::ConfigError;

const DEFAULT_API_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const API_SUFFIX: &str = "/api/v4";

/// Process settings loaded once at startup.
#[derive(Clone)]
pub struct Settings {
    /// Listen address, e.g. "0.0.0.0:8080".
    pub api_address: String,
    /// API base for GitLab, e.g. "https://gitlab.com/api/v4".
    pub gitlab_api_base: String,
    /// Token for GitLab API ("PRIVATE-TOKEN" PAT or project access token).
    pub gitlab_token: String,
    /// Whole-request timeout for GitLab calls.
    pub http_timeout: Duration,
    /// Settings for the decision core.
    pub tagbot: TagbotConfig,
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_address = var("API_ADDRESS").unwrap_or_else(|| DEFAULT_API_ADDRESS.into());

        // Either URL can be derived from the other.
        let (gitlab_api_base, web_url) = match (var("GITLAB_API_BASE"), var("GITLAB_URL")) {
            (Some(api), Some(web)) => (trim_url(&api), trim_url(&web)),
            (Some(api), None) => {
                let api = trim_url(&api);
                let web = api.strip_suffix(API_SUFFIX).unwrap_or(&api).to_string();
                (api, web)
            }
            (None, Some(web)) => {
                let web = trim_url(&web);
                (format!("{web}{API_SUFFIX}"), web)
            }
            (None, None) => return Err(ConfigError::MissingVar("GITLAB_API_BASE")),
        };
        validate_http_endpoint("GITLAB_API_BASE", &gitlab_api_base)?;
        validate_http_endpoint("GITLAB_URL", &web_url)?;

        let gitlab_token = must_var(&var, "GITLAB_API_TOKEN")?;
        let webhook_token = must_var(&var, "GITLAB_WEBHOOK_TOKEN")?;
        let registrator_id = parse_u64("REGISTRATOR_ID", &must_var(&var, "REGISTRATOR_ID")?)?;

        let http_timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_u64("HTTP_TIMEOUT_SECS", &v)?),
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        Ok(Self {
            api_address,
            gitlab_api_base,
            gitlab_token,
            http_timeout,
            tagbot: TagbotConfig {
                webhook_token,
                registrator_id,
                automatic_merge: lookup("AUTOMATIC_MERGE").as_deref() == Some("true"),
                release_notes: lookup("RELEASE_NOTES").as_deref() == Some("true"),
                web_url,
            },
        })
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(&self.gitlab_api_base, &self.gitlab_token).with_timeout(self.http_timeout)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_address", &self.api_address)
            .field("gitlab_api_base", &self.gitlab_api_base)
            .field("gitlab_token", &"<redacted>")
            .field("http_timeout", &self.http_timeout)
            .field("tagbot", &self.tagbot)
            .finish()
    }
}

/// Shared state for all HTTP handlers.
pub struct AppState<G> {
    pub dispatcher: Dispatcher<G>,
}

impl<G: HostingGateway> AppState<G> {
    pub fn new(config: &TagbotConfig, gateway: G) -> Self {
        Self {
            dispatcher: Dispatcher::new(config, gateway),
        }
    }
}

fn must_var(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    var(name).ok_or(ConfigError::MissingVar(name))
}

fn parse_u64(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var: name,
        reason: "expected u64",
    })
}

fn validate_http_endpoint(var: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        })
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
