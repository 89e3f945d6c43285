use std::fmt;

/// Process-wide settings the decision logic depends on.
///
/// Built once at startup and handed to [`crate::Dispatcher::new`]; nothing in
/// this crate reads the process environment.
#[derive(Clone)]
pub struct TagbotConfig {
    /// Shared secret expected in `X-Gitlab-Token`.
    pub webhook_token: String,
    /// GitLab user id of the registration bot whose MRs are trusted.
    pub registrator_id: u64,
    /// Approve and merge freshly opened registration MRs.
    pub automatic_merge: bool,
    /// Attach generated release notes to every created tag.
    pub release_notes: bool,
    /// Web root used for links in release notes, e.g. "https://gitlab.com".
    pub web_url: String,
}

impl fmt::Debug for TagbotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagbotConfig")
            .field("webhook_token", &"<redacted>")
            .field("registrator_id", &self.registrator_id)
            .field("automatic_merge", &self.automatic_merge)
            .field("release_notes", &self.release_notes)
            .field("web_url", &self.web_url)
            .finish()
    }
}
