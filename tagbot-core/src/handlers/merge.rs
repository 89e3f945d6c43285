use hosting_gateway::HostingGateway;
use tracing::{debug, info};

use crate::config::TagbotConfig;
use crate::errors::{StateRejection, TagbotError, TagbotResult};
use crate::event::MergeRequestEvent;
use crate::extractor::{ExtractedTagInfo, extract_tag_info};
use crate::handlers::Outcome;
use crate::release_notes::ReleaseNotes;

const MERGED: &str = "merged";

/// Tags the release described by a merged registration MR.
#[derive(Debug)]
pub struct MergeHandler {
    release_notes: Option<ReleaseNotes>,
}

impl MergeHandler {
    pub fn new(config: &TagbotConfig) -> Self {
        let release_notes = config
            .release_notes
            .then(|| ReleaseNotes::new(config.web_url.clone()));
        Self { release_notes }
    }

    /// Replay guard, merged state, default branch; first failure wins.
    pub fn preconditions(&self, event: &MergeRequestEvent) -> TagbotResult<()> {
        if event.previous_state() == Some(MERGED) {
            return Err(StateRejection::PreviouslyMerged.into());
        }
        match event.current_state() {
            Some(MERGED) => {}
            other => return Err(StateRejection::NotMerged(other.unwrap_or("none").into()).into()),
        }

        match (event.target_branch(), event.default_branch()) {
            (Some(target), Some(default)) if target == default => Ok(()),
            (target, default) => Err(TagbotError::InvalidTargetBranch {
                target: target.unwrap_or("none").to_string(),
                default: default.unwrap_or("none").to_string(),
            }),
        }
    }

    pub async fn handle<G: HostingGateway>(
        &self,
        event: &MergeRequestEvent,
        gateway: &G,
    ) -> TagbotResult<Outcome> {
        self.preconditions(event)?;

        debug!(body = event.description(), "MR body");
        let ExtractedTagInfo {
            project,
            version,
            commit,
        } = extract_tag_info(event.description())?;

        info!(%project, tag = %version, %commit, "creating tag");
        gateway
            .create_tag(&project, &version, &commit)
            .await
            .map_err(TagbotError::TagCreationFailed)?;

        let released = match &self.release_notes {
            Some(notes) => {
                notes
                    .publish(gateway, &project, &version, &commit)
                    .await
                    .map_err(TagbotError::ReleaseNotesFailed)?;
                true
            }
            None => false,
        };

        Ok(Outcome::Tagged {
            project,
            tag: version,
            commit,
            released,
        })
    }
}
