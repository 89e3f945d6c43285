use hosting_gateway::{AcceptOptions, HostingGateway};
use tracing::{debug, info};

use crate::config::TagbotConfig;
use crate::errors::{StateRejection, TagbotError, TagbotResult};
use crate::event::MergeRequestEvent;
use crate::handlers::Outcome;

/// Merge request the open handler acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestTarget {
    /// Numeric source project id, as a path parameter.
    pub project: String,
    pub iid: u64,
}

/// Approves and merges freshly opened registration merge requests.
#[derive(Debug, Clone)]
pub struct OpenHandler {
    automatic_merge: bool,
}

impl OpenHandler {
    pub fn new(config: &TagbotConfig) -> Self {
        Self {
            automatic_merge: config.automatic_merge,
        }
    }

    /// Flag on, request new, identifiers present; in that order.
    pub fn preconditions(&self, event: &MergeRequestEvent) -> TagbotResult<MergeRequestTarget> {
        if !self.automatic_merge {
            return Err(TagbotError::AutoMergeDisabled);
        }
        if event.previous_iid().is_some() {
            return Err(StateRejection::NotNew.into());
        }

        let iid = event.current_iid().ok_or(StateRejection::MissingIid)?;
        let project = event
            .source_project_id()
            .ok_or(StateRejection::MissingProject)?;

        Ok(MergeRequestTarget {
            project: project.to_string(),
            iid,
        })
    }

    /// Approve, then accept with merge-when-pipeline-succeeds.
    ///
    /// A failed accept leaves the request approved; nothing is rolled back.
    pub async fn handle<G: HostingGateway>(
        &self,
        event: &MergeRequestEvent,
        gateway: &G,
    ) -> TagbotResult<Outcome> {
        let MergeRequestTarget { project, iid } = self.preconditions(event)?;

        debug!(%project, iid, "approving MR");
        gateway
            .approve_merge_request(&project, iid)
            .await
            .map_err(TagbotError::ApprovalFailed)?;

        let options = AcceptOptions {
            merge_when_pipeline_succeeds: true,
            should_remove_source_branch: true,
        };
        debug!(%project, iid, "accepting MR");
        gateway
            .accept_merge_request(&project, iid, options)
            .await
            .map_err(TagbotError::AcceptFailed)?;

        info!(%project, iid, "MR approved and set to merge");
        Ok(Outcome::AutoMerged { project, iid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hosting_gateway::GatewayError;
    use hosting_gateway::testing::{GatewayCall, Operation, RecordingGateway};
    use serde_json::json;

    fn handler(automatic_merge: bool) -> OpenHandler {
        OpenHandler { automatic_merge }
    }

    fn open_event(previous_iid: Option<u64>) -> MergeRequestEvent {
        let body = json!({
            "event_type": "merge_request",
            "object_attributes": {"action": "open", "author_id": 0, "source_project_id": 42},
            "changes": {"iid": {"previous": previous_iid, "current": 7}}
        });
        MergeRequestEvent::from_slice(body.to_string().as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn approves_then_accepts_new_request() {
        let gateway = RecordingGateway::new();
        let outcome = handler(true)
            .handle(&open_event(None), &gateway)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::AutoMerged {
                project: "42".into(),
                iid: 7
            }
        );
        assert_eq!(
            gateway.calls(),
            vec![
                GatewayCall::Approve {
                    project: "42".into(),
                    iid: 7
                },
                GatewayCall::Accept {
                    project: "42".into(),
                    iid: 7,
                    options: AcceptOptions {
                        merge_when_pipeline_succeeds: true,
                        should_remove_source_branch: true,
                    },
                },
            ]
        );
    }

    #[tokio::test]
    async fn disabled_flag_wins_over_everything_else() {
        let gateway = RecordingGateway::new();
        let err = handler(false)
            .handle(&open_event(Some(3)), &gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, TagbotError::AutoMergeDisabled));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn existing_request_is_not_merged() {
        let gateway = RecordingGateway::new();
        let err = handler(true)
            .handle(&open_event(Some(3)), &gateway)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not a new MR");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn approval_failure_skips_accept() {
        let gateway =
            RecordingGateway::new().failing(Operation::Approve, GatewayError::Forbidden("no".into()));
        let err = handler(true)
            .handle(&open_event(None), &gateway)
            .await
            .unwrap_err();

        assert!(matches!(err, TagbotError::ApprovalFailed(_)));
        assert_eq!(err.to_string(), "Approve MR: forbidden: no");
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn accept_failure_keeps_approval() {
        let gateway = RecordingGateway::new()
            .failing(Operation::Accept, GatewayError::NotAllowed("cannot merge".into()));
        let err = handler(true)
            .handle(&open_event(None), &gateway)
            .await
            .unwrap_err();

        assert!(matches!(err, TagbotError::AcceptFailed(_)));
        let ops: Vec<_> = gateway.calls().iter().map(GatewayCall::operation).collect();
        assert_eq!(ops, [Operation::Approve, Operation::Accept]);
    }

    #[tokio::test]
    async fn missing_iid_is_rejected_without_calls() {
        let body = json!({
            "event_type": "merge_request",
            "object_attributes": {"action": "open", "author_id": 0, "source_project_id": 42}
        });
        let ev = MergeRequestEvent::from_slice(body.to_string().as_bytes()).unwrap();
        let gateway = RecordingGateway::new();

        let err = handler(true).handle(&ev, &gateway).await.unwrap_err();

        assert!(matches!(
            err,
            TagbotError::StaleOrInvalidState(StateRejection::MissingIid)
        ));
        assert_eq!(err.to_string(), "MR iid missing from payload");
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn object_attributes_iid_is_used_without_changes() {
        let body = json!({
            "event_type": "merge_request",
            "object_attributes": {"action": "open", "author_id": 0, "source_project_id": 42, "iid": 9}
        });
        let ev = MergeRequestEvent::from_slice(body.to_string().as_bytes()).unwrap();
        let gateway = RecordingGateway::new();

        handler(true).handle(&ev, &gateway).await.unwrap();

        let targets: Vec<_> = gateway
            .calls()
            .into_iter()
            .map(|c| match c {
                GatewayCall::Approve { project, iid } | GatewayCall::Accept { project, iid, .. } => {
                    (project, iid)
                }
                other => panic!("unexpected call: {other:?}"),
            })
            .collect();
        assert_eq!(targets, [("42".to_string(), 9), ("42".to_string(), 9)]);
    }

    #[test]
    fn missing_project_is_rejected() {
        let body = json!({
            "event_type": "merge_request",
            "object_attributes": {"action": "open", "author_id": 0, "iid": 7}
        });
        let ev = MergeRequestEvent::from_slice(body.to_string().as_bytes()).unwrap();
        let err = handler(true).preconditions(&ev).unwrap_err();
        assert_eq!(err.to_string(), "MR project missing from payload");
    }
}
