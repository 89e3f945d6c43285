//! Thin adapter between the tag bot and the hosting service API.
//!
//! The decision core only sees [`HostingGateway`]; [`GitLabClient`] owns
//! the base URL, the `PRIVATE-TOKEN` header and the HTTP timeouts.

pub mod errors;
pub mod git_providers;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use errors::{GatewayError, GatewayResult};
pub use git_providers::{
    AcceptOptions, HostingGateway, IssueSummary, MergeRequestSummary, ProviderConfig, Tag,
    TagCommit, UserRef, gitlab::GitLabClient,
};
