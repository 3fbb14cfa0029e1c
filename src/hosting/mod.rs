//! Code-hosting connectors.
//!
//! The engine consumes a narrow [`Connector`] capability: load the open
//! proposal for a branch, squash-merge a proposal, and build the URL for a
//! new proposal. The concrete connector is chosen from the configured
//! hosting-service override or the origin URL; an unrecognized origin
//! yields no connector and the features that need one disable gracefully.

pub mod github;
pub mod origin;

pub use origin::OriginUrl;

use crate::config::{HostingService, ProjectConfig};
use async_trait::async_trait;

use crate::error::EngineError;

/// Information about the open proposal for a branch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalInfo {
    pub can_merge_with_api: bool,
    pub default_proposal_message: String,
    pub number: u64,
}

/// Called when a connector performs an action against the hosting service,
/// so the CLI can announce it.
pub type ActionPrinter = Box<dyn Fn(&str) + Send + Sync>;

#[async_trait]
pub trait Connector: Send + Sync {
    /// The service this connector talks to.
    fn hosting_service(&self) -> HostingService;

    /// The open proposal from `branch` into `parent`, if any.
    async fn load_proposal_info(
        &self,
        branch: &str,
        parent: &str,
    ) -> Result<Option<ProposalInfo>, EngineError>;

    /// Squash-merge the proposal, returning the merge commit SHA.
    async fn squash_merge_proposal(
        &self,
        number: u64,
        commit_message: &str,
    ) -> Result<String, EngineError>;

    /// The URL at which the user can open a new proposal.
    fn new_proposal_url(&self, branch: &str, parent: &str) -> String;
}

/// Create the connector for this repository, if its origin is recognized.
pub fn new_connector(
    config: &ProjectConfig,
    origin_url: Option<&str>,
    printer: ActionPrinter,
) -> Result<Option<Box<dyn Connector>>, EngineError> {
    let origin = match origin_url.and_then(OriginUrl::parse) {
        Some(origin) => origin,
        None => return Ok(None),
    };
    let service = detect_hosting_service(config, &origin)?;
    match service {
        HostingService::Github => Ok(Some(Box::new(github::GithubConnector::new(
            origin,
            config.token_for(HostingService::Github),
            printer,
        )))),
        // Recognized but unsupported services fall back to no connector;
        // ship then uses the local squash-merge path.
        _ => Ok(None),
    }
}

/// The hosting service for the given origin: the configured override wins,
/// then hostname matching (honoring the origin-hostname override).
pub fn detect_hosting_service(
    config: &ProjectConfig,
    origin: &OriginUrl,
) -> Result<HostingService, EngineError> {
    let configured = config.hosting_service()?;
    if configured != HostingService::None {
        return Ok(configured);
    }
    // The origin-hostname override maps a self-hosted domain onto the
    // service it actually runs.
    let override_host = config.origin_hostname_override();
    let hostname = override_host.as_deref().unwrap_or(origin.host.as_str());
    for service in [
        HostingService::Github,
        HostingService::Gitlab,
        HostingService::Gitea,
        HostingService::Bitbucket,
    ] {
        if Some(hostname) == service.default_hostname() {
            return Ok(service);
        }
    }
    Ok(HostingService::None)
}
