//! GitHub connector: proposal lookup and squash-merge via the REST API.

use async_trait::async_trait;
use serde::Deserialize;

use super::{ActionPrinter, Connector, OriginUrl, ProposalInfo};
use crate::config::HostingService;
use crate::error::EngineError;

const API_ROOT: &str = "https://api.github.com";

pub struct GithubConnector {
    client: reqwest::Client,
    origin: OriginUrl,
    token: Option<String>,
    printer: ActionPrinter,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    number: u64,
    title: String,
    mergeable_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MergeResponse {
    sha: String,
}

impl GithubConnector {
    pub fn new(origin: OriginUrl, token: Option<String>, printer: ActionPrinter) -> Self {
        Self {
            client: reqwest::Client::new(),
            origin,
            token,
            printer,
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "towline");
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!("{API_ROOT}/repos/{}{suffix}", self.origin.path)
    }
}

#[async_trait]
impl Connector for GithubConnector {
    fn hosting_service(&self) -> HostingService {
        HostingService::Github
    }

    async fn load_proposal_info(
        &self,
        branch: &str,
        parent: &str,
    ) -> Result<Option<ProposalInfo>, EngineError> {
        let url = self.repo_url(&format!(
            "/pulls?state=open&head={}:{branch}&base={parent}",
            self.origin.owner()
        ));
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|err| EngineError::Hosting(err.to_string()))?;
        if !response.status().is_success() {
            return Err(EngineError::Hosting(format!(
                "GitHub API returned {} for {url}",
                response.status()
            )));
        }
        let pulls: Vec<PullRequest> = response
            .json()
            .await
            .map_err(|err| EngineError::Hosting(err.to_string()))?;
        let Some(pull) = pulls.first() else {
            return Ok(None);
        };
        let can_merge = pulls.len() == 1
            && self.token.is_some()
            && pull.mergeable_state.as_deref() != Some("dirty");
        Ok(Some(ProposalInfo {
            can_merge_with_api: can_merge,
            default_proposal_message: format!("{} (#{})", pull.title, pull.number),
            number: pull.number,
        }))
    }

    async fn squash_merge_proposal(
        &self,
        number: u64,
        commit_message: &str,
    ) -> Result<String, EngineError> {
        (self.printer)(&format!("GitHub: merging PR #{number}"));
        let (title, body) = match commit_message.split_once("\n\n") {
            Some((title, body)) => (title.to_string(), body.to_string()),
            None => (commit_message.trim_end().to_string(), String::new()),
        };
        let url = self.repo_url(&format!("/pulls/{number}/merge"));
        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(&serde_json::json!({
                "merge_method": "squash",
                "commit_title": title,
                "commit_message": body,
            }))
            .send()
            .await
            .map_err(|err| EngineError::Hosting(err.to_string()))?;
        if !response.status().is_success() {
            return Err(EngineError::Hosting(format!(
                "GitHub API could not merge PR #{number}: {}",
                response.status()
            )));
        }
        let merge: MergeResponse = response
            .json()
            .await
            .map_err(|err| EngineError::Hosting(err.to_string()))?;
        Ok(merge.sha)
    }

    fn new_proposal_url(&self, branch: &str, parent: &str) -> String {
        format!(
            "https://{}/{}/compare/{parent}...{branch}?expand=1",
            self.origin.host, self.origin.path
        )
    }
}
