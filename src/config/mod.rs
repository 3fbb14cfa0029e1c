//! Typed settings over Git's own configuration.
//!
//! All engine settings live in `git config` under the `towline.*` namespace,
//! with branch lineage under `towline-branch.<name>.parent`. The store
//! caches both configuration scopes per command invocation; setters write
//! the store and the cache (see [`store::GitConfigStore`]).

pub mod hosting_service;
pub mod store;
pub mod strategy;

pub use hosting_service::HostingService;
pub use store::{ConfigScope, GitConfigStore};
pub use strategy::{PullBranchStrategy, SyncStrategy};

use crate::lineage::Lineage;
use crate::subprocess::ProcessRunner;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Configuration keys. The exact strings are an implementation choice but
/// stable across versions.
pub mod keys {
    pub const MAIN_BRANCH: &str = "towline.main-branch-name";
    pub const PERENNIAL_BRANCHES: &str = "towline.perennial-branch-names";
    pub const SYNC_STRATEGY: &str = "towline.sync-strategy";
    pub const PULL_BRANCH_STRATEGY: &str = "towline.pull-branch-strategy";
    pub const PUSH_HOOK: &str = "towline.push-hook";
    pub const PUSH_NEW_BRANCHES: &str = "towline.push-new-branches";
    pub const SHIP_DELETE_REMOTE_BRANCH: &str = "towline.ship-delete-remote-branch";
    pub const SYNC_UPSTREAM: &str = "towline.sync-upstream";
    pub const OFFLINE: &str = "towline.offline";
    pub const HOSTING_DRIVER: &str = "towline.code-hosting-driver";
    pub const ORIGIN_HOSTNAME: &str = "towline.code-hosting-origin-hostname";
    pub const GITHUB_TOKEN: &str = "towline.github-token";
    pub const GITLAB_TOKEN: &str = "towline.gitlab-token";
    pub const GITEA_TOKEN: &str = "towline.gitea-token";
    pub const BITBUCKET_TOKEN: &str = "towline.bitbucket-token";

    pub const BRANCH_PREFIX: &str = "towline-branch.";
    pub const PARENT_SUFFIX: &str = ".parent";

    /// The lineage key for a branch.
    pub fn parent_key(branch: &str) -> String {
        format!("{BRANCH_PREFIX}{branch}{PARENT_SUFFIX}")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown sync strategy: {0:?}")]
    UnknownSyncStrategy(String),

    #[error("unknown pull branch strategy: {0:?}")]
    UnknownPullBranchStrategy(String),

    #[error("unknown hosting service: {0:?}")]
    UnknownHostingService(String),

    #[error("invalid boolean value for {key}: {value:?}")]
    InvalidBool { key: String, value: String },

    #[error(transparent)]
    Git(#[from] crate::git::GitError),
}

/// Parse Git's boolean vocabulary.
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// The engine's typed view of the repository configuration.
pub struct ProjectConfig {
    store: GitConfigStore,
}

impl ProjectConfig {
    pub async fn load(runner: Arc<dyn ProcessRunner>, workdir: Option<&Path>) -> Self {
        Self {
            store: GitConfigStore::load(runner, workdir).await,
        }
    }

    pub fn from_store(store: GitConfigStore) -> Self {
        Self { store }
    }

    pub async fn reload(&mut self) {
        self.store.reload().await;
    }

    fn bool_value(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.store.local_or_global_value(key) {
            None | Some("") => Ok(default),
            Some(value) => parse_bool(value).ok_or_else(|| ConfigError::InvalidBool {
                key: key.to_string(),
                value: value.to_string(),
            }),
        }
    }

    // ---------- branch roles ----------

    /// The configured main branch, or empty when not configured.
    pub fn main_branch(&self) -> String {
        self.store
            .local_or_global_value(keys::MAIN_BRANCH)
            .unwrap_or_default()
            .to_string()
    }

    pub async fn set_main_branch(&mut self, name: &str) -> Result<(), ConfigError> {
        self.store
            .set(ConfigScope::Local, keys::MAIN_BRANCH, name)
            .await
    }

    pub fn perennial_branches(&self) -> Vec<String> {
        self.store
            .local_or_global_value(keys::PERENNIAL_BRANCHES)
            .unwrap_or_default()
            .split_whitespace()
            .map(|branch| branch.to_string())
            .collect()
    }

    pub async fn set_perennial_branches(&mut self, branches: &[String]) -> Result<(), ConfigError> {
        self.store
            .set(
                ConfigScope::Local,
                keys::PERENNIAL_BRANCHES,
                &branches.join(" "),
            )
            .await
    }

    pub async fn add_perennial_branch(&mut self, branch: &str) -> Result<(), ConfigError> {
        let mut branches = self.perennial_branches();
        if !branches.iter().any(|existing| existing == branch) {
            branches.push(branch.to_string());
        }
        self.set_perennial_branches(&branches).await
    }

    pub async fn remove_perennial_branch(&mut self, branch: &str) -> Result<(), ConfigError> {
        let branches: Vec<String> = self
            .perennial_branches()
            .into_iter()
            .filter(|existing| existing != branch)
            .collect();
        self.set_perennial_branches(&branches).await
    }

    pub fn is_main_branch(&self, branch: &str) -> bool {
        branch == self.main_branch()
    }

    pub fn is_perennial_branch(&self, branch: &str) -> bool {
        self.perennial_branches()
            .iter()
            .any(|perennial| perennial == branch)
    }

    /// Feature branches are everything that is neither main nor perennial.
    pub fn is_feature_branch(&self, branch: &str) -> bool {
        !self.is_main_branch(branch) && !self.is_perennial_branch(branch)
    }

    // ---------- strategies ----------

    pub fn sync_strategy(&self) -> Result<SyncStrategy, ConfigError> {
        SyncStrategy::parse(
            self.store
                .local_or_global_value(keys::SYNC_STRATEGY)
                .unwrap_or_default(),
        )
    }

    pub fn sync_strategy_global(&self) -> Result<SyncStrategy, ConfigError> {
        SyncStrategy::parse(self.store.global_value(keys::SYNC_STRATEGY).unwrap_or_default())
    }

    pub async fn set_sync_strategy(
        &mut self,
        scope: ConfigScope,
        strategy: SyncStrategy,
    ) -> Result<(), ConfigError> {
        self.store
            .set(scope, keys::SYNC_STRATEGY, &strategy.to_string())
            .await
    }

    pub fn pull_branch_strategy(&self) -> Result<PullBranchStrategy, ConfigError> {
        PullBranchStrategy::parse(
            self.store
                .local_or_global_value(keys::PULL_BRANCH_STRATEGY)
                .unwrap_or_default(),
        )
    }

    pub async fn set_pull_branch_strategy(
        &mut self,
        strategy: PullBranchStrategy,
    ) -> Result<(), ConfigError> {
        self.store
            .set(
                ConfigScope::Local,
                keys::PULL_BRANCH_STRATEGY,
                &strategy.to_string(),
            )
            .await
    }

    // ---------- toggles ----------

    pub fn push_hook(&self) -> Result<bool, ConfigError> {
        self.bool_value(keys::PUSH_HOOK, true)
    }

    pub fn push_hook_global(&self) -> Result<bool, ConfigError> {
        match self.store.global_value(keys::PUSH_HOOK) {
            None | Some("") => Ok(true),
            Some(value) => parse_bool(value).ok_or_else(|| ConfigError::InvalidBool {
                key: keys::PUSH_HOOK.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub async fn set_push_hook(
        &mut self,
        scope: ConfigScope,
        value: bool,
    ) -> Result<(), ConfigError> {
        self.store
            .set(scope, keys::PUSH_HOOK, &value.to_string())
            .await
    }

    pub fn should_push_new_branches(&self) -> Result<bool, ConfigError> {
        self.bool_value(keys::PUSH_NEW_BRANCHES, false)
    }

    pub async fn set_push_new_branches(
        &mut self,
        scope: ConfigScope,
        value: bool,
    ) -> Result<(), ConfigError> {
        self.store
            .set(scope, keys::PUSH_NEW_BRANCHES, &value.to_string())
            .await
    }

    pub fn should_ship_delete_remote_branch(&self) -> Result<bool, ConfigError> {
        self.bool_value(keys::SHIP_DELETE_REMOTE_BRANCH, true)
    }

    pub fn should_sync_upstream(&self) -> Result<bool, ConfigError> {
        self.bool_value(keys::SYNC_UPSTREAM, true)
    }

    pub fn is_offline(&self) -> Result<bool, ConfigError> {
        self.bool_value(keys::OFFLINE, false)
    }

    pub async fn set_offline(&mut self, value: bool) -> Result<(), ConfigError> {
        self.store
            .set(ConfigScope::Global, keys::OFFLINE, &value.to_string())
            .await
    }

    // ---------- hosting ----------

    /// The configured hosting-service override.
    pub fn hosting_service(&self) -> Result<HostingService, ConfigError> {
        HostingService::parse(
            self.store
                .local_or_global_value(keys::HOSTING_DRIVER)
                .unwrap_or_default(),
        )
    }

    pub fn origin_hostname_override(&self) -> Option<String> {
        self.store
            .local_or_global_value(keys::ORIGIN_HOSTNAME)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
    }

    pub fn token_for(&self, service: HostingService) -> Option<String> {
        let key = match service {
            HostingService::Github => keys::GITHUB_TOKEN,
            HostingService::Gitlab => keys::GITLAB_TOKEN,
            HostingService::Gitea => keys::GITEA_TOKEN,
            HostingService::Bitbucket => keys::BITBUCKET_TOKEN,
            HostingService::None => return None,
        };
        self.store
            .local_or_global_value(key)
            .filter(|value| !value.is_empty())
            .map(|value| value.to_string())
    }

    // ---------- lineage ----------

    pub fn parent_branch(&self, branch: &str) -> Option<String> {
        self.store
            .local_value(&keys::parent_key(branch))
            .filter(|parent| !parent.is_empty())
            .map(|parent| parent.to_string())
    }

    pub async fn set_parent_branch(
        &mut self,
        branch: &str,
        parent: &str,
    ) -> Result<(), ConfigError> {
        self.store
            .set(ConfigScope::Local, &keys::parent_key(branch), parent)
            .await
    }

    pub async fn remove_parent_branch(&mut self, branch: &str) -> Result<(), ConfigError> {
        self.store
            .unset(ConfigScope::Local, &keys::parent_key(branch))
            .await
    }

    /// A snapshot of the branch lineage in this repository.
    pub fn lineage(&self) -> Lineage {
        let mut lineage = Lineage::new();
        for (key, value) in self.store.local_entries() {
            if value.is_empty() {
                continue;
            }
            if let Some(branch) = key
                .strip_prefix(keys::BRANCH_PREFIX)
                .and_then(|rest| rest.strip_suffix(keys::PARENT_SUFFIX))
            {
                lineage.set_parent(branch, value);
            }
        }
        lineage
    }

    pub fn child_branches(&self, branch: &str) -> Vec<String> {
        self.lineage().children(branch)
    }

    pub fn ancestor_branches(&self, branch: &str) -> Vec<String> {
        self.lineage().ancestors(branch)
    }

    /// Unlink every lineage entry whose child or parent is no longer among
    /// the given branches.
    pub async fn remove_outdated_configuration(
        &mut self,
        existing_branches: &[String],
    ) -> Result<(), ConfigError> {
        for (child, parent) in self.lineage().entries() {
            let has_child = existing_branches.contains(&child);
            let has_parent = existing_branches.contains(&parent);
            if !has_child || !has_parent {
                self.remove_parent_branch(&child).await?;
            }
        }
        Ok(())
    }

    /// Remove every engine setting from the local scope.
    pub async fn reset(&mut self) -> Result<(), ConfigError> {
        let towline_keys: Vec<String> = self
            .store
            .local_entries()
            .map(|(key, _)| key.to_string())
            .filter(|key| key.starts_with("towline.") || key.starts_with(keys::BRANCH_PREFIX))
            .collect();
        for key in towline_keys {
            self.store.unset(ConfigScope::Local, &key).await?;
        }
        Ok(())
    }
}
