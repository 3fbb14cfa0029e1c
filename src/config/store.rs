//! The backing key/value store: Git's own configuration, in two scopes.

use crate::git::parsers::parse_config_list;
use crate::subprocess::{ProcessCommandBuilder, ProcessRunner};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ConfigError;

/// Which configuration scope a read or write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Local,
    Global,
}

/// A cache of the local and global Git configuration.
///
/// Both scopes are loaded once per command so a command invocation reads
/// coherent values. Setters write the underlying store and the cache.
pub struct GitConfigStore {
    runner: Arc<dyn ProcessRunner>,
    workdir: Option<PathBuf>,
    local: HashMap<String, String>,
    global: HashMap<String, String>,
}

impl GitConfigStore {
    /// Load both configuration scopes. A missing or empty scope yields an
    /// empty cache, not an error (`git config -l` fails on fresh repos).
    pub async fn load(runner: Arc<dyn ProcessRunner>, workdir: Option<&Path>) -> Self {
        let mut store = Self {
            runner,
            workdir: workdir.map(|dir| dir.to_path_buf()),
            local: HashMap::new(),
            global: HashMap::new(),
        };
        store.reload().await;
        store
    }

    /// Refresh both cached scopes from the repository.
    pub async fn reload(&mut self) {
        self.local = self.read_scope(ConfigScope::Local).await;
        self.global = self.read_scope(ConfigScope::Global).await;
    }

    async fn read_scope(&self, scope: ConfigScope) -> HashMap<String, String> {
        let scope_flag = match scope {
            ConfigScope::Local => "--local",
            ConfigScope::Global => "--global",
        };
        let mut builder = ProcessCommandBuilder::new("git").args(["config", "-lz", scope_flag]);
        if let Some(dir) = &self.workdir {
            builder = builder.current_dir(dir);
        }
        match self.runner.run(builder.build()).await {
            Ok(output) if output.status.success() => {
                parse_config_list(&output.stdout).into_iter().collect()
            }
            _ => HashMap::new(),
        }
    }

    pub fn local_value(&self, key: &str) -> Option<&str> {
        self.local.get(key).map(|value| value.as_str())
    }

    pub fn global_value(&self, key: &str) -> Option<&str> {
        self.global.get(key).map(|value| value.as_str())
    }

    /// Local configuration takes precedence over global.
    pub fn local_or_global_value(&self, key: &str) -> Option<&str> {
        self.local_value(key).or_else(|| self.global_value(key))
    }

    /// All keys and values of the local scope.
    pub fn local_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.local
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub async fn set(
        &mut self,
        scope: ConfigScope,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let mut args = vec!["config"];
        if scope == ConfigScope::Global {
            args.push("--global");
        }
        args.push(key);
        args.push(value);
        self.run_write(&args).await?;
        let cache = match scope {
            ConfigScope::Local => &mut self.local,
            ConfigScope::Global => &mut self.global,
        };
        cache.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub async fn unset(&mut self, scope: ConfigScope, key: &str) -> Result<(), ConfigError> {
        let cache = match scope {
            ConfigScope::Local => &mut self.local,
            ConfigScope::Global => &mut self.global,
        };
        if cache.remove(key).is_none() {
            return Ok(());
        }
        let mut args = vec!["config"];
        if scope == ConfigScope::Global {
            args.push("--global");
        }
        args.push("--unset");
        args.push(key);
        self.run_write(&args).await
    }

    async fn run_write(&self, args: &[&str]) -> Result<(), ConfigError> {
        let mut builder = ProcessCommandBuilder::new("git").args(args);
        if let Some(dir) = &self.workdir {
            builder = builder.current_dir(dir);
        }
        let output = self
            .runner
            .run(builder.build())
            .await
            .map_err(crate::git::GitError::from)?;
        if !output.status.success() {
            return Err(crate::git::GitError::failed(args, &output.stderr).into());
        }
        Ok(())
    }
}
