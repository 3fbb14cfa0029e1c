//! The `config` command family: display and update engine settings.

use crate::config::{ConfigScope, PullBranchStrategy, SyncStrategy};
use crate::error::EngineError;
use crate::repo::Repo;
use crate::runstate;
use crate::Result;

/// Print a summary of the current configuration.
pub fn show_config(repo: &Repo) -> Result<()> {
    let config = &repo.config;
    let main_branch = config.main_branch();
    let perennials = config.perennial_branches();
    println!("main branch: {}", display_or_unset(&main_branch));
    println!(
        "perennial branches: {}",
        display_or_unset(&perennials.join(", "))
    );
    println!("sync strategy: {}", config.sync_strategy()?);
    println!("pull branch strategy: {}", config.pull_branch_strategy()?);
    println!("push hook: {}", config.push_hook()?);
    println!("push new branches: {}", config.should_push_new_branches()?);
    println!(
        "ship deletes the remote branch: {}",
        config.should_ship_delete_remote_branch()?
    );
    println!("sync with upstream: {}", config.should_sync_upstream()?);
    println!("offline: {}", config.is_offline()?);
    let lineage = config.lineage();
    if !lineage.is_empty() {
        println!("branch lineage:");
        for (child, parent) in lineage.entries() {
            println!("  {child} => {parent}");
        }
    }
    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

fn scope(global: bool) -> ConfigScope {
    if global {
        ConfigScope::Global
    } else {
        ConfigScope::Local
    }
}

pub async fn sync_strategy_command(
    repo: &mut Repo,
    global: bool,
    value: Option<String>,
) -> Result<()> {
    match value {
        None => {
            let strategy = if global {
                repo.config.sync_strategy_global()?
            } else {
                repo.config.sync_strategy()?
            };
            println!("{strategy}");
        }
        Some(value) => {
            let strategy = SyncStrategy::parse(&value)?;
            repo.config.set_sync_strategy(scope(global), strategy).await?;
        }
    }
    Ok(())
}

pub async fn pull_branch_strategy_command(repo: &mut Repo, value: Option<String>) -> Result<()> {
    match value {
        None => println!("{}", repo.config.pull_branch_strategy()?),
        Some(value) => {
            let strategy = PullBranchStrategy::parse(&value)?;
            repo.config.set_pull_branch_strategy(strategy).await?;
        }
    }
    Ok(())
}

pub async fn push_hook_command(repo: &mut Repo, global: bool, value: Option<String>) -> Result<()> {
    match value {
        None => {
            let enabled = if global {
                repo.config.push_hook_global()?
            } else {
                repo.config.push_hook()?
            };
            println!("{}", format_bool(enabled));
        }
        Some(value) => {
            let enabled = parse_user_bool(&value)?;
            repo.config.set_push_hook(scope(global), enabled).await?;
        }
    }
    Ok(())
}

pub async fn push_new_branches_command(
    repo: &mut Repo,
    global: bool,
    value: Option<String>,
) -> Result<()> {
    match value {
        None => println!("{}", format_bool(repo.config.should_push_new_branches()?)),
        Some(value) => {
            let enabled = parse_user_bool(&value)?;
            repo.config
                .set_push_new_branches(scope(global), enabled)
                .await?;
        }
    }
    Ok(())
}

pub async fn offline_command(repo: &mut Repo, value: Option<String>) -> Result<()> {
    match value {
        None => println!("{}", format_bool(repo.config.is_offline()?)),
        Some(value) => {
            let enabled = parse_user_bool(&value)?;
            repo.config.set_offline(enabled).await?;
        }
    }
    Ok(())
}

pub async fn main_branch_command(repo: &mut Repo, value: Option<String>) -> Result<()> {
    match value {
        None => println!("{}", display_or_unset(&repo.config.main_branch())),
        Some(name) => {
            if !repo.git.has_local_branch(&name).await? {
                return Err(EngineError::Precondition(format!(
                    "there is no branch named {name:?}"
                )));
            }
            repo.config.set_main_branch(&name).await?;
        }
    }
    Ok(())
}

pub async fn perennial_branches_command(repo: &mut Repo, values: Vec<String>) -> Result<()> {
    if values.is_empty() {
        println!(
            "{}",
            display_or_unset(&repo.config.perennial_branches().join(", "))
        );
        return Ok(());
    }
    for name in &values {
        if !repo.git.has_local_branch(name).await? {
            return Err(EngineError::Precondition(format!(
                "there is no branch named {name:?}"
            )));
        }
    }
    repo.config.set_perennial_branches(&values).await?;
    Ok(())
}

/// Remove all engine configuration and the persisted run state.
pub async fn reset_command(repo: &mut Repo) -> Result<()> {
    repo.config.reset().await?;
    let git_dir = repo.git.git_dir().await?;
    runstate::delete(&git_dir).await?;
    Ok(())
}

fn format_bool(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn parse_user_bool(text: &str) -> Result<bool> {
    crate::config::parse_bool(text).ok_or_else(|| {
        EngineError::Precondition(format!(
            "invalid argument: {text:?}; please provide either \"yes\" or \"no\""
        ))
    })
}
