//! Run-state persistence.
//!
//! One JSON file per repository, inside the `.git` directory so it never
//! enters the working tree's history. The file doubles as the lock that
//! keeps other mutating commands out while a command is unfinished.

use std::path::{Path, PathBuf};

use super::RunState;
use crate::Result;

const RUNSTATE_FILE: &str = "towline-runstate.json";

/// Where the run state of the repository with the given `.git` dir lives.
pub fn runstate_path(git_dir: &Path) -> PathBuf {
    git_dir.join(RUNSTATE_FILE)
}

pub async fn save(run_state: &RunState, git_dir: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(run_state)?;
    tokio::fs::write(runstate_path(git_dir), json).await?;
    Ok(())
}

pub async fn load(git_dir: &Path) -> Result<Option<RunState>> {
    let path = runstate_path(git_dir);
    let json = match tokio::fs::read_to_string(&path).await {
        Ok(json) => json,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_str(&json)?))
}

pub async fn delete(git_dir: &Path) -> Result<()> {
    match tokio::fs::remove_file(runstate_path(git_dir)).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
