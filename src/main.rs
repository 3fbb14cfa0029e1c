use clap::{CommandFactory, Parser, Subcommand};
use tracing::{debug, error, trace};

use towline::commands::{self, rename_branch, resume, ship, sync};
use towline::dialog::TerminalDialog;
use towline::repo::Repo;
use towline::subprocess::SubprocessManager;
use towline::EngineError;

/// High-level, resumable Git workflow automation
#[derive(Parser)]
#[command(name = "towline")]
#[command(about = "towline - transactional Git branch workflows", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the current branch with all relevant changes
    Sync {
        /// Sync all local branches
        #[arg(long)]
        all: bool,

        /// Print the Git commands but don't run them
        #[arg(long)]
        dry_run: bool,
    },
    /// Deliver a completed feature branch
    Ship {
        /// Branch to ship (defaults to the current branch)
        branch: Option<String>,

        /// Commit message for the squash commit
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
    },
    /// Rename a branch both locally and on origin
    RenameBranch {
        /// [<old_branch_name>] <new_branch_name>
        #[arg(value_name = "BRANCH", num_args = 1..=2, required = true)]
        branches: Vec<String>,

        /// Force the rename of a perennial branch
        #[arg(long)]
        force: bool,
    },
    /// Restart the last run command after having resolved conflicts
    Continue,
    /// Abort the last run command
    Abort,
    /// Restart the last run command by skipping the current branch
    Skip,
    /// Undo the last run command
    Undo,
    /// Display or update the configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Display or set the main development branch
    MainBranch { name: Option<String> },
    /// Display or set the perennial branches
    PerennialBranches { names: Vec<String> },
    /// Display or set the sync strategy
    SyncStrategy {
        #[arg(long)]
        global: bool,
        value: Option<String>,
    },
    /// Display or set the pull branch strategy
    PullBranchStrategy { value: Option<String> },
    /// Display or set whether Git's pre-push hook runs
    PushHook {
        #[arg(long)]
        global: bool,
        value: Option<String>,
    },
    /// Display or set whether new branches get pushed on creation
    PushNewBranches {
        #[arg(long)]
        global: bool,
        value: Option<String>,
    },
    /// Display or set offline mode
    Offline { value: Option<String> },
    /// Remove all configuration and any saved command state
    Reset,
}

/// Determine the log level based on verbosity count
fn get_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize the tracing subscriber with the appropriate settings
fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(get_log_level(verbose))
        .with_target(verbose >= 2)
        .init();

    debug!("towline started with verbosity level: {}", verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
}

async fn execute_command(command: Option<Commands>) -> towline::Result<()> {
    let Some(command) = command else {
        let mut cmd = Cli::command();
        let _ = cmd.print_help();
        println!();
        return Ok(());
    };

    let subprocess = SubprocessManager::production();
    let mut repo = Repo::new(&subprocess).await;
    let dialog = TerminalDialog;

    commands::ensure_is_repository(&repo).await?;
    match command {
        Commands::Sync { all, dry_run } => {
            commands::ensure_is_configured(&repo)?;
            sync::sync(&mut repo, &dialog, sync::SyncOptions { all, dry_run }).await
        }
        Commands::Ship { branch, message } => {
            commands::ensure_is_configured(&repo)?;
            ship::ship(&mut repo, &dialog, ship::ShipOptions { branch, message }).await
        }
        Commands::RenameBranch { mut branches, force } => {
            commands::ensure_is_configured(&repo)?;
            let new_branch = branches.pop().expect("clap enforces at least one arg");
            rename_branch::rename_branch(
                &mut repo,
                &dialog,
                rename_branch::RenameBranchOptions {
                    old_branch: branches.pop(),
                    new_branch,
                    force,
                },
            )
            .await
        }
        Commands::Continue => {
            commands::ensure_is_configured(&repo)?;
            resume::continue_command(&mut repo, &dialog).await
        }
        Commands::Abort => {
            commands::ensure_is_configured(&repo)?;
            resume::abort_command(&mut repo, &dialog).await
        }
        Commands::Skip => {
            commands::ensure_is_configured(&repo)?;
            resume::skip_command(&mut repo, &dialog).await
        }
        Commands::Undo => {
            commands::ensure_is_configured(&repo)?;
            resume::undo_command(&mut repo, &dialog).await
        }
        Commands::Config { command } => run_config_command(&mut repo, command).await,
    }
}

async fn run_config_command(
    repo: &mut Repo,
    command: Option<ConfigCommands>,
) -> towline::Result<()> {
    use towline::commands::config_cmds;

    match command {
        None => config_cmds::show_config(repo),
        Some(ConfigCommands::MainBranch { name }) => {
            config_cmds::main_branch_command(repo, name).await
        }
        Some(ConfigCommands::PerennialBranches { names }) => {
            config_cmds::perennial_branches_command(repo, names).await
        }
        Some(ConfigCommands::SyncStrategy { global, value }) => {
            config_cmds::sync_strategy_command(repo, global, value).await
        }
        Some(ConfigCommands::PullBranchStrategy { value }) => {
            config_cmds::pull_branch_strategy_command(repo, value).await
        }
        Some(ConfigCommands::PushHook { global, value }) => {
            config_cmds::push_hook_command(repo, global, value).await
        }
        Some(ConfigCommands::PushNewBranches { global, value }) => {
            config_cmds::push_new_branches_command(repo, global, value).await
        }
        Some(ConfigCommands::Offline { value }) => {
            config_cmds::offline_command(repo, value).await
        }
        Some(ConfigCommands::Reset) => config_cmds::reset_command(repo).await,
    }
}

/// Handle fatal errors and exit with the appropriate status code
fn handle_fatal_error(error: EngineError) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");
    std::process::exit(1)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(error) = execute_command(cli.command).await {
        handle_fatal_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_log_level() {
        assert_eq!(get_log_level(0), "warn");
        assert_eq!(get_log_level(1), "debug");
        assert_eq!(get_log_level(2), "trace");
        assert_eq!(get_log_level(10), "trace");
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["towline", "sync", "--all"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Sync {
                all: true,
                dry_run: false
            })
        ));

        let cli = Cli::try_parse_from(["towline", "ship", "feature", "-m", "done"]).unwrap();
        match cli.command {
            Some(Commands::Ship { branch, message }) => {
                assert_eq!(branch.as_deref(), Some("feature"));
                assert_eq!(message.as_deref(), Some("done"));
            }
            _ => panic!("expected ship command"),
        }

        let cli = Cli::try_parse_from(["towline", "rename-branch", "old", "new"]).unwrap();
        match cli.command {
            Some(Commands::RenameBranch { branches, force }) => {
                assert_eq!(branches, vec!["old".to_string(), "new".to_string()]);
                assert!(!force);
            }
            _ => panic!("expected rename-branch command"),
        }
    }

    #[test]
    fn test_rename_branch_accepts_one_or_two_names() {
        let cli = Cli::try_parse_from(["towline", "rename-branch", "new"]).unwrap();
        match cli.command {
            Some(Commands::RenameBranch { branches, .. }) => {
                assert_eq!(branches, vec!["new".to_string()]);
            }
            _ => panic!("expected rename-branch command"),
        }

        assert!(Cli::try_parse_from(["towline", "rename-branch"]).is_err());
    }
}
