use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tasktrack_shared::{DEFAULT_CATEGORY, STATUS_ALL, TaskFilter, TaskId, TaskPriority};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Arguments with positional `rc.*` overrides split out.
#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => Ok(Self {
                key: key.trim().to_owned(),
                value: value.trim().to_owned(),
            }),
            _ => Err(anyhow!("--rc expects KEY=VALUE, got {s:?}")),
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tt",
    version,
    about = "Task tracker client for a remote task store",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "trackrc")]
    pub trackrc: Option<PathBuf>,

    /// Store API root, e.g. http://localhost:5001/api
    #[arg(long = "api-url")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Add a new task
    Add {
        description: String,
        #[arg(short = 'p', long = "priority", default_value = "medium")]
        priority: TaskPriority,
        #[arg(short = 'c', long = "category", default_value = DEFAULT_CATEGORY)]
        category: String,
    },
    /// List tasks, optionally filtered
    List {
        #[arg(short = 's', long = "status", default_value = STATUS_ALL)]
        status: String,
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
        #[arg(short = 'p', long = "priority")]
        priority: Option<String>,
    },
    /// Mark a task as completed
    Complete { id: TaskId },
    /// Delete a task
    Delete { id: TaskId },
    /// Change a task's description, priority or category
    Update {
        id: TaskId,
        #[arg(short = 'd', long = "description")]
        description: Option<String>,
        #[arg(short = 'p', long = "priority")]
        priority: Option<TaskPriority>,
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
    },
    /// Show task statistics
    Stats,
    /// Remove all completed tasks
    Clear {
        /// Skip the confirmation prompt
        #[arg(short = 'f', long = "force")]
        force: bool,
    },
    /// Check that the store is reachable
    Health,
}

impl Default for CliCommand {
    fn default() -> Self {
        CliCommand::List {
            status: STATUS_ALL.to_string(),
            category: None,
            priority: None,
        }
    }
}

impl CliCommand {
    /// Filter for `list`; `None` for every other command.
    pub fn list_filter(&self) -> Option<TaskFilter> {
        let CliCommand::List {
            status,
            category,
            priority,
        } = self
        else {
            return None;
        };
        Some(
            TaskFilter::default()
                .with_status(status.clone())
                .with_category(category.clone().unwrap_or_default())
                .with_priority(priority.clone().unwrap_or_default()),
        )
    }
}

/// Log level when `RUST_LOG` is unset. Each `-q` or `-v` moves one step
/// away from `warn`.
fn default_log_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    }
}

/// Logs go to stderr so command output on stdout stays clean.
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let level = default_log_level(verbose, quiet);
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .map_err(|e| anyhow!("invalid RUST_LOG value {directives:?}: {e}"))?,
        _ => EnvFilter::new(format!("tasktrack_core={level},{level}")),
    };

    let stderr_is_tty = std::io::stderr().is_terminal();
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(stderr_is_tty)
        .with_target(verbose >= 2)
        .try_init()
    {
        debug!(error = %err, "global subscriber was installed earlier");
    }

    Ok(())
}

/// Splits `rc.key=value` or `rc.key:value` into its key (prefix kept) and
/// value.
fn rc_override(arg: &str) -> Option<(String, String)> {
    let rest = arg.strip_prefix("rc.")?;
    let (key, value) = rest.split_once(['=', ':'])?;
    if key.is_empty() {
        return None;
    }
    Some((format!("rc.{key}"), value.to_string()))
}

/// Moves positional rc overrides out of the argument list so clap never
/// sees them. The program name is kept in place.
#[tracing::instrument(skip_all, fields(args = raw.len()))]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let (program, rest) = raw
        .split_first()
        .ok_or_else(|| anyhow!("argument list is missing the program name"))?;

    let mut cleaned_args = vec![program.clone()];
    let mut rc_overrides = Vec::new();
    for arg in rest {
        match arg.to_str().and_then(rc_override) {
            Some((key, value)) => {
                debug!(%key, %value, "positional rc override");
                rc_overrides.push((key, value));
            }
            None => cleaned_args.push(arg.clone()),
        }
    }

    Ok(PreprocessedArgs {
        cleaned_args,
        rc_overrides,
    })
}
