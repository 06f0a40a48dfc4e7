//! CLI command definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for quorum-tree
#[derive(Parser, Debug)]
#[command(name = "quorum-tree")]
#[command(author, version, about = "Agent trees that decide every step by multi-model quorum")]
#[command(long_about = r#"
quorum-tree runs a tree of agents. Every step an agent takes (wait, spawn a
child, send a message, execute an action, finish) is chosen by querying
several models in parallel and accepting the action a quorum agrees on.

Configuration files are loaded from (in priority order):
1. QUORUM_TREE_* environment variables
2. --config <path>                        Explicit config file
3. ./quorum-tree.toml                     Project-level config
4. ~/.config/quorum-tree/config.toml      Global config

Example:
  quorum-tree run --task "Summarize the repo" --script replies.json
  quorum-tree run -t "Plan a trip" -s replies.json -m a -m b -m c --timeout 30
  quorum-tree config
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Also write diagnostic logs to a daily rolling file in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a root agent on a task against a scripted model backend
    Run(RunArgs),
    /// Show configuration sources and the resolved configuration
    Config,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Task handed to the root agent
    #[arg(short, long)]
    pub task: String,

    /// JSON file with scripted model replies
    #[arg(short, long, value_name = "PATH")]
    pub script: PathBuf,

    /// Models queried by the root agent (can be specified multiple times)
    #[arg(short, long = "model", value_name = "MODEL")]
    pub models: Vec<String>,

    /// Id of the root agent
    #[arg(long, default_value = "root")]
    pub agent_id: String,

    /// Stop the tree after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Write a JSONL transcript of rounds and actions to this file
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Only print messages and errors
    #[arg(short, long)]
    pub quiet: bool,
}
