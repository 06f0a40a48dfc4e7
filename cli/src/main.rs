//! CLI entrypoint for quorum-tree
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod logging;
mod printer;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use commands::{Cli, Command, RunArgs};
use quorum_application::{AgentHandle, ConversationLogger, Injected, MessageBus, Supervisor};
use quorum_domain::events::{logs_topic, messages_topic, state_topic};
use quorum_domain::{AgentId, BusEvent};
use quorum_infrastructure::{
    ConfigLoader, FileConfig, InMemoryRegistry, JsonlConversationLogger, LocalBroadcaster,
    Script, ScriptedModelGateway,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };

    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| file_config.logging.log_dir.clone());
    let _log_guard = logging::init(cli.verbose, log_dir.as_deref());

    match cli.command {
        Command::Config => {
            print_config(&file_config, cli.config.as_deref())?;
            Ok(())
        }
        Command::Run(args) => run(args, file_config).await,
    }
}

fn print_config(config: &FileConfig, explicit: Option<&Path>) -> Result<()> {
    println!("Configuration sources (in priority order):");
    for source in ConfigLoader::sources(explicit) {
        let mark = if source.found {
            "[FOUND]".green()
        } else {
            "[     ]".dimmed()
        };
        println!("  {} {:<8} {}", mark, format!("{}:", source.label), source.location);
    }

    println!();
    println!("{}", "Resolved configuration:".bold());
    println!("{}", toml::to_string_pretty(config)?);

    for error in config.validate() {
        println!("{} {}", "warning:".yellow().bold(), error);
    }
    Ok(())
}

async fn run(args: RunArgs, file_config: FileConfig) -> Result<()> {
    let errors = file_config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }

    let script = Script::from_file(&args.script)?;
    let mut config = file_config
        .to_agent_config()
        .with_agent_id(args.agent_id.as_str())
        .with_prompt(args.task.clone());
    if !args.models.is_empty() {
        config = config.with_models(args.models.iter().map(String::as_str));
    } else if config.models.is_none() {
        config = config.with_models(script.model_ids());
    }
    let models = config.models.clone().unwrap_or_default();
    if models.is_empty() {
        bail!("No models configured. Use -m, [agent].models, or name models in the script.");
    }

    // === Dependency Injection ===
    let bus = Arc::new(LocalBroadcaster::new());
    let registry = Arc::new(InMemoryRegistry::new());
    let gateway = Arc::new(ScriptedModelGateway::new(script));
    let mut injected = Injected::new()
        .with_pubsub(bus.clone())
        .with_registry(registry.clone())
        .with_gateway(gateway);

    let log_path = args
        .conversation_log
        .clone()
        .or_else(|| file_config.logging.conversation_log.clone());
    if let Some(path) = log_path {
        match JsonlConversationLogger::new(&path) {
            Some(logger) => {
                info!("Writing conversation log to {}", logger.path().display());
                let logger: Arc<dyn ConversationLogger> = Arc::new(logger);
                injected = injected.with_logger(logger);
            }
            None => warn!("Conversation log disabled: cannot open {}", path.display()),
        }
    }

    if !args.quiet {
        println!();
        println!("{} {}", "Task:".bold(), args.task);
        println!(
            "{} {}",
            "Models:".bold(),
            models
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!();
    }

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let root_id = AgentId::new(args.agent_id.as_str());
    let mut watched = HashSet::new();
    watch_agent(&bus, &root_id, &events_tx, &mut watched);

    let supervisor = Supervisor::new();
    let root = supervisor.start_agent(config, &injected).await?;

    let deadline = async {
        match args.timeout {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let outcome = loop {
        tokio::select! {
            _ = root.closed() => break Outcome::Finished,
            _ = tokio::signal::ctrl_c() => break Outcome::Interrupted,
            _ = &mut deadline => break Outcome::TimedOut,
            Some(event) = events_rx.recv() => {
                if let BusEvent::StateUpdate { children, .. } = &event {
                    for child in children {
                        watch_agent(&bus, child, &events_tx, &mut watched);
                    }
                }
                if let Some(line) = printer::format_event(&event, args.quiet) {
                    println!("{}", line);
                }
            }
        }
    };

    shutdown(&supervisor, &root).await;
    while let Ok(event) = events_rx.try_recv() {
        if let Some(line) = printer::format_event(&event, args.quiet) {
            println!("{}", line);
        }
    }

    println!();
    match outcome {
        Outcome::Finished => println!("{} root agent {} stopped", "done:".green().bold(), root_id),
        Outcome::Interrupted => println!("{} interrupted", "stopped:".yellow().bold()),
        Outcome::TimedOut => println!("{} timed out", "stopped:".yellow().bold()),
    }
    Ok(())
}

/// Why the run loop ended.
enum Outcome {
    Finished,
    Interrupted,
    TimedOut,
}

/// Forward the three topics of `agent_id` into `tx`, once per agent.
fn watch_agent(
    bus: &Arc<LocalBroadcaster>,
    agent_id: &AgentId,
    tx: &mpsc::UnboundedSender<BusEvent>,
    watched: &mut HashSet<AgentId>,
) {
    if !watched.insert(agent_id.clone()) {
        return;
    }
    for topic in [
        state_topic(agent_id),
        logs_topic(agent_id),
        messages_topic(agent_id),
    ] {
        let mut rx = bus.subscribe(&topic);
        let tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Dropped {} events on {}", n, topic);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }
}

async fn shutdown(supervisor: &Supervisor, root: &AgentHandle) {
    if !root.is_closed() {
        let _ = root.stop();
    }
    supervisor.shutdown();
    if tokio::time::timeout(Duration::from_secs(5), supervisor.join())
        .await
        .is_err()
    {
        warn!("{} agents did not stop in time", supervisor.active_agents());
    }
}
