use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sweetest_monitor::report::{self, RunReport, ViewState};
use sweetest_monitor::result::ResultTree;
use sweetest_monitor::runconfig::{
    ConfigOutcome, ExecutionType, HttpRunConfigStore, RunConfigResolver, RunConfiguration,
};
use sweetest_monitor::runner::{
    ChildUpdate, ConsoleNoticeListener, EventEmitter, ResultPayload, RunEvent, RunMonitor,
};
use sweetest_monitor::Config;

#[derive(Parser)]
#[command(name = "sweetest")]
#[command(version = "0.1.0")]
#[command(about = "Live result monitor for end-to-end test runs", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a finished result tree
    Show {
        /// Path to the suite result JSON
        file: PathBuf,

        /// Print the annotated tree as JSON instead of the console view
        #[arg(long, default_value = "false")]
        json: bool,

        /// Output file path (JSON only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only expand the branches leading to errors
        #[arg(long, default_value = "false")]
        collapsed: bool,

        /// Show stack traces of failed nodes
        #[arg(long, default_value = "false")]
        stack_traces: bool,
    },

    /// Feed a recorded event stream through the monitor
    Replay {
        /// Path to a JSON-lines file of run events
        file: PathBuf,

        /// Print the final trees as JSON instead of the console view
        #[arg(long, default_value = "false")]
        json: bool,

        /// Output file path (JSON only)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage run configurations in the store
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the configuration stored for a suite
    Get {
        /// Suite path
        path: String,
    },

    /// Replace the configuration stored for a suite
    Set {
        /// Suite path
        path: String,

        /// Container image
        #[arg(short, long, default_value = "")]
        container: String,

        /// Image tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Execution type (local, dockerfile, docker-compose, sakuli-container)
        #[arg(long = "type", default_value = "sakuli-container")]
        execution_type: ExecutionType,
    },

    /// List available containers
    Containers,

    /// List the tags of a container
    Tags {
        container: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Show {
            file,
            json,
            output,
            collapsed,
            stack_traces,
        } => show(&config, &file, json, output.as_deref(), collapsed, stack_traces)?,

        Commands::Replay { file, json, output } => {
            replay(&config, &file, json, output.as_deref()).await?
        }

        Commands::Config { command } => run_config_command(&config, command).await?,
    }

    Ok(())
}

fn show(
    config: &Config,
    file: &Path,
    json: bool,
    output: Option<&Path>,
    collapsed: bool,
    stack_traces: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let record: ChildUpdate = serde_json::from_str(&content)
        .with_context(|| format!("Invalid result tree in {}", file.display()))?;

    let mut tree = ResultTree::new(&record.name);
    tree.merge(&ResultPayload::from_record(record))?;

    let mut view = ViewState::new();
    if collapsed {
        view.expand_errors(&tree);
    } else {
        view.expand_all(&tree);
    }
    if stack_traces {
        let failed: Vec<_> = tree
            .depth_first()
            .filter(|entry| entry.node.exception.is_some())
            .map(|entry| entry.id)
            .collect();
        for id in failed {
            view.toggle_stack_trace(id);
        }
    }

    let run_id = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| tree.suite_name().to_string());
    let report = report::build_report(&run_id, &tree, &view, Utc::now());
    print_reports(config, &[report], json, output)
}

async fn replay(
    config: &Config,
    file: &Path,
    json: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let default_run_id = format!("replay-{}", uuid::Uuid::new_v4());
    let mut events = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RunEvent>(line) {
            Ok(event) => events.push(event.with_default_run_id(&default_run_id)),
            Err(e) => log::warn!("Skipping line {}: {}", index + 1, e),
        }
    }

    println!(
        "{} Replaying {} events from: {}",
        "▶".green().bold(),
        events.len(),
        file.display()
    );

    // The whole stream is emitted up front, so size the bus to hold it
    let (emitter, receiver) = EventEmitter::with_capacity(events.len().max(config.event_capacity));
    let monitor = Arc::new(RunMonitor::new(
        events.len().max(config.event_capacity),
        config.log_capacity,
    ));

    let console = tokio::spawn(ConsoleNoticeListener::listen(monitor.subscribe()));
    let consumer = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.listen(receiver).await })
    };

    for event in events {
        emitter.emit(event);
    }
    drop(emitter);
    consumer.await?;

    let now = Utc::now();
    let mut reports = Vec::new();
    for run_id in monitor.run_ids().await {
        if let Some(handle) = monitor.run(&run_id).await {
            let mut guard = handle.lock().await;
            let state = &mut *guard;
            state.view.expand_all(&state.tree);
            reports.push(report::build_report(&run_id, &state.tree, &state.view, now));
        }
    }

    // Closing the notice channel lets the console listener drain and stop
    drop(monitor);
    console.await?;

    print_reports(config, &reports, json, output)
}

fn print_reports(
    config: &Config,
    reports: &[RunReport],
    json: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    if json || output.is_some() {
        report::json::generate(reports, output)?;
        return Ok(());
    }

    for report in reports {
        println!();
        print!("{}", report::console::render(report, config.bar_width));
    }
    Ok(())
}

async fn run_config_command(config: &Config, command: ConfigCommands) -> anyhow::Result<()> {
    let resolver = RunConfigResolver::new(HttpRunConfigStore::new(&config.store_url))
        .surface_errors(config.surface_config_errors);

    match command {
        ConfigCommands::Get { path } => match resolver.load(&path).await {
            ConfigOutcome::Ok(run_config) => {
                println!("{}", serde_json::to_string_pretty(&run_config)?);
            }
            ConfigOutcome::Empty => {
                println!("{} No run configuration for {}", "○".yellow(), path.cyan());
            }
            ConfigOutcome::Failed(reason) => anyhow::bail!("Failed to load {}: {}", path, reason),
        },

        ConfigCommands::Set {
            path,
            container,
            tags,
            execution_type,
        } => {
            let run_config = RunConfiguration {
                path: path.clone(),
                execution_type,
                container,
                tags,
            };

            match resolver.save(&path, run_config).await {
                ConfigOutcome::Ok(()) => {
                    println!("{} Saved run configuration for {}", "✓".green(), path.cyan());
                }
                ConfigOutcome::Empty => {
                    println!(
                        "{} Run configuration for {} was not saved",
                        "○".yellow(),
                        path.cyan()
                    );
                }
                ConfigOutcome::Failed(reason) => {
                    anyhow::bail!("Failed to save {}: {}", path, reason)
                }
            }
        }

        ConfigCommands::Containers => {
            for container in resolver.list_containers().await {
                println!("{}", container);
            }
        }

        ConfigCommands::Tags { container } => {
            for tag in resolver.list_tags(&container).await {
                println!("{}", tag);
            }
        }
    }

    Ok(())
}
