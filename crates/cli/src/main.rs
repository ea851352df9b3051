//! research-pipeline - command-line entry point.
//!
//! Runs one research process end to end against the simulated analysis
//! backend and prints the update stream as it happens.

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use colored::Colorize;
use rp_core::analysis::adapters::SimulatedClient;
use rp_core::collect::FocusAreaCollector;
use rp_core::config::{load_config, AppConfig, TemplateOverrides};
use rp_core::ProcessOrchestrator;
use rp_protocol::{
    Event, LogSeverity, ProcessId, ProcessState, ProcessStatus, ResearchRequest, StageStatus,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "research-pipeline")]
#[command(about = "Run multi-stage research processes")]
#[command(version)]
struct Cli {
    /// Project root containing the `.research-pipeline/` directory
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a research process and stream its progress
    Run(RunArgs),

    /// List the research templates found in the configuration directory
    Templates,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Template to start from
    #[arg(short, long)]
    template: Option<String>,

    /// Research topic (overrides the template's topic)
    #[arg(long)]
    topic: Option<String>,

    /// Focus area; repeat for several
    #[arg(short, long = "focus")]
    focus: Vec<String>,

    /// Add --focus areas to the template's instead of replacing them
    #[arg(long)]
    append_focus: bool,

    /// Simulated latency of each analysis call in milliseconds
    #[arg(long, default_value_t = 150)]
    latency_ms: u64,

    /// Print the final process state as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli.root).await?;
    debug!(templates = config.templates.len(), "configuration loaded");

    match cli.command {
        Command::Run(args) => run(&config, args).await,
        Command::Templates => {
            list_templates(&config);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_request(config: &AppConfig, args: &RunArgs) -> Result<ResearchRequest> {
    let request = match &args.template {
        Some(name) => {
            let template = config
                .template(name)
                .ok_or_else(|| eyre!("Unknown template '{name}'"))?;
            template.to_request(&TemplateOverrides {
                topic: args.topic.clone(),
                focus_areas: args.focus.clone(),
                append_focus_areas: args.append_focus,
            })
        }
        None => {
            let topic = args
                .topic
                .clone()
                .ok_or_else(|| eyre!("Either --topic or --template is required"))?;
            ResearchRequest::new(topic).with_focus_areas(args.focus.clone())
        }
    };

    if request.topic.trim().is_empty() {
        return Err(eyre!("The research topic is empty"));
    }
    Ok(request)
}

async fn run(config: &AppConfig, args: RunArgs) -> Result<()> {
    let request = build_request(config, &args)?;
    let orchestrator = ProcessOrchestrator::from_settings(
        Arc::new(FocusAreaCollector),
        Arc::new(SimulatedClient::new(Duration::from_millis(args.latency_ms))),
        &config.settings,
    );

    let process_id = ProcessId::generate();
    let mut events = orchestrator.bus().subscribe_process(process_id.clone());
    orchestrator.start(process_id.clone(), request).await?;
    info!(process_id = %process_id, "research process launched");

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("{}", "Interrupted, stopping process...".yellow());
                orchestrator.stop(&process_id).await?;
            }
        }
    }

    let state = orchestrator.get_state(&process_id).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_summary(&state);
    }

    match (&state.status, &state.failure) {
        (ProcessStatus::Error, Some(failure)) => Err(eyre!(
            "{} failed: {}",
            failure.stage.label(),
            failure.message
        )),
        _ => Ok(()),
    }
}

fn print_event(event: &Event) {
    match event {
        Event::StageUpdate(update) => {
            let status = match update.status {
                StageStatus::Pending => "pending".dimmed(),
                StageStatus::Running => "running".cyan(),
                StageStatus::Suspended => "suspended".yellow(),
                StageStatus::Completed => "completed".green(),
                StageStatus::Error => "error".red().bold(),
            };
            println!(
                "[{:>3}%] {:<24} {:<10} {}",
                update.progress,
                update.stage_name.label(),
                status,
                update.detail
            );
        }
        Event::ProcessUpdate(update) => {
            println!("{} {:?}", "process".bold(), update.status);
        }
        Event::LiveLog(line) => {
            let message = match line.severity {
                LogSeverity::Debug => line.message.dimmed(),
                LogSeverity::Info => line.message.normal(),
                LogSeverity::Warning => line.message.yellow(),
                LogSeverity::Error => line.message.red(),
            };
            println!("  {} {}", line.timestamp.format("%H:%M:%S"), message);
        }
    }
}

fn print_summary(state: &ProcessState) {
    println!();
    let Some(report) = &state.report else {
        println!("{} {:?}", "No report produced; process ended".yellow(), state.status);
        return;
    };

    println!("{}", format!("Research report: {}", report.topic).bold());
    println!("{}", report.summary);

    let sections = [
        ("Key findings", &report.key_findings),
        ("Recommendations", &report.recommendations),
        ("Risks", &report.risks),
    ];
    for (title, entries) in sections {
        if entries.is_empty() {
            continue;
        }
        println!("\n{}", title.underline());
        for entry in entries {
            println!("  - {entry}");
        }
    }

    if !report.coverage.failed_item_ids.is_empty() {
        println!(
            "\n{} {}",
            "Not analyzed:".yellow(),
            report.coverage.failed_item_ids.join(", ")
        );
    }
}

fn list_templates(config: &AppConfig) {
    if config.templates.is_empty() {
        println!("No templates found");
        return;
    }

    for template in &config.templates {
        println!(
            "{:<24} {:<12} {}",
            template.name.bold(),
            template.category,
            template.description
        );
    }
}
