//! # Pulse: scheduled feedback digests
//!
//! Reads user feedback from SQLite, asks a language model for a digest and
//! posts it to a chat webhook on a UTC+8 schedule.
//!
//! Usage:
//!   pulse                          # Run the scheduler until Ctrl+C
//!   pulse run-once                 # Send one daily digest now
//!   pulse run-once --weekly        # Send one weekly digest now
//!   pulse run-once --hours 6       # Digest of the last 6 hours
//!   pulse jobs                     # Show the configured jobs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pulse_core::PulseConfig;
use pulse_core::clock;
use pulse_scheduler::jobs::{DAILY_LABEL, SummaryJob};
use pulse_scheduler::{Scheduler, SummaryPipeline, WebhookNotifier, build_schedule};
use pulse_store::SqliteFeedbackStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pulse", version, about = "📬 Pulse: scheduled AI digests of user feedback")]
struct Cli {
    /// Config file (default: ~/.pulse/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler until interrupted
    Serve,
    /// Run one digest immediately and exit
    RunOnce {
        /// Use the weekly window and label
        #[arg(long, conflicts_with = "hours")]
        weekly: bool,
        /// Look back this many hours instead of 24
        #[arg(long)]
        hours: Option<u32>,
    },
    /// Print the jobs the current config would register
    Jobs,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        "pulse=debug,pulse_core=debug,pulse_providers=debug,pulse_store=debug,pulse_scheduler=debug"
    } else {
        "pulse=info,pulse_core=info,pulse_providers=info,pulse_store=info,pulse_scheduler=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_pipeline(config: &PulseConfig) -> Result<SummaryPipeline> {
    let db_path = expand_path(&config.database_path().to_string_lossy());
    let store = SqliteFeedbackStore::open(&db_path)?;
    tracing::info!("🗄️ Feedback database: {}", db_path.display());

    let summarizer = pulse_providers::create_summarizer(&config.llm);
    let notifier = WebhookNotifier::from_config(&config.webhook);

    Ok(SummaryPipeline::new(
        Arc::new(store),
        Arc::new(summarizer),
        Arc::new(notifier),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json);

    let config_path = cli.config.as_deref().map(expand_path);
    let config = PulseConfig::load(config_path.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::RunOnce { weekly, hours } => run_once(config, weekly, hours).await,
        Command::Jobs => {
            print_jobs(&config);
            Ok(())
        }
    }
}

async fn serve(config: PulseConfig) -> Result<()> {
    let pipeline = build_pipeline(&config)?;
    let scheduler = Scheduler::new(
        Arc::new(pipeline),
        clock::zone(),
        Duration::from_secs(config.schedule.tick_secs.max(1)),
    );

    println!("📬 Pulse v{}", env!("CARGO_PKG_VERSION"));
    println!("   🕐 Zone:      {}", clock::ZONE_NAME);
    println!("   🤖 Model:     {}", config.llm.model);
    println!("   📅 Schedule:  {}", schedule_summary(&config));
    println!();

    if !pulse_scheduler::initialize_scheduler(&scheduler, &config.schedule).await {
        tracing::warn!("⚠️ Scheduler is idle: no digest jobs are configured");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("👋 Shutting down...");
    pulse_scheduler::shutdown_scheduler(&scheduler).await;
    Ok(())
}

async fn run_once(config: PulseConfig, weekly: bool, hours: Option<u32>) -> Result<()> {
    let pipeline = build_pipeline(&config)?;
    let job = match (weekly, hours) {
        (true, _) => SummaryJob::weekly(),
        (false, Some(h)) => SummaryJob::interval(h.max(1)),
        (false, None) => SummaryJob::daily(0),
    };

    let result = pipeline.execute(&job.label, job.lookback).await;
    println!(
        "{} {}: {} record(s)",
        if result.success { "✅" } else { "❌" },
        job.label,
        result.record_count
    );
    if !result.success {
        anyhow::bail!("{} digest was not delivered", job.label);
    }
    Ok(())
}

fn print_jobs(config: &PulseConfig) {
    let jobs = build_schedule(&config.schedule);
    if jobs.is_empty() {
        println!("No digest jobs configured.");
        return;
    }
    let now = chrono::Utc::now();
    println!("📅 {} digest job(s) ({}):", jobs.len(), clock::ZONE_NAME);
    for job in &jobs {
        let next = job
            .trigger
            .next_after(now, &clock::zone())
            .map(|t| clock::format_local(&t.with_timezone(&clock::zone())))
            .unwrap_or_else(|| "-".into());
        println!("   {:<28} {:<4} {:<28} next: {}", job.id, job.label, job.describe(), next);
    }
    if config.schedule.run_on_startup {
        println!("   + one {DAILY_LABEL} at startup");
    }
}

fn schedule_summary(config: &PulseConfig) -> String {
    let s = &config.schedule;
    let base = if s.interval_hours > 0 {
        format!("every {}h", s.interval_hours)
    } else if s.daily_hours.is_empty() {
        "no daily digest".to_string()
    } else {
        format!("daily at {}", s.daily_hours)
    };
    if s.enable_weekly {
        format!("{base}, weekly Sun 19:00")
    } else {
        base
    }
}
