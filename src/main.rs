use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::signal;

use duebell::notify::console::ConsoleSink;
use duebell::notify::desktop::DesktopSink;
use duebell::notify::{Notification, NotificationSink, SinkSet};
use duebell::scheduler::{Scheduler, SchedulerState};
use duebell::{config, digest, source};

#[derive(Parser)]
#[command(
    name = "duebell",
    version,
    about = "Deadline reminders and daily digests for the team task list"
)]
struct Cli {
    #[arg(short, long, default_value = "~/.duebell/config.toml", env = "DUEBELL_CONFIG")]
    config: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the task list and send reminders until interrupted
    Run,
    /// Create ~/.duebell/ with a default config and an empty task list
    Init,
    /// Show what would fire right now, without notifying
    Check,
    /// Send a test notification through the configured sinks
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init => {
            let base = config::init_config_dir().await?;
            tracing::info!("Initialized {}", base.display());
        }
        Commands::Run => run(&cli.config).await?,
        Commands::Check => check(&cli.config)?,
        Commands::Test => test_notification(&cli.config).await?,
    }
    Ok(())
}

fn build_sinks(cfg: &config::SinksConfig) -> SinkSet {
    let mut sinks = SinkSet::new();
    if cfg.console {
        sinks.register(Box::new(ConsoleSink));
    }
    if cfg.desktop {
        sinks.register(Box::new(DesktopSink::new(cfg.desktop_program.clone())));
    }
    sinks
}

async fn run(config_path: &str) -> Result<()> {
    let cfg = config::load(config_path)?;
    let tasks_path = cfg.tasks.resolved_path();

    let sinks = build_sinks(&cfg.sinks);
    if sinks.is_empty() {
        tracing::warn!("No notification sinks enabled; reminders will only be logged");
    }
    if !cfg.notifications.enabled {
        tracing::warn!("Notifications are disabled; idling until [notifications] enabled = true");
    }

    let tasks = Arc::new(source::TaskFile::new(tasks_path.clone()));
    let settings = Arc::new(source::ConfigSettings::new(
        config_path,
        cfg.notifications.clone(),
    ));

    let mut scheduler = Scheduler::new();
    scheduler.start(tasks, settings, Arc::new(sinks));
    tracing::info!("Watching {}", tasks_path.display());

    signal::ctrl_c().await?;
    scheduler.stop().await;
    Ok(())
}

fn check(config_path: &str) -> Result<()> {
    let cfg = config::load(config_path)?;
    let tasks = source::TaskFile::new(cfg.tasks.resolved_path()).load()?;
    let mut settings = cfg.notifications.clone();
    if !settings.enabled {
        println!("Notifications are disabled; previewing as if enabled.");
        settings.enabled = true;
    }

    let now = Local::now();
    let open = tasks.iter().filter(|t| t.is_open()).count();
    let due_today = digest::count_due_on(&tasks, now.date_naive(), &Local);
    println!(
        "{} tasks, {open} open, {due_today} due today ({})",
        tasks.len(),
        now.format("%Y-%m-%d %H:%M")
    );
    match settings.digest_rule() {
        Some(at) => println!("Daily digest at {at}"),
        None => println!("Daily digest off"),
    }

    let snapshot = move || tasks.clone();
    let snapshot_settings = move || settings.clone();
    let plan = SchedulerState::default().plan(&now, &snapshot, &snapshot_settings);
    if plan.notifications.is_empty() {
        println!("Nothing would fire right now.");
    }
    for n in &plan.notifications {
        println!("[{}] {}: {}", n.tag, n.title, n.body);
    }
    Ok(())
}

async fn test_notification(config_path: &str) -> Result<()> {
    let cfg = config::load(config_path)?;
    let sinks = build_sinks(&cfg.sinks);
    if sinks.is_empty() {
        anyhow::bail!("No notification sinks enabled in [sinks]");
    }
    sinks
        .notify(&Notification::test(cfg.notifications.sound_enabled))
        .await
        .context("Test notification failed")?;
    tracing::info!("Test notification sent");
    Ok(())
}
