use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gymbook_alerts::AlertSink;
use gymbook_core::{config::DEFAULT_CONFIG_PATH, matcher::filter_sessions, GymbookConfig, Session};
use gymbook_portal::{Portal, PortalClient};
use gymbook_scheduler::{AttemptStatus, BookingLoop, SystemClock};
use tracing::{info, warn};

mod signal;

const ALERT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "gymbook", about = "Track and book recurring gym classes", version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = "GYMBOOK_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every club's schedule and print each class's status
    Fetch {
        /// Show every class, ignoring configured interests
        #[arg(long)]
        all: bool,
    },
    /// Book classes matching the configured interests
    Schedule {
        /// Keep running and book each upcoming class as its window opens
        #[arg(long = "loop")]
        run_loop: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "gymbook=info,gymbook_scheduler=info,gymbook_portal=info,gymbook_core=info,gymbook_alerts=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = GymbookConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config))?;
    info!(
        path = %cli.config,
        clubs = config.clubs.len(),
        interests = config.interest_count(),
        "configuration loaded"
    );

    let portal = PortalClient::new(&config.base_url, config.booking.request_timeout)?;

    match cli.command {
        Command::Fetch { all } => fetch(&portal, &config, all).await,
        Command::Schedule { run_loop } => schedule(portal, config, run_loop).await,
    }
}

async fn fetch(portal: &PortalClient, config: &GymbookConfig, all: bool) -> anyhow::Result<()> {
    let sessions = portal.fetch_sessions(&config.credentials, &config.clubs).await?;
    let sessions = if all {
        sessions
    } else {
        filter_sessions(sessions, &config.interests)
    };

    if sessions.is_empty() {
        println!("no classes matched your filters");
        return Ok(());
    }

    for session in &sessions {
        println!("{}", describe(session));
    }
    Ok(())
}

fn describe(s: &Session) -> String {
    if s.already_booked {
        format!(
            "Already booked: {} | {} | {} | {} | Trainer: {} | ClassID: {}",
            s.club_name, s.day, s.time, s.title, s.trainer, s.class_id
        )
    } else if s.bookable {
        format!(
            "Bookable: {} | {} | {} | {} | Trainer: {} | ClassID: {}",
            s.club_name, s.day, s.time, s.title, s.trainer, s.class_id
        )
    } else {
        format!(
            "Scheduled (booking closed): {} | {} | {} | Trainer: {} | Title: {}",
            s.club_name, s.day, s.time, s.trainer, s.title
        )
    }
}

async fn schedule(portal: PortalClient, config: GymbookConfig, run_loop: bool) -> anyhow::Result<()> {
    let alerts = gymbook_alerts::from_config(config.alerting.as_ref());
    let outcome = run_schedule(portal, config, run_loop, Arc::clone(&alerts)).await;

    if !alerts.flush(ALERT_FLUSH_TIMEOUT).await {
        warn!(sink = alerts.name(), "exiting with undelivered alerts");
    }
    outcome
}

async fn run_schedule(
    portal: PortalClient,
    config: GymbookConfig,
    run_loop: bool,
    alerts: Arc<dyn AlertSink>,
) -> anyhow::Result<()> {
    let booking_loop = BookingLoop::new(config, Arc::new(portal), alerts, Arc::new(SystemClock))?;

    if run_loop {
        booking_loop.run(signal::shutdown_signal()).await?;
        return Ok(());
    }

    let results = booking_loop.run_once().await?;
    let booked = results
        .iter()
        .filter(|r| r.status == AttemptStatus::Booked)
        .count();
    info!(interests = results.len(), booked, "scheduling pass complete");
    Ok(())
}
