use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    CommandOutcome, ControllerEvent, ControllerOptions, HttpDeviceApi, PollOutcome,
    PollOverlapPolicy, UiController,
};
use shared::protocol::START_FAILED_TEXT;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod render;

use config::{load_settings, normalize_server_url};

#[derive(Parser, Debug)]
#[command(about = "Terminal panel for the Pico W blink server")]
struct Cli {
    /// Settings file; defaults to `panel.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    interval_ms: Option<u64>,
    #[arg(long)]
    policy: Option<PollOverlapPolicy>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the blink count until Ctrl-C; type `s` + Enter to send START.
    Watch {
        #[arg(long)]
        start: bool,
    },
    /// Send one START command and print the resulting status.
    Start,
    /// Fetch the blink count once.
    Count,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(server_url) = &cli.server_url {
        settings.server_url = normalize_server_url(server_url);
    }
    if let Some(interval_ms) = cli.interval_ms {
        if interval_ms == 0 {
            bail!("--interval-ms must be positive");
        }
        settings.poll_interval_ms = interval_ms;
    }
    if let Some(policy) = cli.policy {
        settings.overlap_policy = policy;
    }

    let api = HttpDeviceApi::new(&settings.server_url)
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    let controller = UiController::new(
        Arc::new(api),
        ControllerOptions {
            poll_interval: settings.poll_interval(),
            overlap_policy: settings.overlap_policy,
            ..ControllerOptions::default()
        },
    );
    info!(server_url = %settings.server_url, "panel ready");

    match cli.command.unwrap_or(Command::Watch { start: false }) {
        Command::Watch { start } => watch(controller, start).await,
        Command::Start => match controller.send_start_command().await {
            CommandOutcome::Delivered(message) => {
                let event = ControllerEvent::StatusChanged(message);
                println!("{}", render::render_event(&event));
                Ok(())
            }
            CommandOutcome::Failed => bail!(START_FAILED_TEXT),
        },
        Command::Count => match controller.update_blink_count().await {
            PollOutcome::Applied(count) | PollOutcome::Stale(count) => {
                println!("{count}");
                Ok(())
            }
            PollOutcome::Skipped | PollOutcome::Failed => bail!("could not fetch count"),
        },
    }
}

async fn watch(controller: Arc<UiController>, send_start: bool) -> Result<()> {
    let mut events = controller.subscribe();
    println!("{}", render::start_hint());
    println!("{}", render::render_state(&controller.snapshot().await));

    controller.start();
    if send_start {
        press_start(&controller);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(error) = result {
                    warn!(%error, "failed to listen for ctrl-c");
                }
                break;
            }
            event = events.recv() => match event {
                Ok(event) => println!("{}", render::render_event(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "panel fell behind controller events; redrawing");
                    println!("{}", render::render_state(&controller.snapshot().await));
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if render::is_start_input(&line) => press_start(&controller),
                Ok(Some(_)) => {}
                Ok(None) => stdin_open = false,
                Err(error) => {
                    warn!(%error, "stopped reading stdin");
                    stdin_open = false;
                }
            },
        }
    }

    controller.stop();
    Ok(())
}

fn press_start(controller: &Arc<UiController>) {
    let controller = Arc::clone(controller);
    tokio::spawn(async move {
        controller.send_start_command().await;
    });
}
