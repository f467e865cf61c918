mod input;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{
    load_settings, HttpRoverApi, RoverConsole, SharedDashboard, UserAction, WsConnector,
};
use input::{parse_line, ParsedLine};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast::error::RecvError, mpsc},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rover_console", about = "Live console for the rover minefield service")]
struct Args {
    /// Base address of the service; overrides rover_console.toml and the environment
    #[arg(long)]
    server_url: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    let server_url = settings
        .server_base()
        .context("invalid server address")?;
    info!(%server_url, "starting rover console");

    let api = Arc::new(HttpRoverApi::new(&server_url)?);
    let connector = Arc::new(WsConnector::new(&server_url)?);
    let dashboard = SharedDashboard::new();
    let console = RoverConsole::new(api, connector, dashboard.clone());

    let (actions, actions_rx) = mpsc::channel(32);
    let screen = tokio::spawn(draw_loop(dashboard));
    let keyboard = tokio::spawn(read_lines(actions));

    console.run(actions_rx).await;

    keyboard.abort();
    screen.abort();
    Ok(())
}

/// Redraws the dashboard after each burst of changes and prints notifications.
async fn draw_loop(dashboard: SharedDashboard) {
    let mut changes = dashboard.subscribe();
    loop {
        match changes.recv().await {
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => return,
        }
        while changes.try_recv().is_ok() {}

        for notice in dashboard.drain_notifications().await {
            println!("📢 {notice}");
        }
        let view = dashboard.snapshot().await;
        println!("{}", "─".repeat(40));
        print!("{view}");
    }
}

async fn read_lines(actions: mpsc::Sender<UserAction>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "stdin read failed");
                break;
            }
        };
        match parse_line(&line) {
            ParsedLine::Empty => {}
            ParsedLine::Message(message) => println!("{message}"),
            ParsedLine::Action(action) => {
                if actions.send(action).await.is_err() {
                    return;
                }
            }
        }
    }
    let _ = actions.send(UserAction::Quit).await;
}
