mod config;
mod dispatch;
mod transport;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::transport::{Link, LinkSettings, LinkState};
use clap::Parser;
use cloudview::{InputFrame, PointArena, Viewer};
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Initialization ---
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();
    let config = Config::parse();
    tracing::info!(config = ?config, "Viewer bridge starting with configuration");

    let viewer = Viewer::new(config.load_viewer_config()?)?;
    let mut dispatcher = Dispatcher::new(viewer);
    let mut arena = PointArena::new();

    // --- 2. Spawn Link Task ---
    let mut link = Link::spawn(LinkSettings {
        addr: config.addr(),
        retry_delay: config.retry_delay(),
        max_attempts: config.max_reconnect_attempts,
        heartbeat: config.heartbeat_interval(),
    });
    let mut link_state = link.watch_state();

    // --- 3. Main Loop ---
    let mut interval = tokio::time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    tracing::info!("Starting main loop...");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received.");
                break;
            },
            line = link.recv() => {
                let Some(line) = line else {
                    tracing::warn!("Link task stopped.");
                    break;
                };
                for reply in dispatcher.handle_line(&line) {
                    link.send(&reply);
                }
            },
            Ok(()) = link_state.changed() => {
                let state = *link_state.borrow_and_update();
                match state {
                    LinkState::Connected => tracing::info!("Controller link up"),
                    LinkState::Disconnected => tracing::warn!("Controller link down"),
                    LinkState::Connecting => tracing::debug!("Controller link connecting"),
                }
            },
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last_tick).as_secs_f32();
                last_tick = now;

                for reply in dispatcher.tick(&InputFrame::idle(), dt, &mut arena) {
                    link.send(&reply);
                }
            }
        }
    }

    if let Some(stats) = dispatcher.viewer().stats() {
        tracing::info!(
            name = %stats.name,
            placed = stats.placed,
            total = stats.total_points,
            "Final load state"
        );
    }

    tracing::info!("Viewer bridge shutting down.");
    link.join().await
}
