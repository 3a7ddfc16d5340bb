use crate::config::Config;
use crate::game::Game;
use crate::handler::AppState;
use crate::memory::Memory;
use crate::pairing::Matchmaker;
use crate::queue::{QueueService, QueueStore};
use clap::Parser;
use hashbrown::HashMap;
use std::error::Error;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod client;
mod config;
mod error;
mod game;
mod handler;
mod memory;
mod pairing;
mod queue;
mod services;
mod simulation;
#[cfg(test)]
mod testing;
mod util;
mod ws;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_max_level(config.log_level)
        .with_writer(non_blocking)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let memory = Memory::new(config.simulation()).await;
    memory.seed_demo_users(config.demo_users, config.squad_size).await;
    let services = memory.services();

    let queue = QueueService::new(Arc::new(QueueStore::new()), services.users.clone());
    let game = Game::new(queue.clone(), services.clone(), config.game());
    let matchmaker = Arc::new(Matchmaker::new(queue.clone(), game, config.pairing()));
    info!(address = %config.address, "created queue and matchmaker");

    let shutdown = CancellationToken::new();
    let pairing = tokio::spawn(matchmaker.run(shutdown.clone()));

    tokio::spawn(cancel_on(tokio::signal::ctrl_c(), shutdown.clone()));

    let state = AppState {
        sessions: Arc::new(RwLock::new(HashMap::new())),
        queue,
        users: services.users.clone(),
        address: config.address,
    };
    let server_shutdown = shutdown.clone();
    let (address, server) = warp::serve(handler::routes(state))
        .try_bind_with_graceful_shutdown(config.address, async move {
            server_shutdown.cancelled().await
        })?;
    info!(%address, "listening");

    server.await;
    shutdown.cancel();
    pairing.await?;
    Ok(())
}

// A signal that cannot be listened for never shuts the server down.
async fn cancel_on(signal: impl Future<Output = io::Result<()>>, shutdown: CancellationToken) {
    if let Err(err) = signal.await {
        error!("could not listen for ctrl-c: {}", err);
        return;
    }
    info!("shutting down");
    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancel_on_signal() {
        let shutdown = CancellationToken::new();
        cancel_on(async { Ok(()) }, shutdown.clone()).await;
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_error_keeps_running() {
        let shutdown = CancellationToken::new();
        let unavailable = async { Err(io::Error::new(io::ErrorKind::Other, "no signal handler")) };
        cancel_on(unavailable, shutdown.clone()).await;
        assert!(!shutdown.is_cancelled());
    }
}
