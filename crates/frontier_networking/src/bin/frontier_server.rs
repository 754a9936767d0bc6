//! # Frontier Game Server
//!
//! The authoritative server for one game.
//!
//! ## Usage
//!
//! ```bash
//! frontier_server [CONFIG] --bind 0.0.0.0:3000 --tick-ms 100 --duration 60
//! ```
//!
//! `RUST_LOG` controls verbosity (default `info`).

use frontier_networking::{launch, GameServer, ServerConfig};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
    bind: Option<String>,
    tick_ms: Option<u64>,
    duration_secs: Option<u64>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: None,
        bind: None,
        tick_ms: None,
        duration_secs: None,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match args[i].as_str() {
            "--bind" | "-b" => {
                parsed.bind = value;
                i += 1;
            }
            "--tick-ms" | "-t" => {
                parsed.tick_ms = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--duration" | "-d" => {
                parsed.duration_secs = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: frontier_server [CONFIG] [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --bind <ADDR>       Listener address (default: 0.0.0.0:3000)");
                println!("  -t, --tick-ms <MS>      Milliseconds per tick (default: 100)");
                println!("  -d, --duration <SECS>   Run for N seconds then exit");
                println!("  -h, --help              Show this help");
                return None;
            }
            other => parsed.config = Some(other.to_owned()),
        }
        i += 1;
    }
    Some(parsed)
}

fn load_config(args: &Args) -> Result<ServerConfig, frontier_networking::NetworkError> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(ms) = args.tick_ms {
        config.server.tick_interval_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(args) = parse_args() else {
        return ExitCode::SUCCESS;
    };
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(
        bind = %config.server.bind,
        game = %config.server.game_id,
        tick_ms = config.server.tick_interval_ms,
        seed = config.game.seed,
        "starting server"
    );

    let server = match GameServer::new(config) {
        Ok(server) => server,
        Err(err) => {
            error!(%err, "server setup failed");
            return ExitCode::FAILURE;
        }
    };
    let running = match launch(server).await {
        Ok(running) => running,
        Err(err) => {
            error!(%err, "failed to start");
            return ExitCode::FAILURE;
        }
    };

    match args.duration_secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(%err, "cannot wait for ctrl-c");
            }
        }
    }

    info!("shutting down");
    let finished = tokio::task::spawn_blocking(move || running.shutdown()).await;
    match finished {
        Ok(Ok(server)) => {
            let game = server.executor().game();
            info!(
                ticks = game.ticks(),
                players = game.players().count(),
                hash = %format!("{:016x}", game.state_hash()),
                "server stopped"
            );
            ExitCode::SUCCESS
        }
        Ok(Err(err)) => {
            error!(%err, "unclean shutdown");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(%err, "shutdown task failed");
            ExitCode::FAILURE
        }
    }
}
