//! # Frontier Headless Client
//!
//! Connects to a server, spawns one player and logs what its projection
//! sees.
//!
//! ## Usage
//!
//! ```bash
//! frontier_client --url ws://127.0.0.1:3000 --client c1 --player P1 --at 10,10 --duration 30
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use frontier_networking::{ClientConfig, ClientSession};
use frontier_shared::{Cell, PlayerId, PlayerType};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct Args {
    config: ClientConfig,
    player: PlayerId,
    name: String,
    at: Cell,
    duration_secs: Option<u64>,
}

fn parse_cell(text: &str) -> Option<Cell> {
    let (x, y) = text.split_once(',')?;
    Some(Cell::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn print_help() {
    println!("Usage: frontier_client [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -u, --url <URL>         Server (default: ws://127.0.0.1:3000)");
    println!("  -c, --client <ID>       Client id (default: client)");
    println!("  -g, --game <ID>         Game id (default: frontier)");
    println!("  -p, --player <ID>       Player id (default: P1)");
    println!("  -n, --name <NAME>       Display name");
    println!("      --at <X,Y>          Spawn cell (default: 10,10)");
    println!("  -d, --duration <SECS>   Run for N seconds then exit");
    println!("  -h, --help              Show this help");
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: ClientConfig::default(),
        player: PlayerId::from("P1"),
        name: "Headless".to_owned(),
        at: Cell::new(10, 10),
        duration_secs: None,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = match args.get(i + 1) {
            Some(value) if flag != "--help" && flag != "-h" => value.clone(),
            _ => {
                print_help();
                return None;
            }
        };
        match flag {
            "--url" | "-u" => parsed.config.server_url = value,
            "--client" | "-c" => parsed.config.client_id = value.as_str().into(),
            "--game" | "-g" => parsed.config.game_id = value.as_str().into(),
            "--player" | "-p" => parsed.player = value.as_str().into(),
            "--name" | "-n" => parsed.name = value,
            "--at" => parsed.at = parse_cell(&value).unwrap_or(parsed.at),
            "--duration" | "-d" => parsed.duration_secs = value.parse().ok(),
            _ => {
                print_help();
                return None;
            }
        }
        i += 2;
    }
    Some(parsed)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let Some(args) = parse_args() else {
        return ExitCode::SUCCESS;
    };
    info!(
        url = %args.config.server_url,
        client = %args.config.client_id,
        game = %args.config.game_id,
        "starting client"
    );

    let session = Arc::new(ClientSession::new(args.config));
    let runner = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.run().await })
    };
    let view = session.view();
    let transport = session.transport();

    let start = Instant::now();
    let mut spawned = false;
    let mut report = tokio::time::interval(Duration::from_secs(1));
    loop {
        report.tick().await;
        if runner.is_finished() {
            break;
        }
        if args.duration_secs.is_some_and(|secs| start.elapsed().as_secs() >= secs) {
            break;
        }

        let (synced, tick, players, units, mine) = {
            let view = view.read();
            (
                view.is_synced(),
                view.tick(),
                view.players().count(),
                view.active_units().count(),
                view.player(&args.player).map(|p| p.tiles_owned),
            )
        };
        if synced && !spawned {
            let sent = transport
                .lock()
                .spawn(&args.player, &args.name, PlayerType::Human, args.at);
            spawned = sent == frontier_networking::SendOutcome::Sent;
        }
        info!(tick, players, units, tiles = ?mine, "projection");
    }

    session.stop();
    match runner.await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "session task failed");
            ExitCode::FAILURE
        }
    }
}
