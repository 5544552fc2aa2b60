use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use crate::state::{AppState, SimSession};

mod alerts;
mod routes;
mod state;
mod tick_loop;

#[derive(Parser)]
#[command(name = "bot_daemon", about = "Robot Simulation daemon")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Seed for the session RNG; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let content = bot_world::load_content(&args.content_dir)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let session = bot_world::build_initial_session(&content, seed);
    let rng = ChaCha8Rng::seed_from_u64(seed);

    tracing::info!(
        seed,
        world_width = content.world.width,
        world_height = content.world.height,
        "session initialized"
    );

    let (event_tx, _) = tokio::sync::broadcast::channel(64);
    let sim = Arc::new(parking_lot::Mutex::new(SimSession {
        session,
        content,
        rng,
        overlay: None,
    }));

    tokio::spawn(tick_loop::run_tick_loop(sim.clone(), event_tx.clone(), None));

    let app = routes::make_router_with_cors(
        AppState {
            sim,
            event_tx,
        },
        &args.cors_origin,
    );
    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("binding {}", args.addr))?;
    tracing::info!("listening on {}", args.addr);
    axum::serve(listener, app).await.context("serving")?;
    Ok(())
}
