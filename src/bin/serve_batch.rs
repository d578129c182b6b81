use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use wine_serving::api;

/// Wine class prediction service with request batching: a list of
/// positional 13-float vectors per request.
#[derive(Parser, Debug)]
#[command(name = "serve-batch", version, about)]
struct Args {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value_t = 80)]
    port: u16,

    /// Path to the serialized pipeline artifact.
    #[arg(long, default_value = "models/wine.json")]
    model_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=info".to_string()),
        )
        .init();

    let args = Args::parse();

    let state = api::AppState::load(&args.model_path)
        .with_context(|| format!("failed to load model from {}", args.model_path.display()))?;

    let app = api::batch_router(state);
    api::serve(app, &args.host, args.port).await
}
