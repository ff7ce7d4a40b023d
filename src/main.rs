//! Folio annotations shell
//!
//! Replays a JSON-lines host script against the configured storage backend
//! and prints the resulting records.

use std::env;
use std::fs;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio_annotations::replay::ReplaySession;
use folio_annotations::storage::open_backend;
use folio_annotations::Config;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_annotations=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let script_path = env::args()
        .nth(1)
        .context("usage: folio-annotations <script.jsonl>")?;
    let script = fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script {}", script_path))?;

    tracing::info!("Starting Folio annotations v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Storage backend: {:?} ({})", config.storage.backend, config.storage.dir.display());
    tracing::info!("Document: {}", config.document.url);

    let backend = open_backend(&config.storage).context("Failed to open annotation storage")?;
    let mut session = ReplaySession::start(&config, backend);
    let steps = session.run_script(&script)?;
    tracing::info!("Replayed {} steps", steps);

    let records = session.finish();
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}
