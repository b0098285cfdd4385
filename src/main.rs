//! Artel - clan service for Siberia Life

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use artel::{
    clans::ClanRegistry,
    config::Args,
    db::MongoClient,
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("artel={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Artel - Siberia Life clan service");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("MongoDB: {} (db '{}')", args.mongodb_uri, args.mongodb_db);

    // Connect to MongoDB. Fatal in production; in dev mode the service can
    // come up without it and answer health probes while the database starts.
    let (mongo, registry) = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(mongo) => {
            let registry = ClanRegistry::new(&mongo).await?;
            (Some(mongo), Some(registry))
        }
        Err(e) if args.dev_mode => {
            warn!("MongoDB unavailable in dev mode: {}", e);
            (None, None)
        }
        Err(e) => {
            error!("Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(args, mongo, registry));
    server::run(state).await?;

    Ok(())
}
