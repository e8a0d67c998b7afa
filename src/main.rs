//! Notewarden - course notes with vote-driven moderation

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notewarden::{
    config::{Args, StoreBackend},
    db::{MemoryStore, MongoClient, MongoStore},
    notify::{LogNotifier, Notifier, WebhookNotifier},
    server::{self, AppState, Repositories},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("notewarden={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Notewarden - course notes service");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("Store: {:?}", args.store_backend());
    info!("Token expiry: {}s", args.jwt_expiry_seconds);

    let codec = args.token_codec()?;

    let repositories = match args.store_backend() {
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Repositories::from_store(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Mongo => {
            let uri = args
                .mongodb_uri
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("MONGODB_URI is required for the mongo backend"))?;
            let mongo = MongoClient::new(uri, &args.mongodb_db).await?;
            Repositories::from_store(Arc::new(MongoStore::new(&mongo).await?))
        }
    };

    let notifier: Arc<dyn Notifier> = match &args.notify_webhook_url {
        Some(url) => {
            let webhook =
                WebhookNotifier::new(url.clone(), args.notify_from.clone(), args.notify_timeout());
            info!("Flag notifications via relay {}", webhook.endpoint());
            Arc::new(webhook)
        }
        None => {
            info!("Flag notifications are logged only (NOTIFY_WEBHOOK_URL unset)");
            Arc::new(LogNotifier)
        }
    };

    let state = Arc::new(AppState::new(args, codec, repositories, notifier));
    state.bootstrap().await?;
    server::run(state).await?;

    Ok(())
}
