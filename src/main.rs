//! mic-backend - submission workflow for the Innovation Centre

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mic_backend::{
    config::Args,
    db::{MemoryStore, MongoClient, MongoStore, Stores},
    server::{self, AppState},
    services::{Analyzer, EmailQueue, EmailSender, HttpAnalyzer, HttpMailer, LogMailer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("mic_backend={},info", args.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  MIC submission backend");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
    info!("AI service: {}", args.ai_service_url);
    info!(
        "Mail relay: {}",
        args.mail.relay_url.as_deref().unwrap_or("(none, log only)")
    );
    info!("Email workers: {} (queue {})", args.mail.workers, args.mail.queue_size);

    let jwt = match args.jwt_validator() {
        Ok(v) => v,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let stores = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(client) => Stores::from_backend(Arc::new(MongoStore::new(&client).await?), "mongodb"),
        Err(e) if args.dev_mode => {
            warn!("MongoDB unavailable ({}), using in-memory store", e);
            Stores::from_backend(Arc::new(MemoryStore::new()), "memory")
        }
        Err(e) => {
            error!("Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };

    let mailer: Arc<dyn EmailSender> = match args.mail.relay_url.clone() {
        Some(url) => Arc::new(HttpMailer::new(
            url,
            args.mail.from.clone(),
            args.mail.api_key.clone(),
            args.request_timeout(),
        )?),
        None => Arc::new(LogMailer),
    };
    let email = EmailQueue::start(mailer, args.queue_config());

    let analyzer: Arc<dyn Analyzer> =
        Arc::new(HttpAnalyzer::new(&args.ai_service_url, args.request_timeout())?);

    let state = Arc::new(AppState::new(args, jwt, stores, email, analyzer));
    server::run(state).await?;

    Ok(())
}
