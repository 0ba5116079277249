//! Frame-extraction worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vframe_core::{
    FrameExtractor, Notifier, ProcessVideoService, Storage, UnitOfWork,
};
use vframe_db::{DbConfig, PgUnitOfWork};
use vframe_media::{ExtractorConfig, FfmpegExtractor};
use vframe_notify::{HttpNotifier, NotifierConfig};
use vframe_queue::{JobQueue, QueueConfig};
use vframe_storage::{LocalStorage, StorageConfig};
use vframe_worker::{JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vframe=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vframe-worker");

    // Load configuration
    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    // Wire up the process orchestrator's collaborators
    let pool = match vframe_db::connect(&DbConfig::from_env()).await {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    let uow: Arc<dyn UnitOfWork> = Arc::new(PgUnitOfWork::new(pool));

    let storage: Arc<dyn Storage> = match LocalStorage::new(StorageConfig::from_env()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to initialize storage: {}", e);
            std::process::exit(1);
        }
    };

    let extractor: Arc<dyn FrameExtractor> =
        Arc::new(FfmpegExtractor::new(ExtractorConfig::from_env()));

    let notifier: Arc<dyn Notifier> = match HttpNotifier::new(NotifierConfig::from_env()) {
        Ok(n) => Arc::new(n),
        Err(e) => {
            error!("Failed to create notifier: {}", e);
            std::process::exit(1);
        }
    };

    let processor = ProcessVideoService::new(uow, storage, extractor, notifier);

    // Create queue client
    let queue = match JobQueue::new(QueueConfig::from_env()) {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    // Create executor
    let executor = Arc::new(JobExecutor::new(config, queue, processor));

    // Setup signal handler
    let shutdown_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_executor.shutdown();
    });

    // Run executor
    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
