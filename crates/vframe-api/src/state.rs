//! Application state.

use std::sync::Arc;

use vframe_core::{
    EnqueueVideoService, JobDispatcher, JobQueryService, Storage, UnitOfWork,
};
use vframe_db::{DbConfig, PgUnitOfWork};
use vframe_queue::JobQueue;
use vframe_storage::{LocalStorage, StorageConfig};

use crate::auth::{CustomerAuthClient, TokenVerifier};
use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub enqueue: Arc<EnqueueVideoService>,
    pub queries: Arc<JobQueryService>,
    pub storage: Arc<dyn Storage>,
    pub auth: Arc<dyn TokenVerifier>,
}

impl AppState {
    /// Create production state: Postgres, local storage, Redis dispatch,
    /// customer-service auth.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let pool = vframe_db::connect(&DbConfig::from_env()).await?;
        vframe_db::run_migrations(&pool).await?;
        let uow: Arc<dyn UnitOfWork> = Arc::new(PgUnitOfWork::new(pool));

        let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new(StorageConfig::from_env())?);

        let dispatcher: Arc<dyn JobDispatcher> = Arc::new(JobQueue::from_env()?);

        let auth: Arc<dyn TokenVerifier> =
            Arc::new(CustomerAuthClient::new(config.customer_service_url.as_str())?);

        let enqueue = Arc::new(EnqueueVideoService::new(
            Arc::clone(&uow),
            Arc::clone(&storage),
            dispatcher,
        ));
        let queries = Arc::new(JobQueryService::new(uow));

        Ok(Self {
            config,
            enqueue,
            queries,
            storage,
            auth,
        })
    }
}
