//! Dependency initialization and wiring.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use search_sync_repository::{OpenSearchEngine, SearchEngineClient};

use crate::admin::{IndexAdministrator, IndexManager};
use crate::config::{ConnectionMode, SearchSyncConfig};
use crate::errors::SearchSyncError;
use crate::indexable::Indexable;
use crate::record::Record;
use crate::runtime::RuntimeContext;
use crate::search::SearchService;
use crate::store::RecordStore;
use crate::synchronizer::{ChannelTaskQueue, IndexSynchronizer, TaskWorker};

/// Container for all initialized dependencies.
///
/// Record-kind services are built from it with the `*_for` constructors, so
/// every kind shares one engine client, one queue and one runtime context.
pub struct Dependencies {
    pub config: SearchSyncConfig,
    pub engine: Arc<dyn SearchEngineClient>,
    pub manager: IndexManager,
    pub runtime: RuntimeContext,
    pub queue: Arc<ChannelTaskQueue>,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`SearchSyncConfig::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(SearchSyncError)` - If the engine is unreachable (only in fail-fast mode)
    pub async fn new() -> Result<Self, SearchSyncError> {
        Self::from_config(SearchSyncConfig::from_env()).await
    }

    /// Initialize dependencies from an explicit configuration.
    pub async fn from_config(config: SearchSyncConfig) -> Result<Self, SearchSyncError> {
        info!(
            engine_url = %config.engine_url,
            default_index = %config.default_index,
            task_lane = %config.task_lane,
            page_style = ?config.page_style,
            connection_mode = ?config.connection_mode,
            retry_interval_secs = config.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let engine = Self::connect_to_engine(&config).await?;
        info!("Search engine connection established");

        Ok(Self::with_engine(config, engine))
    }

    /// Wire dependencies around an already connected engine client.
    pub fn with_engine(config: SearchSyncConfig, engine: Arc<dyn SearchEngineClient>) -> Self {
        Self {
            manager: IndexManager::new(engine.clone()),
            runtime: RuntimeContext::new(config.page_style),
            queue: Arc::new(ChannelTaskQueue::default()),
            engine,
            config,
        }
    }

    pub fn synchronizer_for<R: Record>(
        &self,
        indexable: Arc<Indexable<R>>,
        store: Arc<dyn RecordStore<R>>,
    ) -> IndexSynchronizer<R> {
        IndexSynchronizer::new(
            indexable,
            self.engine.clone(),
            store,
            self.queue.clone(),
            self.runtime.clone(),
        )
    }

    pub fn search_service_for<R: Record>(
        &self,
        indexable: Arc<Indexable<R>>,
        store: Arc<dyn RecordStore<R>>,
    ) -> SearchService<R> {
        SearchService::new(
            indexable,
            self.engine.clone(),
            store,
            self.queue.clone(),
            self.runtime.clone(),
        )
        .with_max_backfill_rounds(self.config.max_backfill_rounds)
    }

    pub fn administrator_for<R: Record>(
        &self,
        indexable: Arc<Indexable<R>>,
        store: Arc<dyn RecordStore<R>>,
    ) -> IndexAdministrator<R> {
        IndexAdministrator::new(indexable, self.engine.clone(), store)
            .with_batch_size(self.config.reindex_batch_size)
    }

    /// Open the configured task lane and return a worker draining it.
    pub fn task_worker(&self) -> Result<TaskWorker, SearchSyncError> {
        let receiver = self.queue.open_lane(&self.config.task_lane)?;
        Ok(TaskWorker::new(self.config.task_lane.clone(), receiver))
    }

    /// Connect to the engine with retry logic based on connection mode.
    async fn connect_to_engine(
        config: &SearchSyncConfig,
    ) -> Result<Arc<dyn SearchEngineClient>, SearchSyncError> {
        loop {
            match Self::try_connect(config).await {
                Ok(engine) => return Ok(engine),
                Err(e) => match config.connection_mode {
                    ConnectionMode::FailFast => {
                        return Err(SearchSyncError::config(format!(
                            "Failed to connect to search engine: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            engine_url = %config.engine_url,
                            error = %e,
                            retry_interval_secs = config.retry_interval.as_secs(),
                            "Failed to connect to search engine, retrying..."
                        );
                        sleep(config.retry_interval.max(Duration::from_millis(100))).await;
                    }
                },
            }
        }
    }

    /// Build a client and ping the engine once.
    async fn try_connect(
        config: &SearchSyncConfig,
    ) -> Result<Arc<dyn SearchEngineClient>, SearchSyncError> {
        let engine = OpenSearchEngine::new(config.engine_config())?;
        if !engine.health_check().await? {
            return Err(SearchSyncError::config("search engine ping was not successful"));
        }
        Ok(Arc::new(engine))
    }
}
