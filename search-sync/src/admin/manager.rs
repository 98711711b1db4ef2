//! Index lifecycle operations that do not depend on a record type.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use search_sync_repository::{create_index_body, AliasAction, IndexVersion, SearchEngineClient};
use search_sync_shared::IndexDescriptor;

use crate::errors::SearchSyncError;

/// Creates, drops and maintains indices.
///
/// `create_index` and `delete_index` are idempotent: "already exists" and
/// "not found" answers are treated as success. Every other engine error is
/// returned to the caller.
#[derive(Clone)]
pub struct IndexManager {
    engine: Arc<dyn SearchEngineClient>,
}

impl IndexManager {
    pub fn new(engine: Arc<dyn SearchEngineClient>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<dyn SearchEngineClient> {
        &self.engine
    }

    /// Create the descriptor's index with its settings, then apply its
    /// mapping.
    #[instrument(skip(self, descriptor), fields(index = %descriptor.index))]
    pub async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), SearchSyncError> {
        let body = create_index_body(descriptor.settings.as_ref(), None);
        match self.engine.create_index(&descriptor.index, Some(&body)).await {
            Ok(()) => info!("Index created"),
            Err(e) if e.is_already_exists() => info!("Index already exists"),
            Err(e) => return Err(e.into()),
        }
        self.update_mapping(descriptor).await
    }

    /// Drop `index`. Dropping an index that does not exist succeeds.
    #[instrument(skip(self))]
    pub async fn delete_index(&self, index: &str) -> Result<(), SearchSyncError> {
        match self.engine.delete_index(index).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                info!("Index does not exist, nothing to delete");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn refresh_index(&self, index: &str) -> Result<(), SearchSyncError> {
        self.engine.refresh_index(index).await?;
        Ok(())
    }

    /// Apply the descriptor's mapping, if it has one.
    pub async fn update_mapping(&self, descriptor: &IndexDescriptor) -> Result<(), SearchSyncError> {
        match &descriptor.mapping {
            Some(mapping) => {
                self.engine
                    .put_mapping(&descriptor.index, &descriptor.doc_type, mapping)
                    .await?;
                Ok(())
            }
            None => {
                debug!(index = %descriptor.index, doc_type = %descriptor.doc_type, "No mapping to apply");
                Ok(())
            }
        }
    }

    /// Delete every document of the descriptor's type, keeping the index.
    pub async fn clean_index(&self, descriptor: &IndexDescriptor) -> Result<u64, SearchSyncError> {
        let deleted = self
            .engine
            .delete_by_query(
                &descriptor.index,
                &descriptor.doc_type,
                &json!({ "match_all": {} }),
            )
            .await?;
        Ok(deleted)
    }

    pub async fn health_check(&self) -> Result<bool, SearchSyncError> {
        Ok(self.engine.health_check().await?)
    }

    /// Create a new, empty, timestamped version of the descriptor's index.
    ///
    /// The alias is not touched; see [`IndexManager::deploy_version`].
    pub async fn allocate_version(
        &self,
        descriptor: &IndexDescriptor,
    ) -> Result<IndexVersion, SearchSyncError> {
        let version = IndexVersion::allocate(&descriptor.index);
        self.create_index(&descriptor.for_index(&version.name))
            .await?;
        info!(alias = %version.alias, version = %version.name, "Allocated index version");
        Ok(version)
    }

    /// Version the alias currently points at.
    ///
    /// When several indices carry the alias the newest is reported.
    pub async fn current_version(&self, alias: &str) -> Result<Option<IndexVersion>, SearchSyncError> {
        let indices = self.engine.indices_for_alias(alias).await?;
        Ok(indices
            .iter()
            .filter_map(|name| IndexVersion::parse(alias, name))
            .max())
    }

    /// Every version of `alias`, oldest first.
    pub async fn versions(&self, alias: &str) -> Result<Vec<IndexVersion>, SearchSyncError> {
        let names = self
            .engine
            .list_indices(&IndexVersion::pattern(alias))
            .await?;
        let mut versions: Vec<IndexVersion> = names
            .iter()
            .filter_map(|name| IndexVersion::parse(alias, name))
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// Point the alias at `version`, detaching it from whatever it pointed at
    /// before, in one atomic alias update. Returns the previous versions.
    #[instrument(skip(self), fields(alias = %version.alias, version = %version.name))]
    pub async fn deploy_version(
        &self,
        version: &IndexVersion,
    ) -> Result<Vec<String>, SearchSyncError> {
        let previous: Vec<String> = self
            .engine
            .indices_for_alias(&version.alias)
            .await?
            .into_iter()
            .filter(|name| name != &version.name)
            .collect();

        let mut actions = vec![AliasAction::add(&version.name, &version.alias)];
        actions.extend(
            previous
                .iter()
                .map(|name| AliasAction::remove(name, &version.alias)),
        );
        self.engine.update_aliases(&actions).await?;

        info!(previous = ?previous, "Deployed index version");
        Ok(previous)
    }

    /// Delete every version of `alias` older than the current one. Returns the
    /// deleted versions.
    ///
    /// Nothing is deleted while the alias points at no version.
    #[instrument(skip(self))]
    pub async fn prune_versions(&self, alias: &str) -> Result<Vec<IndexVersion>, SearchSyncError> {
        let Some(current) = self.current_version(alias).await? else {
            warn!("Alias points at no version, skipping prune");
            return Ok(Vec::new());
        };

        let mut pruned = Vec::new();
        for version in self.versions(alias).await? {
            if version.is_older_than(&current) {
                self.delete_index(&version.name).await?;
                info!(version = %version.name, "Pruned index version");
                pruned.push(version);
            }
        }
        Ok(pruned)
    }
}
