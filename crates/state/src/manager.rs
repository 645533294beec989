//! Metadata store handle

use crate::models::{
    ClusterRelation, DataBusConfig, DataLink, DataSource, ResultTableConfig, SinkComponent, Space,
    SpaceResource,
};
use crate::queries::{self, DataLinkUpsert};
use crate::PoolSettings;
use relsync_errors::Error;
use relsync_types::{ClusterRelationKey, DataLinkStrategy, SinkKind};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;
use std::path::Path;

/// Everything written when a data-bus is linked
#[derive(Debug, Clone)]
pub struct DataLinkCommit {
    pub bk_tenant_id: String,
    pub namespace: String,
    pub data_link_name: String,
    pub strategy: DataLinkStrategy,
    pub bk_data_id: i64,
    pub table_ids: Vec<String>,
    pub databus_id: i64,
    /// Component ids grouped by kind so each table takes one update
    pub sink_ids: BTreeMap<SinkKind, Vec<i64>>,
    pub result_table_ids: Vec<i64>,
}

/// Handle to the metadata store
///
/// Reads run in their own short transaction. Writes that must land together
/// go through a single method that owns the transaction.
#[derive(Clone)]
pub struct MetadataStore {
    pool: Pool<Sqlite>,
}

impl MetadataStore {
    /// Open the store at `db_path` and apply pending migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(db_path: &Path, settings: PoolSettings) -> Result<Self, Error> {
        let pool = crate::create_pool_with(db_path, settings).await?;
        crate::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn spaces_by_type(&self, space_type_id: &str) -> Result<Vec<Space>, Error> {
        let mut tx = self.pool.begin().await?;
        let spaces = queries::get_spaces_by_type(&mut tx, space_type_id).await?;
        tx.commit().await?;
        Ok(spaces)
    }

    pub async fn space(&self, space_type_id: &str, space_id: &str) -> Result<Option<Space>, Error> {
        let mut tx = self.pool.begin().await?;
        let space = queries::get_space(&mut tx, space_type_id, space_id).await?;
        tx.commit().await?;
        Ok(space)
    }

    pub async fn space_resources(
        &self,
        space_type_id: &str,
        resource_type: &str,
    ) -> Result<Vec<SpaceResource>, Error> {
        let mut tx = self.pool.begin().await?;
        let resources = queries::get_space_resources(&mut tx, space_type_id, resource_type).await?;
        tx.commit().await?;
        Ok(resources)
    }

    pub async fn cluster_relations(&self) -> Result<Vec<ClusterRelation>, Error> {
        let mut tx = self.pool.begin().await?;
        let rows = queries::get_cluster_relations(&mut tx).await?;
        tx.commit().await?;
        Ok(rows)
    }

    pub async fn refresh_cluster_relations(
        &self,
        ids: &[i64],
        checked_at: i64,
    ) -> Result<u64, Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let affected = queries::refresh_cluster_relations(&mut tx, ids, checked_at).await?;
        tx.commit().await?;
        Ok(affected)
    }

    pub async fn delete_cluster_relations(&self, ids: &[i64]) -> Result<u64, Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let affected = queries::delete_cluster_relations(&mut tx, ids).await?;
        tx.commit().await?;
        Ok(affected)
    }

    pub async fn insert_cluster_relations(
        &self,
        keys: &[ClusterRelationKey],
        checked_at: i64,
    ) -> Result<u64, Error> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        let affected = queries::insert_cluster_relations(&mut tx, keys, checked_at).await?;
        tx.commit().await?;
        Ok(affected)
    }

    pub async fn cluster_biz_ids(&self, cluster_id: &str) -> Result<Vec<String>, Error> {
        let mut tx = self.pool.begin().await?;
        let ids = queries::get_cluster_biz_ids(&mut tx, cluster_id).await?;
        tx.commit().await?;
        Ok(ids)
    }

    pub async fn unlinked_databuses(
        &self,
        bk_tenant_id: &str,
        namespace: &str,
    ) -> Result<Vec<DataBusConfig>, Error> {
        let mut tx = self.pool.begin().await?;
        let buses = queries::get_unlinked_databuses(&mut tx, bk_tenant_id, namespace).await?;
        tx.commit().await?;
        Ok(buses)
    }

    pub async fn data_source(&self, bk_data_id: i64) -> Result<Option<DataSource>, Error> {
        let mut tx = self.pool.begin().await?;
        let source = queries::get_data_source(&mut tx, bk_data_id).await?;
        tx.commit().await?;
        Ok(source)
    }

    pub async fn sinks(
        &self,
        kind: SinkKind,
        bk_tenant_id: &str,
        namespace: &str,
        names: &[String],
    ) -> Result<Vec<SinkComponent>, Error> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let mut tx = self.pool.begin().await?;
        let sinks = queries::get_sinks(&mut tx, kind, bk_tenant_id, namespace, names).await?;
        tx.commit().await?;
        Ok(sinks)
    }

    pub async fn result_tables(
        &self,
        bk_tenant_id: &str,
        namespace: &str,
        names: &[String],
    ) -> Result<Vec<ResultTableConfig>, Error> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let mut tx = self.pool.begin().await?;
        let tables = queries::get_result_tables(&mut tx, bk_tenant_id, namespace, names).await?;
        tx.commit().await?;
        Ok(tables)
    }

    /// Upsert the link and stamp the bus, its sinks and result tables atomically
    ///
    /// Returns the stored link and whether it was newly created. Any failure
    /// rolls back every write of the commit.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub async fn commit_data_link(
        &self,
        commit: &DataLinkCommit,
    ) -> Result<(DataLink, bool), Error> {
        let mut tx = self.pool.begin().await?;

        let (link, created) = queries::upsert_data_link(
            &mut tx,
            &DataLinkUpsert {
                bk_tenant_id: &commit.bk_tenant_id,
                namespace: &commit.namespace,
                data_link_name: &commit.data_link_name,
                strategy: commit.strategy,
                bk_data_id: commit.bk_data_id,
                table_ids: &commit.table_ids,
            },
        )
        .await?;

        queries::set_databus_data_link_name(&mut tx, commit.databus_id, &commit.data_link_name)
            .await?;

        for (kind, ids) in &commit.sink_ids {
            queries::stamp_sinks(&mut tx, *kind, ids, &commit.data_link_name).await?;
        }

        if !commit.result_table_ids.is_empty() {
            queries::stamp_result_tables(&mut tx, &commit.result_table_ids, &commit.data_link_name)
                .await?;
        }

        // Dropping the transaction on an early return rolls it back
        tx.commit().await?;
        Ok((link, created))
    }
}
