//! Database models for the metadata store

use relsync_errors::{Error, StateError};
use relsync_types::{ClusterRelationKey, DataLinkStrategy, SinkKind};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Decode a JSON array column, reporting the table on failure
fn decode_json_column<T: serde::de::DeserializeOwned>(table: &str, raw: &str) -> Result<T, Error> {
    serde_json::from_str(raw).map_err(|e| {
        StateError::CorruptedRow {
            table: table.to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// A space record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Space {
    pub id: i64,
    pub space_type_id: String,
    pub space_id: String,
    pub space_code: String,
    pub space_name: String,
}

/// A typed association between a space and an external resource
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SpaceResource {
    pub id: i64,
    pub space_type_id: String,
    pub space_id: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    /// JSON array of dimension objects
    pub dimension_values: String,
}

impl SpaceResource {
    /// Cluster ids named by the dimension list, in list order
    ///
    /// Entries without a non-empty `cluster_id` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StateError::CorruptedRow` if the column is not a JSON array.
    pub fn cluster_ids(&self) -> Result<Vec<String>, Error> {
        let dimensions: Vec<serde_json::Value> =
            decode_json_column("space_resources", &self.dimension_values)?;
        Ok(dimensions
            .iter()
            .filter_map(|dimension| dimension.get("cluster_id"))
            .filter_map(serde_json::Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// A persisted cluster relation row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ClusterRelation {
    pub id: i64,
    pub related_bk_biz_id: String,
    pub bk_biz_id: String,
    pub project_id: String,
    pub cluster_id: String,
    pub last_check_time: i64,
}

impl ClusterRelation {
    #[must_use]
    pub fn key(&self) -> ClusterRelationKey {
        ClusterRelationKey::new(
            self.related_bk_biz_id.clone(),
            self.bk_biz_id.clone(),
            self.project_id.clone(),
            self.cluster_id.clone(),
        )
    }
}

/// An upstream data source
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DataSource {
    pub bk_data_id: i64,
    pub data_name: String,
    pub etl_config: String,
}

/// A data-bus record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DataBusConfig {
    pub id: i64,
    pub bk_tenant_id: String,
    pub namespace: String,
    pub name: String,
    pub data_link_name: String,
    pub bk_data_id: i64,
    /// JSON array of `kind:name` entries
    pub sink_names: String,
}

impl DataBusConfig {
    /// Decode the sink reference list
    ///
    /// # Errors
    ///
    /// Returns `StateError::CorruptedRow` if the column is not a JSON array of strings.
    pub fn sink_entries(&self) -> Result<Vec<String>, Error> {
        decode_json_column("databus_configs", &self.sink_names)
    }
}

/// A sink component of any kind
///
/// Built by hand because the kind comes from the table the row was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkComponent {
    pub kind: SinkKind,
    pub id: i64,
    pub name: String,
    pub data_link_name: String,
    /// Empty for storage bindings without a reference; `None` for conditional sinks
    pub bkbase_result_table_name: Option<String>,
}

impl SinkComponent {
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        !self.data_link_name.is_empty()
    }
}

/// A result table record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ResultTableConfig {
    pub id: i64,
    pub bk_tenant_id: String,
    pub namespace: String,
    pub name: String,
    pub table_id: String,
    pub data_link_name: String,
}

impl ResultTableConfig {
    #[must_use]
    pub fn is_claimed(&self) -> bool {
        !self.data_link_name.is_empty()
    }
}

/// A data link record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DataLink {
    pub id: i64,
    pub bk_tenant_id: String,
    pub namespace: String,
    pub data_link_name: String,
    pub data_link_strategy: String,
    pub bk_data_id: i64,
    /// JSON array of table ids
    pub table_ids: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl DataLink {
    /// Parse the stored strategy
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not a known strategy.
    pub fn strategy(&self) -> Result<DataLinkStrategy, Error> {
        self.data_link_strategy.parse().map_err(Error::from)
    }

    /// Decode the table id list
    ///
    /// # Errors
    ///
    /// Returns `StateError::CorruptedRow` if the column is not a JSON array of strings.
    pub fn table_ids(&self) -> Result<Vec<String>, Error> {
        decode_json_column("data_links", &self.table_ids)
    }
}
