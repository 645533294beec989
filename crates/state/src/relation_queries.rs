//! Space and cluster relation queries

use crate::models::{ClusterRelation, Space, SpaceResource};
use relsync_errors::Error;
use relsync_types::ClusterRelationKey;
use sqlx::{query, query_as, query_scalar, QueryBuilder, Sqlite, Transaction};

/// Rows per statement for bulk writes, well under `SQLite`'s bind limit
pub(crate) const BATCH_SIZE: usize = 500;

/// Get all spaces of a type
pub async fn get_spaces_by_type(
    tx: &mut Transaction<'_, Sqlite>,
    space_type_id: &str,
) -> Result<Vec<Space>, Error> {
    let spaces = query_as::<_, Space>(
        "SELECT id, space_type_id, space_id, space_code, space_name
         FROM spaces WHERE space_type_id = ?1 ORDER BY id",
    )
    .bind(space_type_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(spaces)
}

/// Get a single space by type and id
pub async fn get_space(
    tx: &mut Transaction<'_, Sqlite>,
    space_type_id: &str,
    space_id: &str,
) -> Result<Option<Space>, Error> {
    let space = query_as::<_, Space>(
        "SELECT id, space_type_id, space_id, space_code, space_name
         FROM spaces WHERE space_type_id = ?1 AND space_id = ?2",
    )
    .bind(space_type_id)
    .bind(space_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(space)
}

/// Add a space
pub async fn insert_space(
    tx: &mut Transaction<'_, Sqlite>,
    space_type_id: &str,
    space_id: &str,
    space_code: &str,
    space_name: &str,
) -> Result<i64, Error> {
    let result = query(
        "INSERT INTO spaces (space_type_id, space_id, space_code, space_name)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(space_type_id)
    .bind(space_id)
    .bind(space_code)
    .bind(space_name)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Get space resources of one `(space type, resource type)` pair in id order
pub async fn get_space_resources(
    tx: &mut Transaction<'_, Sqlite>,
    space_type_id: &str,
    resource_type: &str,
) -> Result<Vec<SpaceResource>, Error> {
    let resources = query_as::<_, SpaceResource>(
        "SELECT id, space_type_id, space_id, resource_type, resource_id, dimension_values
         FROM space_resources
         WHERE space_type_id = ?1 AND resource_type = ?2
         ORDER BY id",
    )
    .bind(space_type_id)
    .bind(resource_type)
    .fetch_all(&mut **tx)
    .await?;
    Ok(resources)
}

/// Add a space resource
pub async fn insert_space_resource(
    tx: &mut Transaction<'_, Sqlite>,
    space_type_id: &str,
    space_id: &str,
    resource_type: &str,
    resource_id: Option<&str>,
    dimension_values: &serde_json::Value,
) -> Result<i64, Error> {
    let dimensions = serde_json::to_string(dimension_values)?;
    let result = query(
        "INSERT INTO space_resources
             (space_type_id, space_id, resource_type, resource_id, dimension_values)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(space_type_id)
    .bind(space_id)
    .bind(resource_type)
    .bind(resource_id)
    .bind(dimensions)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Remove the resources of one type bound to a space
pub async fn delete_space_resources(
    tx: &mut Transaction<'_, Sqlite>,
    space_type_id: &str,
    space_id: &str,
    resource_type: &str,
) -> Result<u64, Error> {
    let result = query(
        "DELETE FROM space_resources
         WHERE space_type_id = ?1 AND space_id = ?2 AND resource_type = ?3",
    )
    .bind(space_type_id)
    .bind(space_id)
    .bind(resource_type)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

/// Get every stored cluster relation in id order
pub async fn get_cluster_relations(
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<Vec<ClusterRelation>, Error> {
    let rows = query_as::<_, ClusterRelation>(
        "SELECT id, related_bk_biz_id, bk_biz_id, project_id, cluster_id, last_check_time
         FROM cluster_relations ORDER BY id",
    )
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Set the check time of the given relation rows
pub async fn refresh_cluster_relations(
    tx: &mut Transaction<'_, Sqlite>,
    ids: &[i64],
    checked_at: i64,
) -> Result<u64, Error> {
    let mut affected = 0;
    for chunk in ids.chunks(BATCH_SIZE) {
        let mut builder =
            QueryBuilder::<Sqlite>::new("UPDATE cluster_relations SET last_check_time = ");
        builder.push_bind(checked_at);
        builder.push(" WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        affected += builder.build().execute(&mut **tx).await?.rows_affected();
    }
    Ok(affected)
}

/// Delete the given relation rows
pub async fn delete_cluster_relations(
    tx: &mut Transaction<'_, Sqlite>,
    ids: &[i64],
) -> Result<u64, Error> {
    let mut affected = 0;
    for chunk in ids.chunks(BATCH_SIZE) {
        let mut builder =
            QueryBuilder::<Sqlite>::new("DELETE FROM cluster_relations WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in chunk {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
        affected += builder.build().execute(&mut **tx).await?.rows_affected();
    }
    Ok(affected)
}

/// Insert one relation row per key
pub async fn insert_cluster_relations(
    tx: &mut Transaction<'_, Sqlite>,
    keys: &[ClusterRelationKey],
    checked_at: i64,
) -> Result<u64, Error> {
    let mut affected = 0;
    for chunk in keys.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO cluster_relations
                 (related_bk_biz_id, bk_biz_id, project_id, cluster_id, last_check_time) ",
        );
        builder.push_values(chunk, |mut row, key| {
            row.push_bind(key.related_bk_biz_id.clone())
                .push_bind(key.bk_biz_id.clone())
                .push_bind(key.project_id.clone())
                .push_bind(key.cluster_id.clone())
                .push_bind(checked_at);
        });
        affected += builder.build().execute(&mut **tx).await?.rows_affected();
    }
    Ok(affected)
}

/// Distinct business ids related to a cluster, in numeric order
pub async fn get_cluster_biz_ids(
    tx: &mut Transaction<'_, Sqlite>,
    cluster_id: &str,
) -> Result<Vec<String>, Error> {
    let ids = query_scalar::<_, String>(
        "SELECT bk_biz_id FROM (
             SELECT DISTINCT bk_biz_id FROM cluster_relations WHERE cluster_id = ?1
         )
         ORDER BY CAST(bk_biz_id AS INTEGER), bk_biz_id",
    )
    .bind(cluster_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(ids)
}
