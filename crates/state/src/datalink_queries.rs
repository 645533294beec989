//! Data-link component queries

use crate::models::{DataBusConfig, DataLink, DataSource, ResultTableConfig, SinkComponent};
use crate::relation_queries::BATCH_SIZE;
use relsync_errors::Error;
use relsync_types::{DataLinkStrategy, SinkKind};
use sqlx::{query, query_as, QueryBuilder, Row, Sqlite, Transaction};

/// Table holding the components of a sink kind
#[must_use]
pub fn sink_table(kind: SinkKind) -> &'static str {
    match kind {
        SinkKind::VmStorageBinding => "vm_storage_bindings",
        SinkKind::EsStorageBinding => "es_storage_bindings",
        SinkKind::DorisBinding => "doris_storage_bindings",
        SinkKind::ConditionalSink => "conditional_sinks",
    }
}

/// Values written when a data link is created or updated
#[derive(Debug, Clone)]
pub struct DataLinkUpsert<'a> {
    pub bk_tenant_id: &'a str,
    pub namespace: &'a str,
    pub data_link_name: &'a str,
    pub strategy: DataLinkStrategy,
    pub bk_data_id: i64,
    pub table_ids: &'a [String],
}

/// Add a data source
pub async fn insert_data_source(
    tx: &mut Transaction<'_, Sqlite>,
    bk_data_id: i64,
    data_name: &str,
    etl_config: &str,
) -> Result<(), Error> {
    query("INSERT INTO data_sources (bk_data_id, data_name, etl_config) VALUES (?1, ?2, ?3)")
        .bind(bk_data_id)
        .bind(data_name)
        .bind(etl_config)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Get a data source by id
pub async fn get_data_source(
    tx: &mut Transaction<'_, Sqlite>,
    bk_data_id: i64,
) -> Result<Option<DataSource>, Error> {
    let source = query_as::<_, DataSource>(
        "SELECT bk_data_id, data_name, etl_config FROM data_sources WHERE bk_data_id = ?1",
    )
    .bind(bk_data_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(source)
}

/// Add a data-bus with an empty link name
pub async fn insert_databus(
    tx: &mut Transaction<'_, Sqlite>,
    bk_tenant_id: &str,
    namespace: &str,
    name: &str,
    bk_data_id: i64,
    sink_entries: &[String],
) -> Result<i64, Error> {
    let sink_names = serde_json::to_string(sink_entries)?;
    let result = query(
        "INSERT INTO databus_configs (bk_tenant_id, namespace, name, bk_data_id, sink_names)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(bk_tenant_id)
    .bind(namespace)
    .bind(name)
    .bind(bk_data_id)
    .bind(sink_names)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Get a data-bus by name
pub async fn get_databus(
    tx: &mut Transaction<'_, Sqlite>,
    bk_tenant_id: &str,
    namespace: &str,
    name: &str,
) -> Result<Option<DataBusConfig>, Error> {
    let bus = query_as::<_, DataBusConfig>(
        "SELECT id, bk_tenant_id, namespace, name, data_link_name, bk_data_id, sink_names
         FROM databus_configs
         WHERE bk_tenant_id = ?1 AND namespace = ?2 AND name = ?3",
    )
    .bind(bk_tenant_id)
    .bind(namespace)
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(bus)
}

/// Get every data-bus of a tenant namespace whose link name is empty
pub async fn get_unlinked_databuses(
    tx: &mut Transaction<'_, Sqlite>,
    bk_tenant_id: &str,
    namespace: &str,
) -> Result<Vec<DataBusConfig>, Error> {
    let buses = query_as::<_, DataBusConfig>(
        "SELECT id, bk_tenant_id, namespace, name, data_link_name, bk_data_id, sink_names
         FROM databus_configs
         WHERE bk_tenant_id = ?1 AND namespace = ?2 AND data_link_name = ''
         ORDER BY id",
    )
    .bind(bk_tenant_id)
    .bind(namespace)
    .fetch_all(&mut **tx)
    .await?;
    Ok(buses)
}

/// Set the link name of a data-bus
pub async fn set_databus_data_link_name(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    data_link_name: &str,
) -> Result<(), Error> {
    query("UPDATE databus_configs SET data_link_name = ?1 WHERE id = ?2")
        .bind(data_link_name)
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Add a sink component
///
/// `bkbase_result_table_name` is ignored for conditional sinks.
pub async fn insert_sink(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SinkKind,
    bk_tenant_id: &str,
    namespace: &str,
    name: &str,
    bkbase_result_table_name: &str,
) -> Result<i64, Error> {
    let table = sink_table(kind);
    let sql = if kind.references_result_table() {
        format!(
            "INSERT INTO {table} (bk_tenant_id, namespace, name, bkbase_result_table_name)
             VALUES (?1, ?2, ?3, ?4)"
        )
    } else {
        format!("INSERT INTO {table} (bk_tenant_id, namespace, name) VALUES (?1, ?2, ?3)")
    };

    let mut statement = query(&sql).bind(bk_tenant_id).bind(namespace).bind(name);
    if kind.references_result_table() {
        statement = statement.bind(bkbase_result_table_name);
    }
    let result = statement.execute(&mut **tx).await?;
    Ok(result.last_insert_rowid())
}

/// Get the components of one kind with the given names
///
/// Names that do not exist are simply absent from the result.
pub async fn get_sinks(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SinkKind,
    bk_tenant_id: &str,
    namespace: &str,
    names: &[String],
) -> Result<Vec<SinkComponent>, Error> {
    let columns = if kind.references_result_table() {
        "id, name, data_link_name, bkbase_result_table_name"
    } else {
        "id, name, data_link_name"
    };

    let mut sinks = Vec::with_capacity(names.len());
    for chunk in names.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {columns} FROM {} WHERE bk_tenant_id = ",
            sink_table(kind)
        ));
        builder.push_bind(bk_tenant_id);
        builder.push(" AND namespace = ");
        builder.push_bind(namespace);
        builder.push(" AND name IN (");
        let mut separated = builder.separated(", ");
        for name in chunk {
            separated.push_bind(name.as_str());
        }
        separated.push_unseparated(") ORDER BY id");

        for row in builder.build().fetch_all(&mut **tx).await? {
            let bkbase_result_table_name = if kind.references_result_table() {
                Some(row.try_get("bkbase_result_table_name")?)
            } else {
                None
            };
            sinks.push(SinkComponent {
                kind,
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                data_link_name: row.try_get("data_link_name")?,
                bkbase_result_table_name,
            });
        }
    }
    Ok(sinks)
}

/// Set the link name of components of one kind
pub async fn stamp_sinks(
    tx: &mut Transaction<'_, Sqlite>,
    kind: SinkKind,
    ids: &[i64],
    data_link_name: &str,
) -> Result<u64, Error> {
    stamp_rows(tx, sink_table(kind), ids, data_link_name).await
}

/// Add a result table with an empty link name
pub async fn insert_result_table(
    tx: &mut Transaction<'_, Sqlite>,
    bk_tenant_id: &str,
    namespace: &str,
    name: &str,
    table_id: &str,
) -> Result<i64, Error> {
    let result = query(
        "INSERT INTO result_table_configs (bk_tenant_id, namespace, name, table_id)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(bk_tenant_id)
    .bind(namespace)
    .bind(name)
    .bind(table_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Get the result tables with the given names
pub async fn get_result_tables(
    tx: &mut Transaction<'_, Sqlite>,
    bk_tenant_id: &str,
    namespace: &str,
    names: &[String],
) -> Result<Vec<ResultTableConfig>, Error> {
    let mut tables = Vec::with_capacity(names.len());
    for chunk in names.chunks(BATCH_SIZE) {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, bk_tenant_id, namespace, name, table_id, data_link_name
             FROM result_table_configs WHERE bk_tenant_id = ",
        );
        builder.push_bind(bk_tenant_id);
        builder.push(" AND namespace = ");
        builder.push_bind(namespace);
        builder.push(" AND name IN (");
        let mut separated = builder.separated(", ");
        for name in chunk {
            separated.push_bind(name.as_str());
        }
        separated.push_unseparated(") ORDER BY id");

        tables.extend(
            builder
                .build_query_as::<ResultTableConfig>()
                .fetch_all(&mut **tx)
                .await?,
        );
    }
    Ok(tables)
}

/// Set the link name of result tables
pub async fn stamp_result_tables(
    tx: &mut Transaction<'_, Sqlite>,
    ids: &[i64],
    data_link_name: &str,
) -> Result<u64, Error> {
    stamp_rows(tx, "result_table_configs", ids, data_link_name).await
}

async fn stamp_rows(
    tx: &mut Transaction<'_, Sqlite>,
    table: &'static str,
    ids: &[i64],
    data_link_name: &str,
) -> Result<u64, Error> {
    let mut affected = 0;
    for chunk in ids.chunks(BATCH_SIZE) {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("UPDATE {table} SET data_link_name = "));
        builder.push_bind(data_link_name);
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

/// Get a data link by its identity
pub async fn get_data_link(
    tx: &mut Transaction<'_, Sqlite>,
    bk_tenant_id: &str,
    namespace: &str,
    data_link_name: &str,
) -> Result<Option<DataLink>, Error> {
    let link = query_as::<_, DataLink>(
        "SELECT id, bk_tenant_id, namespace, data_link_name, data_link_strategy, bk_data_id,
                table_ids, created_at, updated_at
         FROM data_links
         WHERE bk_tenant_id = ?1 AND namespace = ?2 AND data_link_name = ?3",
    )
    .bind(bk_tenant_id)
    .bind(namespace)
    .bind(data_link_name)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(link)
}

/// Create or update a data link keyed by `(tenant, namespace, name)`
///
/// Returns the stored row and whether it was newly created.
pub async fn upsert_data_link(
    tx: &mut Transaction<'_, Sqlite>,
    link: &DataLinkUpsert<'_>,
) -> Result<(DataLink, bool), Error> {
    let existed = get_data_link(tx, link.bk_tenant_id, link.namespace, link.data_link_name)
        .await?
        .is_some();
    let table_ids = serde_json::to_string(link.table_ids)?;
    let now = chrono::Utc::now().timestamp();

    let stored = query_as::<_, DataLink>(
        "INSERT INTO data_links
             (bk_tenant_id, namespace, data_link_name, data_link_strategy, bk_data_id,
              table_ids, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
         ON CONFLICT (bk_tenant_id, namespace, data_link_name) DO UPDATE SET
             data_link_strategy = excluded.data_link_strategy,
             bk_data_id = excluded.bk_data_id,
             table_ids = excluded.table_ids,
             updated_at = excluded.updated_at
         RETURNING id, bk_tenant_id, namespace, data_link_name, data_link_strategy, bk_data_id,
                   table_ids, created_at, updated_at",
    )
    .bind(link.bk_tenant_id)
    .bind(link.namespace)
    .bind(link.data_link_name)
    .bind(link.strategy.as_str())
    .bind(link.bk_data_id)
    .bind(table_ids)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    Ok((stored, !existed))
}
