//! Cluster relation reconciler against a real store

use async_trait::async_trait;
use relsync_config::ClusterBizOverrides;
use relsync_errors::{Error, NetworkError, SpaceError};
use relsync_events::{AppEvent, ClusterEvent};
use relsync_reconcile::ClusterRelationReconciler;
use relsync_space::{SpaceDetail, SpaceLookup};
use relsync_state::{queries, MetadataStore, PoolSettings};
use relsync_types::ClusterRelationKey;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Canned space lookup; unknown uids are not found
#[derive(Default)]
struct FakeSpaces {
    biz_ids: HashMap<String, i64>,
    broken: BTreeSet<String>,
    calls: AtomicUsize,
}

impl FakeSpaces {
    fn with(mut self, space_uid: &str, bk_biz_id: i64) -> Self {
        self.biz_ids.insert(space_uid.to_string(), bk_biz_id);
        self
    }

    fn broken(mut self, space_uid: &str) -> Self {
        self.broken.insert(space_uid.to_string());
        self
    }
}

#[async_trait]
impl SpaceLookup for FakeSpaces {
    async fn get_space_detail(&self, space_uid: &str) -> Result<SpaceDetail, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.contains(space_uid) {
            return Err(NetworkError::Timeout {
                url: "http://space".to_string(),
            }
            .into());
        }
        self.biz_ids
            .get(space_uid)
            .map(|bk_biz_id| SpaceDetail {
                space_uid: space_uid.to_string(),
                bk_biz_id: *bk_biz_id,
            })
            .ok_or_else(|| {
                SpaceError::NotFound {
                    space_uid: space_uid.to_string(),
                }
                .into()
            })
    }
}

async fn setup_store() -> (MetadataStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("relsync.sqlite");
    let store = MetadataStore::open(&db_path, PoolSettings::default())
        .await
        .unwrap();
    (store, temp_dir)
}

/// A project with a business binding and clusters
async fn seed_project(
    store: &MetadataStore,
    code: &str,
    project_id: &str,
    biz: Option<&str>,
    clusters: &[&str],
) {
    let mut tx = store.pool().begin().await.unwrap();
    queries::insert_space(&mut tx, "bkci", code, project_id, code).await.unwrap();
    if let Some(biz) = biz {
        let empty = serde_json::json!([]);
        queries::insert_space_resource(&mut tx, "bkci", code, "bkcc", Some(biz), &empty)
            .await
            .unwrap();
    }
    let dimensions: Vec<serde_json::Value> = clusters
        .iter()
        .map(|cluster| serde_json::json!({"cluster_id": cluster, "namespace": []}))
        .collect();
    queries::insert_space_resource(
        &mut tx,
        "bkci",
        code,
        "bcs",
        None,
        &serde_json::Value::Array(dimensions),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
}

async fn stored_keys(store: &MetadataStore) -> BTreeSet<ClusterRelationKey> {
    store
        .cluster_relations()
        .await
        .unwrap()
        .iter()
        .map(relsync_state::ClusterRelation::key)
        .collect()
}

fn reconciler(store: &MetadataStore, spaces: Arc<FakeSpaces>) -> ClusterRelationReconciler {
    ClusterRelationReconciler::new(store.clone(), spaces, ClusterBizOverrides::default())
}

#[tokio::test]
async fn empty_store_gains_the_owning_business_relation() {
    let (store, _temp_dir) = setup_store().await;
    seed_project(&store, "p1code", "P1", Some("2"), &["C1"]).await;

    let report = reconciler(&store, Arc::new(FakeSpaces::default()))
        .reconcile()
        .await
        .unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(report.lookup_failures, 1);
    assert_eq!(
        stored_keys(&store).await,
        BTreeSet::from([ClusterRelationKey::new("2", "2", "P1", "C1")])
    );
}

#[tokio::test]
async fn removed_binding_empties_the_store() {
    let (store, _temp_dir) = setup_store().await;
    seed_project(&store, "p1code", "P1", Some("2"), &["C1"]).await;
    let reconciler = reconciler(&store, Arc::new(FakeSpaces::default()));
    reconciler.reconcile().await.unwrap();

    let mut tx = store.pool().begin().await.unwrap();
    queries::delete_space_resources(&mut tx, "bkci", "p1code", "bcs")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let report = reconciler.reconcile().await.unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.added, 0);
    assert!(stored_keys(&store).await.is_empty());
}

#[tokio::test]
async fn container_space_adds_second_relation_and_rerun_is_idempotent() {
    let (store, _temp_dir) = setup_store().await;
    seed_project(&store, "p1code", "P1", Some("2"), &["C1", "C2"]).await;
    let spaces = Arc::new(FakeSpaces::default().with("bkci__p1code", -7));
    let reconciler = reconciler(&store, spaces.clone());

    let first = reconciler.reconcile().await.unwrap();
    assert_eq!(first.desired, 4);
    assert_eq!(first.added, 4);
    // One lookup per project, not per cluster
    assert_eq!(spaces.calls.load(Ordering::SeqCst), 1);

    let second = reconciler.reconcile().await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.deleted, 0);
    assert_eq!(second.refreshed, 4);

    assert_eq!(
        stored_keys(&store).await,
        BTreeSet::from([
            ClusterRelationKey::new("2", "2", "P1", "C1"),
            ClusterRelationKey::new("2", "-7", "P1", "C1"),
            ClusterRelationKey::new("2", "2", "P1", "C2"),
            ClusterRelationKey::new("2", "-7", "P1", "C2"),
        ])
    );
    assert_eq!(
        reconciler.list_biz_ids("C1").await.unwrap(),
        vec!["-7".to_string(), "2".to_string()]
    );
}

#[tokio::test]
async fn stored_set_converges_from_any_start() {
    let (store, _temp_dir) = setup_store().await;
    seed_project(&store, "p1code", "P1", Some("2"), &["C1"]).await;
    seed_project(&store, "p2code", "P2", Some("3"), &["C9"]).await;

    let stale = vec![
        ClusterRelationKey::new("2", "2", "P1", "C1"),
        ClusterRelationKey::new("2", "2", "P1", "C1"),
        ClusterRelationKey::new("9", "9", "P9", "C9"),
        ClusterRelationKey::new("3", "-1", "P2", "C9"),
    ];
    store.insert_cluster_relations(&stale, 1).await.unwrap();

    let report = reconciler(&store, Arc::new(FakeSpaces::default()))
        .reconcile()
        .await
        .unwrap();

    assert_eq!(report.refreshed, 2);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.added, 1);
    assert_eq!(
        stored_keys(&store).await,
        BTreeSet::from([
            ClusterRelationKey::new("2", "2", "P1", "C1"),
            ClusterRelationKey::new("3", "3", "P2", "C9"),
        ])
    );
    let rows = store.cluster_relations().await.unwrap();
    assert!(rows.iter().all(|row| row.last_check_time > 1));
}

#[tokio::test]
async fn override_supplies_the_related_business() {
    let (store, _temp_dir) = setup_store().await;
    seed_project(&store, "p1code", "P1", Some("2"), &["C1", "C2"]).await;
    seed_project(&store, "p2code", "P2", None, &["C3", "C4"]).await;

    let overrides = ClusterBizOverrides::parse("C2:5,C3:6,malformed,C4:");
    ClusterRelationReconciler::new(store.clone(), Arc::new(FakeSpaces::default()), overrides)
        .reconcile()
        .await
        .unwrap();

    assert_eq!(
        stored_keys(&store).await,
        BTreeSet::from([
            ClusterRelationKey::new("2", "2", "P1", "C1"),
            ClusterRelationKey::new("5", "5", "P1", "C2"),
            ClusterRelationKey::new("6", "6", "P2", "C3"),
        ])
    );
}

#[tokio::test]
async fn projects_without_id_or_business_are_skipped() {
    let (store, _temp_dir) = setup_store().await;
    seed_project(&store, "p1code", "P1", None, &["C1"]).await;

    // Cluster binding for a project with no space row
    let mut tx = store.pool().begin().await.unwrap();
    let empty = serde_json::json!([]);
    queries::insert_space_resource(&mut tx, "bkci", "ghost", "bkcc", Some("4"), &empty)
        .await
        .unwrap();
    queries::insert_space_resource(
        &mut tx,
        "bkci",
        "ghost",
        "bcs",
        None,
        &serde_json::json!([{"cluster_id": "C5"}]),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let spaces = Arc::new(FakeSpaces::default());
    let report = reconciler(&store, spaces.clone()).reconcile().await.unwrap();

    assert_eq!(report.desired, 0);
    assert!(stored_keys(&store).await.is_empty());
    assert_eq!(spaces.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_lookup_only_skips_that_project() {
    let (store, _temp_dir) = setup_store().await;
    seed_project(&store, "p1code", "P1", Some("2"), &["C1"]).await;
    seed_project(&store, "p2code", "P2", Some("3"), &["C2"]).await;

    let spaces = Arc::new(
        FakeSpaces::default()
            .broken("bkci__p1code")
            .with("bkci__p2code", -8),
    );
    let (tx, mut rx) = relsync_events::channel();
    let report = reconciler(&store, spaces)
        .with_event_sender(tx)
        .reconcile()
        .await
        .unwrap();

    assert_eq!(report.lookup_failures, 1);
    assert_eq!(
        stored_keys(&store).await,
        BTreeSet::from([
            ClusterRelationKey::new("2", "2", "P1", "C1"),
            ClusterRelationKey::new("3", "3", "P2", "C2"),
            ClusterRelationKey::new("3", "-8", "P2", "C2"),
        ])
    );

    let mut failures = Vec::new();
    let mut completed = false;
    while let Ok(message) = rx.try_recv() {
        match message.event {
            AppEvent::Cluster(ClusterEvent::SpaceLookupFailed {
                project_code,
                not_found,
                ..
            }) => failures.push((project_code, not_found)),
            AppEvent::Cluster(ClusterEvent::ReconcileCompleted { .. }) => completed = true,
            _ => {}
        }
    }
    assert_eq!(failures, vec![("p1code".to_string(), false)]);
    assert!(completed);
}

#[tokio::test]
async fn duplicate_business_bindings_keep_the_latest() {
    let (store, _temp_dir) = setup_store().await;
    seed_project(&store, "p1code", "P1", Some("2"), &["C1"]).await;
    let mut tx = store.pool().begin().await.unwrap();
    let empty = serde_json::json!([]);
    queries::insert_space_resource(&mut tx, "bkci", "p1code", "bkcc", Some("3"), &empty)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    reconciler(&store, Arc::new(FakeSpaces::default()))
        .reconcile()
        .await
        .unwrap();

    assert_eq!(
        stored_keys(&store).await,
        BTreeSet::from([ClusterRelationKey::new("3", "3", "P1", "C1")])
    );
}
