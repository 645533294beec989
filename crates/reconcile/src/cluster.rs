//! Cluster to business relation reconciliation

use relsync_config::ClusterBizOverrides;
use relsync_errors::{Error, UserFacingError};
use relsync_events::{AppEvent, ClusterEvent, EventEmitter, EventSender};
use relsync_space::SpaceLookup;
use relsync_state::{MetadataStore, SpaceResource};
use relsync_types::{space_uid, ClusterReconcileReport, ClusterRelationKey, SpaceType};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

/// Relation keys derived from the space registry
struct DesiredRelations {
    keys: BTreeSet<ClusterRelationKey>,
    lookup_failures: usize,
}

/// Keeps `cluster_relations` consistent with the space registry
///
/// Every cluster bound to a project relates to the project's business. When
/// the project also has a container project space, the cluster relates to
/// that space's (negative) business id as well.
pub struct ClusterRelationReconciler {
    store: MetadataStore,
    space_lookup: Arc<dyn SpaceLookup>,
    overrides: ClusterBizOverrides,
    tx: Option<EventSender>,
}

impl EventEmitter for ClusterRelationReconciler {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }

    fn correlation_id(&self) -> Option<&str> {
        Some("cluster-relations")
    }
}

impl ClusterRelationReconciler {
    #[must_use]
    pub fn new(
        store: MetadataStore,
        space_lookup: Arc<dyn SpaceLookup>,
        overrides: ClusterBizOverrides,
    ) -> Self {
        Self {
            store,
            space_lookup,
            overrides,
            tx: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Bring the stored relations in line with the space registry
    ///
    /// Refresh, delete and insert each commit on their own, so a failure
    /// between them leaves the table partially reconciled until the next run.
    ///
    /// # Errors
    ///
    /// Returns an error only for store failures. Space lookup failures are
    /// logged and counted in the report.
    pub async fn reconcile(&self) -> Result<ClusterReconcileReport, Error> {
        let started = Instant::now();
        let desired = self.desired_relations().await?;

        let mut existing: BTreeMap<ClusterRelationKey, Vec<i64>> = BTreeMap::new();
        for row in self.store.cluster_relations().await? {
            existing.entry(row.key()).or_default().push(row.id);
        }

        let to_add: Vec<ClusterRelationKey> = desired
            .keys
            .iter()
            .filter(|key| !existing.contains_key(*key))
            .cloned()
            .collect();
        let mut to_refresh = Vec::new();
        let mut to_delete = Vec::new();
        for (key, ids) in &existing {
            if desired.keys.contains(key) {
                to_refresh.extend_from_slice(ids);
            } else {
                to_delete.extend_from_slice(ids);
            }
        }

        let now = chrono::Utc::now().timestamp();
        let refreshed = self.store.refresh_cluster_relations(&to_refresh, now).await?;
        let deleted = self.store.delete_cluster_relations(&to_delete).await?;
        let added = self.store.insert_cluster_relations(&to_add, now).await?;

        let report = ClusterReconcileReport {
            desired: desired.keys.len(),
            added: usize::try_from(added).unwrap_or(usize::MAX),
            refreshed: usize::try_from(refreshed).unwrap_or(usize::MAX),
            deleted: usize::try_from(deleted).unwrap_or(usize::MAX),
            lookup_failures: desired.lookup_failures,
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        self.emit(AppEvent::Cluster(ClusterEvent::ReconcileCompleted {
            report: report.clone(),
        }));

        Ok(report)
    }

    /// Distinct business ids related to a cluster, ascending
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub async fn list_biz_ids(&self, cluster_id: &str) -> Result<Vec<String>, Error> {
        self.store.cluster_biz_ids(cluster_id).await
    }

    async fn desired_relations(&self) -> Result<DesiredRelations, Error> {
        let project_type = SpaceType::Bkci.as_str();
        let cluster_resources = self
            .store
            .space_resources(project_type, SpaceType::Bcs.as_str())
            .await?;

        let project_ids: HashMap<String, String> = self
            .store
            .spaces_by_type(project_type)
            .await?
            .into_iter()
            .map(|space| (space.space_id, space.space_code))
            .collect();

        let related_biz_ids = project_businesses(
            self.store
                .space_resources(project_type, SpaceType::Bkcc.as_str())
                .await?,
        );

        let projects: BTreeSet<&str> = cluster_resources
            .iter()
            .map(|resource| resource.space_id.as_str())
            .collect();
        self.emit(AppEvent::Cluster(ClusterEvent::ReconcileStarted {
            projects: projects.len(),
            overrides: self.overrides.len(),
        }));

        let mut keys = BTreeSet::new();
        let mut container_biz_ids: HashMap<String, Option<i64>> = HashMap::new();
        let mut lookup_failures = 0;

        for resource in &cluster_resources {
            let project_code = resource.space_id.as_str();
            let cluster_ids = match resource.cluster_ids() {
                Ok(ids) => ids,
                Err(err) => {
                    self.emit_warning_with_context(
                        format!(
                            "unreadable dimension values for project {project_code} \
                             (resource {}), resource skipped",
                            resource.id
                        ),
                        err.user_message(),
                    );
                    continue;
                }
            };

            for cluster_id in cluster_ids {
                let related = self
                    .overrides
                    .get(&cluster_id)
                    .or_else(|| related_biz_ids.get(project_code).map(String::as_str));
                let (Some(project_id), Some(related)) = (project_ids.get(project_code), related)
                else {
                    tracing::debug!(
                        project_code,
                        cluster_id = %cluster_id,
                        "no project id or related business, cluster skipped"
                    );
                    continue;
                };

                keys.insert(ClusterRelationKey::new(
                    related,
                    related,
                    project_id.as_str(),
                    cluster_id.as_str(),
                ));

                let container_biz_id = match container_biz_ids.get(project_code) {
                    Some(cached) => *cached,
                    None => {
                        let resolved = self.container_biz_id(project_code).await;
                        if resolved.is_err() {
                            lookup_failures += 1;
                        }
                        let resolved = resolved.ok().flatten();
                        container_biz_ids.insert(project_code.to_string(), resolved);
                        resolved
                    }
                };
                if let Some(biz_id) = container_biz_id {
                    keys.insert(ClusterRelationKey::new(
                        related,
                        biz_id.to_string(),
                        project_id.as_str(),
                        cluster_id.as_str(),
                    ));
                }
            }
        }

        Ok(DesiredRelations {
            keys,
            lookup_failures,
        })
    }

    /// Business id of the project's container space
    ///
    /// A failed lookup is emitted as `SpaceLookupFailed` and reported as
    /// `Err(())`; the caller skips the second relation for that project.
    async fn container_biz_id(&self, project_code: &str) -> Result<Option<i64>, ()> {
        let space_uid = space_uid(SpaceType::Bkci, project_code);
        match self.space_lookup.get_space_detail(&space_uid).await {
            Ok(detail) => Ok(Some(detail.bk_biz_id).filter(|id| *id != 0)),
            Err(err) => {
                self.emit(AppEvent::Cluster(ClusterEvent::SpaceLookupFailed {
                    project_code: project_code.to_string(),
                    space_uid,
                    not_found: err.is_space_not_found(),
                    error: err.to_string(),
                }));
                Err(())
            }
        }
    }
}

/// `project_code → related business id`, last row in id order wins
fn project_businesses(resources: Vec<SpaceResource>) -> HashMap<String, String> {
    let mut businesses = HashMap::new();
    for resource in resources {
        let Some(biz_id) = resource.resource_id.filter(|id| !id.is_empty()) else {
            continue;
        };
        if let Some(previous) = businesses.insert(resource.space_id.clone(), biz_id) {
            tracing::debug!(
                project_code = %resource.space_id,
                previous = %previous,
                "project bound to several businesses, keeping the latest"
            );
        }
    }
    businesses
}

#[cfg(test)]
mod tests {
    use super::*;

    fn business_row(id: i64, project: &str, biz: Option<&str>) -> SpaceResource {
        SpaceResource {
            id,
            space_type_id: "bkci".to_string(),
            space_id: project.to_string(),
            resource_type: "bkcc".to_string(),
            resource_id: biz.map(str::to_string),
            dimension_values: "[]".to_string(),
        }
    }

    #[test]
    fn later_business_rows_win() {
        let businesses = project_businesses(vec![
            business_row(1, "p1", Some("2")),
            business_row(2, "p1", Some("3")),
            business_row(3, "p2", Some("")),
            business_row(4, "p3", None),
        ]);
        assert_eq!(businesses.get("p1").map(String::as_str), Some("3"));
        assert!(!businesses.contains_key("p2"));
        assert!(!businesses.contains_key("p3"));
    }
}
