//! Operator overrides of the business a cluster relates to

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable `cluster_id → business id` override table
///
/// Built once at startup and shared read-only by the cluster reconciler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterBizOverrides(BTreeMap<String, String>);

impl ClusterBizOverrides {
    /// Parse the flat `clusterId:bizId,clusterId:bizId` form
    ///
    /// Pairs that do not split into exactly two non-empty parts are dropped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut map = BTreeMap::new();
        for item in raw.split(',') {
            let parts: Vec<&str> = item.split(':').map(str::trim).collect();
            if let [cluster_id, biz_id] = parts.as_slice() {
                if !cluster_id.is_empty() && !biz_id.is_empty() {
                    map.insert((*cluster_id).to_string(), (*biz_id).to_string());
                    continue;
                }
            }
            if !item.trim().is_empty() {
                tracing::debug!(pair = item, "ignoring malformed cluster biz override");
            }
        }
        Self(map)
    }

    /// Layer `other` on top of `self`; entries in `other` win
    #[must_use]
    pub fn merged_with(mut self, other: Self) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Forced business id for a cluster, if any
    #[must_use]
    pub fn get(&self, cluster_id: &str) -> Option<&str> {
        self.0.get(cluster_id).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for ClusterBizOverrides {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_pairs_and_drops_the_rest() {
        let overrides =
            ClusterBizOverrides::parse("BCS-K8S-1:2, BCS-K8S-2 : 3,broken,a:b:c,:4,5:,");
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides.get("BCS-K8S-1"), Some("2"));
        assert_eq!(overrides.get("BCS-K8S-2"), Some("3"));
        assert_eq!(overrides.get("broken"), None);
    }

    #[test]
    fn empty_string_gives_empty_table() {
        assert!(ClusterBizOverrides::parse("").is_empty());
    }

    #[test]
    fn later_layer_wins() {
        let base = ClusterBizOverrides::parse("c1:1,c2:2");
        let merged = base.merged_with(ClusterBizOverrides::parse("c2:20"));
        assert_eq!(merged.get("c1"), Some("1"));
        assert_eq!(merged.get("c2"), Some("20"));
    }
}
