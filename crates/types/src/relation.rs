//! Space and cluster relation types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between space type and space id inside a space uid
pub const SPACE_UID_HYPHEN: &str = "__";

/// Space types known to the relation reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    /// CMDB business
    Bkcc,
    /// CI project
    Bkci,
    /// Container cluster platform
    Bcs,
}

impl SpaceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bkcc => "bkcc",
            Self::Bkci => "bkci",
            Self::Bcs => "bcs",
        }
    }

    /// Parse a stored space type identifier
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bkcc" => Some(Self::Bkcc),
            "bkci" => Some(Self::Bkci),
            "bcs" => Some(Self::Bcs),
            _ => None,
        }
    }
}

impl fmt::Display for SpaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the uid of a space, e.g. `bkci__my-project`
#[must_use]
pub fn space_uid(space_type: SpaceType, space_id: &str) -> String {
    format!("{}{SPACE_UID_HYPHEN}{space_id}", space_type.as_str())
}

/// Identity of a cluster relation row
///
/// Business ids are kept as strings because container project spaces use
/// negative ids next to the positive CMDB ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterRelationKey {
    pub related_bk_biz_id: String,
    pub bk_biz_id: String,
    pub project_id: String,
    pub cluster_id: String,
}

impl ClusterRelationKey {
    #[must_use]
    pub fn new(
        related_bk_biz_id: impl Into<String>,
        bk_biz_id: impl Into<String>,
        project_id: impl Into<String>,
        cluster_id: impl Into<String>,
    ) -> Self {
        Self {
            related_bk_biz_id: related_bk_biz_id.into(),
            bk_biz_id: bk_biz_id.into(),
            project_id: project_id.into(),
            cluster_id: cluster_id.into(),
        }
    }
}

impl fmt::Display for ClusterRelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.related_bk_biz_id, self.bk_biz_id, self.project_id, self.cluster_id
        )
    }
}
