//! Space lookup against the local space registry

use crate::{SpaceDetail, SpaceLookup};
use async_trait::async_trait;
use relsync_errors::{Error, SpaceError};
use relsync_state::MetadataStore;
use relsync_types::{SpaceType, SPACE_UID_HYPHEN};

/// Resolves space uids from the `spaces` table
///
/// A business space's id is its numeric space id. Every other space gets the
/// negated row id, the platform's convention for non-business spaces.
#[derive(Clone)]
pub struct StoreSpaceLookup {
    store: MetadataStore,
}

impl StoreSpaceLookup {
    #[must_use]
    pub fn new(store: MetadataStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SpaceLookup for StoreSpaceLookup {
    async fn get_space_detail(&self, space_uid: &str) -> Result<SpaceDetail, Error> {
        let invalid = || SpaceError::InvalidUid {
            space_uid: space_uid.to_string(),
        };
        let (space_type, space_id) = space_uid.split_once(SPACE_UID_HYPHEN).ok_or_else(invalid)?;
        let space_type = SpaceType::parse(space_type).ok_or_else(invalid)?;

        let space = self
            .store
            .space(space_type.as_str(), space_id)
            .await?
            .ok_or_else(|| SpaceError::NotFound {
                space_uid: space_uid.to_string(),
            })?;

        let bk_biz_id = match space_type {
            SpaceType::Bkcc => space.space_id.parse::<i64>().map_err(|_| invalid())?,
            SpaceType::Bkci | SpaceType::Bcs => -space.id,
        };

        tracing::debug!(space_uid, bk_biz_id, "resolved space from store");
        Ok(SpaceDetail {
            space_uid: space_uid.to_string(),
            bk_biz_id,
        })
    }
}
