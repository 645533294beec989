#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Space lookups for relsync
//!
//! The cluster reconciler needs the business id of a container project
//! space. It asks through [`SpaceLookup`], backed either by the space API
//! over HTTP or by the local `spaces` table.

mod client;
mod store;

pub use client::{HttpSpaceLookup, SpaceApiConfig};
pub use store::StoreSpaceLookup;

use async_trait::async_trait;
use relsync_errors::Error;
use serde::{Deserialize, Serialize};

/// The part of a space the reconcilers care about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceDetail {
    pub space_uid: String,
    pub bk_biz_id: i64,
}

/// Resolve a space uid to its detail
///
/// A uid with no space fails with `SpaceError::NotFound`.
#[async_trait]
pub trait SpaceLookup: Send + Sync {
    async fn get_space_detail(&self, space_uid: &str) -> Result<SpaceDetail, Error>;
}
