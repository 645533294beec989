#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Relation reconcilers for relsync
//!
//! Two independent batch jobs over the metadata store:
//!
//! - [`ClusterRelationReconciler`] keeps the cluster to business relation
//!   table in line with the space registry.
//! - [`DataLinkRelationRebuilder`] claims unlinked data-buses, their sinks
//!   and result tables for a rebuilt data link.
//!
//! Both are safe to re-run. Neither guards against a concurrent run over the
//! same data; callers must run them single-flight.

mod cluster;
mod datalink;

pub use cluster::ClusterRelationReconciler;
pub use datalink::{DataLinkRelationRebuilder, RebuildOutcome};
