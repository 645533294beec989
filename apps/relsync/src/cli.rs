//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// relsync - keeps derived relation tables of the metadata store consistent
#[derive(Parser)]
#[command(name = "relsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Reconcile cluster relations and rebuild data-link relations")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging and per-event log records
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Metadata store location, overrides config and environment
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Cluster to business relations
    #[command(subcommand)]
    Cluster(ClusterCommands),

    /// Data-link relations of data-buses
    #[command(subcommand)]
    Datalink(DatalinkCommands),

    /// Create or upgrade the metadata store schema
    Migrate,
}

#[derive(Subcommand)]
pub enum ClusterCommands {
    /// Reconcile cluster relations against the space registry
    Sync,

    /// List business ids related to a cluster
    BizIds {
        /// Cluster id, e.g. BCS-K8S-00001
        cluster_id: String,
    },
}

#[derive(Subcommand)]
pub enum DatalinkCommands {
    /// Link every unlinked data-bus of a tenant namespace
    Rebuild {
        /// Tenant id
        #[arg(long, default_value = "system")]
        tenant: String,

        /// Namespace of the data-buses
        #[arg(long, default_value = "bkmonitor")]
        namespace: String,

        /// Resolve and report plans without writing
        #[arg(long)]
        dry_run: bool,
    },
}

impl Commands {
    /// Short name used in operation events and logs
    pub fn operation_name(&self) -> &'static str {
        match self {
            Commands::Cluster(ClusterCommands::Sync) => "cluster sync",
            Commands::Cluster(ClusterCommands::BizIds { .. }) => "cluster biz-ids",
            Commands::Datalink(DatalinkCommands::Rebuild { .. }) => "datalink rebuild",
            Commands::Migrate => "migrate",
        }
    }
}
