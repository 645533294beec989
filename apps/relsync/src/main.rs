#![deny(clippy::pedantic, unsafe_code)]

//! relsync - relation maintenance for the monitoring metadata store
//!
//! Reconciles cluster to business relations and rebuilds data-link relations
//! of data-buses, driving the reconcile crate against the metadata store.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, ClusterCommands, Commands, DatalinkCommands, GlobalArgs};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use relsync_config::Config;
use relsync_events::{EventEmitter, EventReceiver, EventSender};
use relsync_reconcile::{ClusterRelationReconciler, DataLinkRelationRebuilder};
use relsync_space::{HttpSpaceLookup, SpaceLookup, StoreSpaceLookup};
use relsync_state::{MetadataStore, PoolSettings};
use relsync_types::OutputFormat;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tracing::{error, info, warn};

/// Everything a command needs to run
struct CommandContext {
    config: Config,
    store: MetadataStore,
    db_path: PathBuf,
    events: EventSender,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting relsync v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: defaults < file < environment < CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref())
        .await
        .map_err(CliError::Config)?;
    config.merge_env().map_err(CliError::Config)?;
    apply_cli_config(&mut config, &cli.global);
    config.validate().map_err(CliError::Config)?;

    let db_path = config.db_path();
    let store = open_store(&config, &db_path).await?;

    let (event_sender, event_receiver) = relsync_events::channel();
    let renderer = OutputRenderer::new(config.general.default_output == OutputFormat::Json);
    let mut event_handler = EventHandler::new();

    let ctx = CommandContext {
        config,
        store,
        db_path,
        events: event_sender,
    };
    let result =
        execute_command_with_events(cli.command, ctx, event_receiver, &mut event_handler).await?;

    renderer.render_result(&result)?;

    if event_handler.conflicts() > 0 {
        warn!(
            conflicts = event_handler.conflicts(),
            "data-buses left unlinked because of ownership conflicts"
        );
    }
    info!(
        warnings = event_handler.warnings(),
        "Command completed successfully"
    );
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ctx: CommandContext,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, ctx));
    let mut channel_open = true;

    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(message) = event_receiver.try_recv() {
                    event_handler.handle_event(message);
                }
                return result;
            }

            message = event_receiver.recv(), if channel_open => {
                match message {
                    Some(message) => event_handler.handle_event(message),
                    None => channel_open = false,
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    ctx: CommandContext,
) -> Result<CommandResult, CliError> {
    let operation = command.operation_name();
    ctx.events.emit_operation_started(operation);

    let result = run_command(command, &ctx).await;
    match &result {
        Ok(_) => ctx.events.emit_operation_completed(operation, true),
        Err(e) => ctx.events.emit_operation_failed(operation, e.to_string()),
    }
    result
}

async fn run_command(command: Commands, ctx: &CommandContext) -> Result<CommandResult, CliError> {
    match command {
        Commands::Cluster(ClusterCommands::Sync) => {
            let report = cluster_reconciler(ctx)?.reconcile().await?;
            Ok(CommandResult::ClusterReport(report))
        }

        Commands::Cluster(ClusterCommands::BizIds { cluster_id }) => {
            let biz_ids = cluster_reconciler(ctx)?.list_biz_ids(&cluster_id).await?;
            Ok(CommandResult::BizIds {
                cluster_id,
                biz_ids,
            })
        }

        Commands::Datalink(DatalinkCommands::Rebuild {
            tenant,
            namespace,
            dry_run,
        }) => {
            let report = DataLinkRelationRebuilder::new(ctx.store.clone())
                .with_event_sender(ctx.events.clone())
                .rebuild_bkbase_v4_datalink_relation(&tenant, &namespace, dry_run)
                .await?;
            Ok(CommandResult::RebuildReport(report))
        }

        // Opening the store already applied pending migrations
        Commands::Migrate => Ok(CommandResult::Migrated {
            db_path: ctx.db_path.clone(),
        }),
    }
}

fn cluster_reconciler(ctx: &CommandContext) -> Result<ClusterRelationReconciler, CliError> {
    let space_lookup = space_lookup(&ctx.config, &ctx.store)?;
    Ok(ClusterRelationReconciler::new(
        ctx.store.clone(),
        space_lookup,
        ctx.config.cluster_biz_overrides(),
    )
    .with_event_sender(ctx.events.clone()))
}

/// HTTP lookup when a space API is configured, the local space table otherwise
fn space_lookup(config: &Config, store: &MetadataStore) -> Result<Arc<dyn SpaceLookup>, CliError> {
    match &config.space_api.base_url {
        Some(base_url) => {
            let api = relsync_space::SpaceApiConfig::new(base_url.clone())
                .with_timeout(config.space_api_timeout())
                .with_token(config.space_api.token.clone());
            Ok(Arc::new(HttpSpaceLookup::new(api)?))
        }
        None => Ok(Arc::new(StoreSpaceLookup::new(store.clone()))),
    }
}

async fn open_store(config: &Config, db_path: &Path) -> Result<MetadataStore, CliError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let settings = PoolSettings {
        max_connections: config.database.max_connections,
        busy_timeout: Duration::from_secs(config.database.busy_timeout),
    };
    Ok(MetadataStore::open(db_path, settings).await?)
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs) {
    if let Some(db) = &global.db {
        config.database.path = Some(db.clone());
    }
    if global.json {
        config.general.default_output = OutputFormat::Json;
    }
}

/// Logs go to stderr so JSON results on stdout stay parseable
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "debug,sqlx=warn,hyper=info,reqwest=info"
    } else {
        "info,sqlx=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_mode {
        builder.json().init();
    } else {
        builder.init();
    }
}
