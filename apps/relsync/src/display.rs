//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::Style;
use relsync_types::{ClusterReconcileReport, DataLinkRebuildReport};
use std::io;
use std::path::PathBuf;

/// What a command produced
pub enum CommandResult {
    ClusterReport(ClusterReconcileReport),
    BizIds {
        cluster_id: String,
        biz_ids: Vec<String>,
    },
    RebuildReport(DataLinkRebuildReport),
    Migrated {
        db_path: PathBuf,
    },
}

/// Output renderer for CLI results
pub struct OutputRenderer {
    json_output: bool,
    colors: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            colors: console::Term::stdout().features().colors_supported(),
        }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            Self::render_json(result)
        } else {
            self.render_plain(result);
            Ok(())
        }
    }

    fn render_json(result: &CommandResult) -> io::Result<()> {
        let value = match result {
            CommandResult::ClusterReport(report) => serde_json::to_value(report),
            CommandResult::RebuildReport(report) => serde_json::to_value(report),
            CommandResult::BizIds {
                cluster_id,
                biz_ids,
            } => Ok(serde_json::json!({
                "cluster_id": cluster_id,
                "biz_ids": biz_ids,
            })),
            CommandResult::Migrated { db_path } => Ok(serde_json::json!({
                "db_path": db_path.display().to_string(),
                "migrated": true,
            })),
        }
        .map_err(io::Error::other)?;
        let json = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
        println!("{json}");
        Ok(())
    }

    fn render_plain(&self, result: &CommandResult) {
        match result {
            CommandResult::ClusterReport(report) => self.render_cluster_report(report),
            CommandResult::RebuildReport(report) => self.render_rebuild_report(report),
            CommandResult::BizIds {
                cluster_id,
                biz_ids,
            } => {
                if biz_ids.is_empty() {
                    println!("No businesses related to {cluster_id}.");
                } else {
                    for biz_id in biz_ids {
                        println!("{biz_id}");
                    }
                }
            }
            CommandResult::Migrated { db_path } => {
                println!("{} {}", self.ok("Schema up to date:"), db_path.display());
            }
        }
    }

    fn render_cluster_report(&self, report: &ClusterReconcileReport) {
        println!("{}", self.heading("Cluster relations reconciled"));
        let mut table = Self::table();
        table.set_header(vec![
            Cell::new("Desired").add_attribute(Attribute::Bold),
            Cell::new("Added").add_attribute(Attribute::Bold),
            Cell::new("Refreshed").add_attribute(Attribute::Bold),
            Cell::new("Deleted").add_attribute(Attribute::Bold),
            Cell::new("Lookup failures").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            report.desired.to_string(),
            report.added.to_string(),
            report.refreshed.to_string(),
            report.deleted.to_string(),
            report.lookup_failures.to_string(),
        ]);
        println!("{table}");
        println!("Completed in {} ms", report.duration_ms);
    }

    fn render_rebuild_report(&self, report: &DataLinkRebuildReport) {
        let title = if report.dry_run {
            format!(
                "Data-link rebuild plan for {}/{} (dry run)",
                report.bk_tenant_id, report.namespace
            )
        } else {
            format!(
                "Data-link rebuild for {}/{}",
                report.bk_tenant_id, report.namespace
            )
        };
        println!("{}", self.heading(&title));
        println!(
            "Unlinked: {}  Rebuilt: {}  Skipped: {}",
            report.total,
            self.ok(&report.success.to_string()),
            self.warn(&report.skipped.to_string()),
        );

        if !report.skip_reasons.is_empty() {
            let mut table = Self::table();
            table.set_header(vec![
                Cell::new("Skip reason").add_attribute(Attribute::Bold),
                Cell::new("Data-buses").add_attribute(Attribute::Bold),
            ]);
            for (reason, count) in &report.skip_reasons {
                table.add_row(vec![reason.as_str().to_string(), count.to_string()]);
            }
            println!("{table}");
        }

        if !report.plans.is_empty() {
            let mut table = Self::table();
            table.set_header(vec![
                Cell::new("Data link").add_attribute(Attribute::Bold),
                Cell::new("Strategy").add_attribute(Attribute::Bold),
                Cell::new("Data id").add_attribute(Attribute::Bold),
                Cell::new("Tables").add_attribute(Attribute::Bold),
                Cell::new("Sinks").add_attribute(Attribute::Bold),
            ]);
            for plan in &report.plans {
                let sinks: Vec<String> = plan
                    .sinks
                    .iter()
                    .map(|sink| format!("{}:{}", sink.kind, sink.name))
                    .collect();
                table.add_row(vec![
                    plan.data_link_name.clone(),
                    plan.strategy.as_str().to_string(),
                    plan.bk_data_id.to_string(),
                    plan.table_ids.join("\n"),
                    sinks.join("\n"),
                ]);
            }
            println!("{table}");
        }
        println!("Completed in {} ms", report.duration_ms);
    }

    fn table() -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    fn heading(&self, text: &str) -> String {
        self.styled(Style::new().bold(), text)
    }

    fn ok(&self, text: &str) -> String {
        self.styled(Style::new().green(), text)
    }

    fn warn(&self, text: &str) -> String {
        self.styled(Style::new().yellow(), text)
    }

    fn styled(&self, style: Style, text: &str) -> String {
        if self.colors {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}
