//! `domains`, `stats` and `actions` commands

use crate::cli::OutputFormat;
use crate::context::CliContext;
use crate::display::{self, ActionRow, DomainRow};
use crate::error::CliResult;
use serde_json::Map;
use snapnote::Stats;

pub async fn run_domains(context: &CliContext, format: OutputFormat) -> CliResult<()> {
    let mut response = context.execute("getDomains", Map::new()).await?;
    let domains: Vec<DomainRow> = response.take("domains")?;
    display::print_domains(&domains, format)
}

pub async fn run_stats(context: &CliContext, rebuild: bool, format: OutputFormat) -> CliResult<()> {
    let action = if rebuild { "rebuildStats" } else { "getStats" };
    let mut response = context.execute(action, Map::new()).await?;
    let stats: Stats = response.take("stats")?;

    if rebuild && format == OutputFormat::Table {
        println!("{}", display::success("Rebuilt statistics from stored notes"));
    }
    display::print_stats(&stats, format)
}

pub fn run_actions(context: &CliContext, format: OutputFormat) -> CliResult<()> {
    let actions: Vec<ActionRow> = context
        .router()
        .registry()
        .descriptions()
        .into_iter()
        .map(|(action, description)| ActionRow {
            action,
            description,
        })
        .collect();
    display::print_actions(&actions, format)
}
