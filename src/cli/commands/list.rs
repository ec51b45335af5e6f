//! List command - show cache generations

use crate::cli::args::{ListArgs, OutputFormat};
use crate::config::Config;
use crate::error::PrecacheResult;
use crate::store::CacheStore;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::sync::Arc;

/// One generation as shown by `list`
#[derive(Debug, Serialize)]
struct GenerationSummary {
    name: String,
    current: bool,
    entries: usize,
}

/// Execute the list command
pub async fn execute(
    args: ListArgs,
    config: &Config,
    store: Arc<dyn CacheStore>,
) -> PrecacheResult<()> {
    let current = config.registry()?.generation().clone();

    let mut generations = Vec::new();
    for name in store.keys().await? {
        let entries = store.entries(&name).await?.len();
        generations.push(GenerationSummary {
            current: name == current.as_str(),
            name,
            entries,
        });
    }

    if generations.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "No cache generations");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&generations),
        OutputFormat::Json => print_json(&generations)?,
        OutputFormat::Plain => print_plain(&generations),
    }

    Ok(())
}

fn print_table(generations: &[GenerationSummary]) {
    println!(
        "{:<32} {:<10} {:>8}",
        style("GENERATION").bold(),
        style("STATUS").bold(),
        style("ENTRIES").bold()
    );
    println!("{}", "-".repeat(52));

    for generation in generations {
        let status = if generation.current {
            style("current").green()
        } else {
            style("stale").dim()
        };
        println!(
            "{:<32} {:<10} {:>8}",
            generation.name, status, generation.entries
        );
    }

    println!();
    println!("{} generation(s)", generations.len());
}

fn print_json(generations: &[GenerationSummary]) -> PrecacheResult<()> {
    let json = serde_json::to_string_pretty(generations)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(generations: &[GenerationSummary]) {
    for generation in generations {
        println!("{}", generation.name);
    }
}
