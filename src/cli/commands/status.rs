//! Status command - worker lifecycle and stored generations

use super::Host;
use crate::config::Config;
use crate::error::ShellcacheResult;
use crate::worker::Worker;
use console::{style, Emoji};
use std::sync::Arc;

static CHECK: Emoji<'_, '_> = Emoji("✓ ", "[OK] ");
static WARN: Emoji<'_, '_> = Emoji("⚠ ", "[WARN] ");
static DOT: Emoji<'_, '_> = Emoji("• ", "- ");

/// Execute the status command
pub async fn execute(config: &Config, ephemeral: bool) -> ShellcacheResult<()> {
    let host = Host::open(config, ephemeral).await?;
    let registration = &host.registration;
    let storage = &registration.context().storage;

    println!("{}", style("shellcache status").bold().cyan());
    println!();

    println!("{}", style("Configuration:").bold());
    println!("  Generation: {}", config.worker.generation);
    println!("  Scope:      {}", registration.scope());
    println!("  Manifest:   {} entries", config.worker.manifest.len());
    println!("  Store:      {}", storage.backend());
    println!();

    println!("{}", style("Workers:").bold());
    print_worker("Active", registration.active());
    print_worker("Waiting", registration.waiting());
    println!();

    println!("{}", style("Generations:").bold());
    let names = storage.keys().await?;
    if names.is_empty() {
        println!("  {}none", DOT);
    }
    for name in &names {
        let entries = match storage.get(name).await? {
            Some(cache) => cache.keys().await?.len(),
            None => 0,
        };
        let marker = if *name == config.worker.generation {
            style(" (current)").green().to_string()
        } else {
            style(" (stale)").yellow().to_string()
        };
        println!("  {}{}: {} entries{}", DOT, name, entries, marker);
    }

    println!();
    let current_active = registration
        .active()
        .is_some_and(|w| w.generation() == config.worker.generation);
    if current_active && names.len() == 1 {
        println!("{}", style("Configured generation is active").green().bold());
    } else if registration.active().is_none() {
        println!(
            "{} {}",
            style("No active worker").yellow().bold(),
            style("- run: shellcache install").dim()
        );
    } else {
        println!(
            "{}",
            style("Configured generation is not active yet - run: shellcache install")
                .yellow()
                .bold()
        );
    }

    Ok(())
}

fn print_worker(label: &str, worker: Option<&Arc<Worker>>) {
    match worker {
        Some(worker) => {
            let record = worker.version_record();
            let since = record
                .activated_at
                .or(record.installed_at)
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "  {}{:<8} {} ({}) {}",
                CHECK,
                label,
                worker.generation(),
                record.state,
                style(since).dim()
            );
        }
        None => println!("  {}{:<8} none", WARN, label),
    }
}
