//! Cache command - inspect or clear stored generations

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::net::RequestKey;
use crate::store::{open_storage, CacheStorage};
use crate::ui::{self, Mark, UiContext};
use crate::worker::RegistrationRecord;
use console::style;
use serde::Serialize;
use tracing::debug;

/// One generation and its entries
#[derive(Debug, Serialize)]
struct GenerationListing {
    generation: String,
    current: bool,
    entries: Vec<RequestKey>,
}

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config, ephemeral: bool) -> ShellcacheResult<()> {
    let storage = open_storage(config, ephemeral);

    match args.action {
        CacheAction::List { format, generation } => {
            let listings = collect(storage.as_ref(), config, generation.as_deref()).await?;
            match format {
                OutputFormat::Table => print_table(&listings),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listings)?),
                OutputFormat::Plain => print_plain(&listings),
            }
            Ok(())
        }
        CacheAction::Clear { yes } => clear(storage.as_ref(), config, ephemeral, yes).await,
    }
}

async fn collect(
    storage: &dyn CacheStorage,
    config: &Config,
    only: Option<&str>,
) -> ShellcacheResult<Vec<GenerationListing>> {
    let names = match only {
        Some(name) => {
            if !storage.has(name).await? {
                return Err(ShellcacheError::GenerationNotFound(name.to_string()));
            }
            vec![name.to_string()]
        }
        None => storage.keys().await?,
    };

    let mut listings = Vec::with_capacity(names.len());
    for name in names {
        let mut entries = match storage.get(&name).await? {
            Some(cache) => cache.keys().await?,
            None => Vec::new(),
        };
        entries.sort();
        listings.push(GenerationListing {
            current: name == config.worker.generation,
            generation: name,
            entries,
        });
    }
    Ok(listings)
}

fn print_table(listings: &[GenerationListing]) {
    if listings.is_empty() {
        println!("No cache generations found.");
        return;
    }

    for listing in listings {
        let marker = if listing.current {
            style("current").green().to_string()
        } else {
            style("stale").yellow().to_string()
        };
        println!(
            "{} [{}] {} entries",
            style(&listing.generation).bold(),
            marker,
            listing.entries.len()
        );
        println!("{}", "-".repeat(80));
        for key in &listing.entries {
            println!("  {:<8} {}", key.method, key.url);
        }
        println!();
    }
    println!("Total: {} generation(s)", listings.len());
}

fn print_plain(listings: &[GenerationListing]) {
    for listing in listings {
        for key in &listing.entries {
            println!("{}\t{}\t{}", listing.generation, key.method, key.url);
        }
    }
}

async fn clear(
    storage: &dyn CacheStorage,
    config: &Config,
    ephemeral: bool,
    yes: bool,
) -> ShellcacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let names = storage.keys().await?;

    if names.is_empty() {
        ui::step(&ctx, Mark::Info, "No cache generations to clear");
        return Ok(());
    }

    let prompt = format!("Delete {} cache generation(s)?", names.len());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::step(&ctx, Mark::Info, "Cancelled");
        return Ok(());
    }

    for name in &names {
        storage.delete(name).await?;
        ui::step(&ctx, Mark::Ok, &format!("Deleted {}", name));
    }

    if !ephemeral {
        let path = config.registration_path();
        debug!("Removing registration record {}", path.display());
        RegistrationRecord::delete(&path).await?;
    }

    ui::outro(&ctx, Mark::Ok, &format!("Cleared {} generation(s)", names.len()));
    Ok(())
}
