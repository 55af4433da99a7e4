//! Cache command - inspect or clear the persisted geocode cache

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::GeocacheResult;
use crate::geocode::{CacheEntry, GeocodeCache};
use crate::store::FileBlobStore;
use crate::ui::{self, UiContext};
use console::style;
use serde_json::json;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> GeocacheResult<()> {
    let store = FileBlobStore::new(ConfigManager::cache_path(config));

    match args.action {
        CacheAction::Path => println!("{}", store.path().display()),
        CacheAction::List { format } => {
            let cache = load(&store, config).await;
            list(&cache.entries(), format)?;
        }
        CacheAction::Info => {
            let cache = load(&store, config).await;
            info(&store, &cache, config);
        }
        CacheAction::Clear { yes } => clear(&store, yes).await?,
    }

    Ok(())
}

async fn load(store: &FileBlobStore, config: &Config) -> GeocodeCache {
    let cache = GeocodeCache::new(config.cache.precision, config.cache.policy());
    cache.load(store).await;
    cache
}

fn list(entries: &[CacheEntry], format: OutputFormat) -> GeocacheResult<()> {
    if entries.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&UiContext::detect(), "Geocode cache is empty"),
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(entries),
        OutputFormat::Json => {
            let docs: Vec<_> = entries
                .iter()
                .map(|e| {
                    json!({
                        "lat": e.key.lat(),
                        "lng": e.key.lng(),
                        "address": e.address,
                        "resolved_at": e.resolved_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&docs)?);
        }
        OutputFormat::Plain => {
            for entry in entries {
                println!("{}\t{}", entry.key, entry.address);
            }
        }
    }
    Ok(())
}

fn print_table(entries: &[CacheEntry]) {
    println!(
        "{:<26} {:<17} {}",
        style("LOCATION").bold(),
        style("RESOLVED").bold(),
        style("ADDRESS").bold()
    );
    println!("{}", "-".repeat(80));

    for entry in entries {
        println!(
            "{:<26} {:<17} {}",
            entry.key.to_string(),
            entry.resolved_at.format("%Y-%m-%d %H:%M"),
            entry.address
        );
    }

    println!();
    println!("{} cached address(es)", entries.len());
}

fn info(store: &FileBlobStore, cache: &GeocodeCache, config: &Config) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Geocode cache");

    ui::key_value(&ctx, "Path", &store.path().display().to_string());
    ui::key_value(&ctx, "Entries", &cache.len().to_string());
    ui::key_value(&ctx, "Precision", &format!("{} decimal places", cache.precision()));

    let max_age = match config.cache.max_age_days {
        0 => "never".to_string(),
        days => format!("{} days", days),
    };
    ui::key_value(&ctx, "Expires after", &max_age);

    let max_entries = match config.cache.max_entries {
        0 => "unbounded".to_string(),
        n => n.to_string(),
    };
    ui::key_value(&ctx, "Capacity", &max_entries);

    let entries = cache.entries();
    if let (Some(newest), Some(oldest)) = (entries.first(), entries.last()) {
        ui::key_value(&ctx, "Newest", &newest.resolved_at.to_rfc3339());
        ui::key_value(&ctx, "Oldest", &oldest.resolved_at.to_rfc3339());
    }
}

async fn clear(store: &FileBlobStore, yes: bool) -> GeocacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    if !store.path().exists() {
        ui::step_info(&ctx, "Geocode cache is already empty");
        return Ok(());
    }

    let prompt = format!("Delete cached addresses in {}?", store.path().display());
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::remark(&ctx, "Nothing removed. Pass --yes to skip confirmation");
        return Ok(());
    }

    store.remove().await?;
    ui::step_ok(&ctx, "Geocode cache cleared");
    Ok(())
}
