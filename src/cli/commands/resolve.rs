//! Resolve command - look up a single coordinate

use crate::app::App;
use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::config::Config;
use crate::error::GeocacheResult;
use crate::geocode::CoordinateKey;
use crate::ui::{self, TaskSpinner, UiContext};
use serde_json::json;

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> GeocacheResult<()> {
    // Reject bad input before touching the network or the cache file
    let key = CoordinateKey::with_precision(args.lat, args.lng, config.cache.precision)?;

    let app = App::from_config(config)?;
    app.initialize().await;

    let was_cached = app.service().cache().get(&key).is_some();
    let ctx = UiContext::detect();
    let mut spinner = TaskSpinner::new(&ctx);
    if !was_cached {
        spinner.start(&format!("Resolving {}", key));
    }

    let result = app.service().resolve_key(key).await;
    match &result {
        Ok(_) => spinner.stop("Resolved"),
        Err(e) => spinner.stop_error(&e.to_string()),
    }

    app.shutdown_flush().await;
    let address = result?;

    match args.format {
        OutputFormat::Plain => println!("{}", address),
        OutputFormat::Json => {
            let doc = json!({
                "lat": key.lat(),
                "lng": key.lng(),
                "key": key.to_string(),
                "address": address,
                "cached": was_cached,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Table => {
            ui::key_value(&ctx, "Location", &key.to_string());
            ui::key_value(&ctx, "Address", &address);
            ui::key_value(&ctx, "Source", if was_cached { "cache" } else { app.service().provider() });
        }
    }

    Ok(())
}
