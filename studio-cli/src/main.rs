//! # Studio
//!
//! Command-line host: export or record a scene document.

use clap::Parser;
use studio_cli::{run, CliArgs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,studio_core=debug,studio_export=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,studio_core=debug,studio_export=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    tracing::debug!(?args, "starting");
    let json = args.json;

    let outcome = run(args).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        if !outcome.warnings.is_empty() {
            tracing::warn!(skipped = outcome.warnings.len(), "artifact is missing elements");
        }
        println!("{}", outcome.location);
    }
    Ok(())
}
