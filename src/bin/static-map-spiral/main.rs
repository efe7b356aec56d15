mod args;
mod validators;

use anyhow::{Context, Result};
use args::{Args, Command};
use static_map_spiral::{fetch, store::ArrayStore, Config};
use tracing_subscriber::EnvFilter;

/// Rough size of a 1280x1280 PNG tile, used for dry run estimates.
const ASSUMED_TILE_BYTES: f64 = 600_000f64;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match args.command {
        Command::Download(download) => {
            let dry_run = download.dry_run;
            let config: Config = download.into();

            if dry_run {
                let pair_count = config.spiral().count();
                let tile_count = pair_count * 2;

                eprintln!(
                    "would download {} tile pairs ({} tiles, approx {}, assuming 600 kb per tile)",
                    pair_count,
                    tile_count,
                    pretty_bytes::converter::convert(tile_count as f64 * ASSUMED_TILE_BYTES)
                );

                Ok(())
            } else {
                let summary = fetch(config).await?;
                eprintln!(
                    "downloaded {} of {} tile pairs ({} failed to fetch, {} failed to decode, {} failed to save)",
                    summary.succeeded,
                    summary.pairs,
                    summary.fetch_failures,
                    summary.decode_failures,
                    summary.save_failures
                );

                Ok(())
            }
        }
        Command::Init {
            store,
            width,
            height,
        } => {
            ArrayStore::init(&store, width, height)
                .with_context(|| format!("failed to create {}", store.display()))?;
            eprintln!("created {} for {}x{} images", store.display(), width, height);

            Ok(())
        }
        Command::Import { store, dir, format } => {
            let summary = ArrayStore::new(&store)
                .import_dir(&dir, format.as_str())
                .with_context(|| format!("failed to import {}", dir.display()))?;
            eprintln!(
                "imported {} roadmap and {} satellite tiles, skipped {} files",
                summary.roadmap, summary.satellite, summary.skipped
            );

            Ok(())
        }
        Command::Inspect {
            store,
            group,
            index,
            export,
        } => {
            let store = ArrayStore::new(store);
            for (name, info) in store.groups()? {
                println!(
                    "{}: {} x ({}, {}, {})",
                    name, info.len, info.shape.channels, info.shape.height, info.shape.width
                );
            }

            if let Some(out) = export {
                store
                    .export(&group, index, &out)
                    .with_context(|| format!("failed to export {}[{}]", group, index))?;
                eprintln!("wrote {}[{}] to {}", group, index, out.display());
            }

            Ok(())
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
