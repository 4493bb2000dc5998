use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strm_sync::allowlist::AllowRules;
use strm_sync::sync::{SyncEngine, SyncOptions};

#[derive(Parser)]
#[command(name = "strm-sync")]
#[command(version)]
#[command(about = "Converges a .strm pointer library with an extended M3U playlist")]
struct Cli {
    /// Playlist file (extended M3U)
    #[arg(short, long, value_name = "FILE")]
    playlist: PathBuf,

    /// Output root the library is materialized under
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Allow-rules file (JSON)
    #[arg(short, long, value_name = "FILE")]
    allow: Option<PathBuf>,

    /// Delete pointer files whose entries dropped out of the playlist
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    sync_delete: bool,

    /// Also delete same-stem sidecar files next to deleted pointers
    #[arg(long)]
    prune_sidecars: bool,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("strm_sync={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let playlist_text = fs::read_to_string(&cli.playlist)
        .with_context(|| format!("reading playlist {}", cli.playlist.display()))?;
    let rules = load_rules(cli.allow.as_deref());

    let options = SyncOptions {
        sync_delete: cli.sync_delete,
        prune_sidecars: cli.prune_sidecars,
    };
    info!(
        output = %cli.output.display(),
        sync_delete = options.sync_delete,
        prune_sidecars = options.prune_sidecars,
        "starting sync run"
    );

    let engine = SyncEngine::new(&cli.output, &rules, options);
    let summary = engine.run(&playlist_text)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Load allow rules, degrading to "nothing allowed" when the file is missing
/// or malformed.
fn load_rules(path: Option<&Path>) -> AllowRules {
    let Some(path) = path else {
        warn!("no allow rules supplied, nothing will be admitted");
        return AllowRules::default();
    };
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("cannot read allow rules {}: {e}, treating as empty", path.display());
            return AllowRules::default();
        }
    };
    match serde_json::from_str(&text) {
        Ok(rules) => rules,
        Err(e) => {
            warn!("malformed allow rules {}: {e}, treating as empty", path.display());
            AllowRules::default()
        }
    }
}
