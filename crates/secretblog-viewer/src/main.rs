//! Secretblog headless viewer binary.
//!
//! # Usage
//!
//! ```bash
//! # Decrypt a post copied from the host, using the shared link
//! secretblog-viewer ./site/2024/walk --key 'https://blog.example/2024/walk/#KEY' --out ./walk
//!
//! # Sites sealed with a 256-bit key and the derived content key
//! secretblog-viewer ./site/post --key KEY --key-bits 256 --derived-content-key
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use secretblog_core::{ContentKeyScheme, KeyConfig, LoaderConfig};
use secretblog_crypto::KeyLength;
use secretblog_viewer::{CliEnv, ViewerConfig, view};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Session key size.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KeyBits {
    #[value(name = "128")]
    Bits128,
    #[value(name = "256")]
    Bits256,
}

/// Secretblog headless viewer
#[derive(Parser, Debug)]
#[command(name = "secretblog-viewer")]
#[command(about = "Decrypt a secretblog post from a local copy of the site")]
#[command(version)]
struct Args {
    /// Directory holding the encrypted post
    site: PathBuf,

    /// Shared link or bare key fragment
    #[arg(short, long)]
    key: String,

    /// Directory to export decrypted content into
    #[arg(short, long, default_value = "out")]
    out: PathBuf,

    /// Session key size in bits
    #[arg(long, value_enum, default_value = "128")]
    key_bits: KeyBits,

    /// Content is sealed with the derived files key
    #[arg(long)]
    derived_content_key: bool,

    /// Distance from the viewport at which loading starts, in pixels
    #[arg(long, default_value = "50")]
    prefetch_margin: u32,

    /// Panoramas and maps started per visibility batch (0 for no limit)
    #[arg(long, default_value = "1")]
    max_viewers: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ViewerConfig {
        site_dir: args.site,
        out_dir: args.out,
        keys: KeyConfig {
            key_length: match args.key_bits {
                KeyBits::Bits128 => KeyLength::Bits128,
                KeyBits::Bits256 => KeyLength::Bits256,
            },
            content_key: if args.derived_content_key {
                ContentKeyScheme::Derived
            } else {
                ContentKeyScheme::Session
            },
        },
        loader: LoaderConfig {
            prefetch_margin_px: args.prefetch_margin,
            max_viewers_per_batch: (args.max_viewers > 0).then_some(args.max_viewers),
        },
    };

    tracing::info!("Opening {}", config.site_dir.display());

    let mut env = CliEnv::from_link(&args.key);
    let report = view(&mut env, &config).await?;

    tracing::info!(
        loaded = report.loaded,
        failed = report.failed,
        files = report.written.len(),
        "Exported to {}",
        config.out_dir.display()
    );

    Ok(())
}
