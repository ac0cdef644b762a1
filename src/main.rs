//! Lead upload relay (v1)
//!
//! Accepts multipart uploads from a lead-capture form, stages them on disk
//! and forwards them to a remote backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                  UPLOAD RELAY                     │
//!                         │                                                   │
//!     Browser form        │  ┌──────────┐   ┌──────────┐   ┌──────────────┐   │
//!     ────────────────────┼─▶│ security │──▶│  intake  │──▶│   scratch    │   │
//!     multipart POST      │  │cors/limit│   │ validate │   │   storage    │   │
//!                         │  └──────────┘   └──────────┘   └──────┬───────┘   │
//!                         │                                       │           │
//!                         │                      local mode ◀─────┤           │
//!                         │                                       ▼           │
//!     JSON response       │  ┌──────────┐                  ┌──────────────┐   │
//!     ◀───────────────────┼──│ response │◀─────────────────│   forward    │◀──┼──── Remote
//!                         │  └──────────┘     release      └──────────────┘   │     backend
//!                         │                  staged files                     │
//!                         └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use lead_relay::config::{load_config, Overrides};
use lead_relay::lifecycle::{startup, Shutdown};
use lead_relay::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "lead-relay")]
#[command(about = "Relays lead-form file uploads to a remote backend")]
#[command(version)]
struct Cli {
    /// Config file path (optional)
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Remote URL uploads are forwarded to
    #[arg(short, long, env = "UPLOAD_URL")]
    upload_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = Overrides {
        port: cli.port,
        upload_url: cli.upload_url,
    };
    let config = load_config(cli.config.as_deref(), &overrides)?;

    logging::init_logging(&config.observability);
    tracing::info!("lead-relay v{} starting", env!("CARGO_PKG_VERSION"));

    let shutdown = Shutdown::new();
    startup::start(config, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
