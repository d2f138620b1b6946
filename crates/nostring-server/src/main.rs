//! NoString Server — headless daemon running the core Nostr engine
//! (identity, relay pool, P2P signaling, image cache) without the Tauri
//! desktop UI. Designed for Docker / server deployment.
//!
//! # Usage
//!
//! ```bash
//! nostring-server --config /path/to/nostring-server.toml
//! nostring-server --validate  # Validate config and exit
//! ```

mod config;
mod daemon;

use anyhow::{Context, Result};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Security hardening: disable core dumps so a crash never writes seed
    // material to disk.
    nostring_core::memory::disable_core_dumps();

    // Initialize rustls CryptoProvider before any Nostr/TLS operations.
    // Without this, WebSocket connections via tokio-tungstenite's rustls
    // backend will panic.
    rustls::crypto::ring::default_provider().install_default().ok();

    // Parse CLI args (minimal — no clap dependency needed)
    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("/config/nostring-server.toml");
    let mut validate_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--validate" => {
                validate_only = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("nostring-server {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    // Load config
    let mut server_config = config::ServerConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Apply env overrides
    server_config.apply_env_overrides();

    // Validate
    server_config.validate().context("Configuration validation failed")?;

    // Init logger
    std::env::set_var("RUST_LOG", &server_config.server.log_level);
    env_logger::init();

    if validate_only {
        println!("Configuration is valid.");
        println!("  Identity:   {}", server_config.identity.id);
        println!("  Relays:     {}", server_config.relays.urls.join(", "));
        println!("  P2P:        {}", server_config.p2p.enabled);
        println!("  Cache cap:  {} bytes", server_config.cache.max_cache_size_bytes);
        println!("  Manifest:   {}", server_config.manifest.is_some());
        return Ok(());
    }

    // Build tokio runtime
    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    let shutdown = rt.block_on(async {
        tokio::select! {
            result = daemon::run(server_config) => result,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Received shutdown signal. Exiting…");
                Ok(())
            }
        }
    });

    if let Err(e) = shutdown {
        log::error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"NoString Server — headless Nostr engine daemon

USAGE:
    nostring-server [OPTIONS]

OPTIONS:
    -c, --config <PATH>   Config file path (default: /config/nostring-server.toml)
    --validate            Validate config file and exit
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    NOSTRING_DATA_DIR     Data directory path
    NOSTRING_LOG_LEVEL    Log level (error/warn/info/debug/trace)
    NOSTRING_P2P_ENABLED  Enable/disable the P2P signaling coordinator

EXAMPLES:
    # Run as daemon with config file
    nostring-server --config /path/to/config.toml

    # Validate configuration
    nostring-server --config config.toml --validate
"#
    );
}
