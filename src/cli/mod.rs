//! Command-line interface.
//!
//! With no subcommand the binary starts the API server. Subcommands:
//! - `config check` - Validate the configuration and seed file
//! - `seed <file>` - Import listings into the SQLite store

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::{Config, StorageBackend};
use crate::db::{load_seed_file, seed_listings, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "unistay")]
#[command(author, version, about = "Student accommodation listings and bookings API", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "UNISTAY_CONFIG", default_value = "unistay.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Skip startup self-checks (for development only)
    #[arg(long)]
    pub skip_checks: bool,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Import listings from a JSON file into the SQLite store
    Seed {
        /// JSON file holding an array of listings or {"properties": [...]}
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Run a CLI subcommand. Returns without doing anything when there is none.
pub async fn run_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(&cli.config),
        Some(Commands::Seed { file }) => cmd_seed(&cli.config, file).await,
        None => Ok(()),
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "Enabled"
    } else {
        "Disabled"
    }
}

fn cmd_config_check(config_path: &Path) -> Result<()> {
    println!("Checking configuration file: {}", config_path.display());
    println!();

    if !config_path.exists() {
        println!("[!!] Configuration file not found: {}", config_path.display());
        println!();
        println!("A default configuration will be used when starting the server.");
        println!("To create a custom configuration, copy unistay.example.toml to unistay.toml");
        return Ok(());
    }

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("[!!] Configuration file is invalid!");
            println!();
            println!("Error: {:#}", e);
            anyhow::bail!("Invalid configuration file");
        }
    };

    println!("[OK] Configuration file is valid!");
    println!();
    println!("=== Configuration Summary ===");
    println!();
    println!("Server:");
    println!("  Address:      {}:{}", config.server.host, config.server.port);
    println!("  Environment:  {:?}", config.server.environment);
    println!();
    println!("Storage:");
    println!("  Backend:      {:?}", config.storage.backend);
    println!("  Data Dir:     {}", config.storage.data_dir.display());
    match &config.storage.seed_file {
        Some(path) => println!("  Seed File:    {}", path.display()),
        None => println!("  Seed File:    (none)"),
    }
    println!();
    println!("Query:");
    println!("  Page Size:    {} (max {})", config.query.default_page_size, config.query.max_page_size);
    println!();
    println!("Security:");
    println!("  Rate Limiting: {}", on_off(config.rate_limit.enabled));
    println!("  Proxy Headers: {}", on_off(config.rate_limit.trust_proxy_headers));
    println!("  Token TTL:    {}h", config.auth.token_ttl_hours);
    println!();

    let mut warnings = Vec::new();

    if config.auth.jwt_secret.is_none() {
        warnings.push("No JWT secret set - tokens will be invalidated on every restart".to_string());
    }

    if let Some(path) = &config.storage.seed_file {
        if path.exists() {
            match load_seed_file(path) {
                Ok(listings) => println!("Seed file parses: {} listings", listings.len()),
                Err(e) => warnings.push(format!("Seed file is invalid: {:#}", e)),
            }
        } else {
            warnings.push(format!("Seed file not found: {}", path.display()));
        }
    }

    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in warnings {
            println!("  [!] {}", warning);
        }
    }

    Ok(())
}

async fn cmd_seed(config_path: &Path, file: &Path) -> Result<()> {
    let config = Config::load(config_path)?;

    if config.storage.backend != StorageBackend::Sqlite {
        anyhow::bail!(
            "The seed command writes to the SQLite store; set storage.backend = \"sqlite\" \
             (the memory backend is seeded from storage.seed_file at startup)"
        );
    }

    let listings = load_seed_file(file)?;

    std::fs::create_dir_all(&config.storage.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.storage.data_dir.display()
        )
    })?;
    let store = SqliteStore::connect(&config.storage.data_dir.join("unistay.db")).await?;

    let report = seed_listings(&store, listings).await?;
    println!(
        "[OK] Imported {} listings ({} skipped as duplicates)",
        report.inserted, report.skipped
    );
    Ok(())
}
