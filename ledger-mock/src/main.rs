/// Ledger Mock Server
///
/// A lightweight in-memory cluster speaking the JSON-RPC subset the portal
/// uses. Designed for local development and testing.

use anyhow::{Context, Result};
use std::env;
use std::sync::Arc;

use gif_portal::ledger::Pubkey;
use gif_portal::program::Idl;

use ledger_mock::{run_server, MockCluster};

#[derive(Debug)]
struct Config {
    program_id: Pubkey,

    // Server
    server_host: String,
    server_port: u16,
}

impl Config {
    fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let program_id = match env::var("LEDGER_MOCK_PROGRAM_ID") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("Invalid LEDGER_MOCK_PROGRAM_ID '{}'", value))?,
            Err(_) => program_id_from_idl()?,
        };

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8899".to_string())
            .parse()
            .context("Invalid SERVER_PORT")?;

        Ok(Self {
            program_id,
            server_host,
            server_port,
        })
    }
}

/// Program id from the IDL the portal is configured with, or a fresh one
fn program_id_from_idl() -> Result<Pubkey> {
    let path = env::var("PORTAL_IDL_PATH").unwrap_or_else(|_| "idl.json".to_string());
    let Ok(text) = std::fs::read_to_string(&path) else {
        let program_id = Pubkey::new_unique();
        log::warn!("⚠️  No IDL at {}, using a fresh program id {}", path, program_id);
        return Ok(program_id);
    };
    let idl = Idl::from_json(&text).with_context(|| format!("Failed to parse {}", path))?;
    idl.program_id()
        .with_context(|| format!("No program address in {}", path))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting Ledger Mock Server...");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    log::info!("Server will listen on {}:{}", config.server_host, config.server_port);

    let cluster = Arc::new(MockCluster::new(config.program_id));

    // Run server
    run_server(cluster, config.server_host, config.server_port)
        .await
        .context("Server error")?;

    Ok(())
}
