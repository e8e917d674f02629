//! Portal configuration from environment variables
//!
//! Controls the cluster endpoint, commitment level, identity files and
//! confirmation policy. Defaults to devnet with `processed` commitment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::ledger::Commitment;

/// Well-known clusters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cluster {
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
}

impl Cluster {
    /// Public RPC URL for this cluster
    pub fn url(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
        }
    }
}

/// Cluster URL and commitment, fixed for the process lifetime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub url: String,
    pub commitment: Commitment,
}

impl NetworkEndpoint {
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Self {
        Self {
            url: url.into(),
            commitment,
        }
    }
}

impl Default for NetworkEndpoint {
    fn default() -> Self {
        Self::new(Cluster::Devnet.url(), Commitment::Processed)
    }
}

/// How long to wait for a broadcast transaction to reach the commitment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub endpoint: NetworkEndpoint,
    pub confirm: ConfirmPolicy,
    /// Keypair credential for the record list account
    pub keypair_path: PathBuf,
    /// Interface description document of the program
    pub idl_path: PathBuf,
}

impl PortalConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PORTAL_CLUSTER`: "devnet" (default), "testnet", "mainnet-beta" or "localnet"
    /// - `PORTAL_RPC_URL`: RPC endpoint, overrides the cluster's public URL
    /// - `PORTAL_COMMITMENT`: "processed" (default), "confirmed" or "finalized"
    /// - `PORTAL_KEYPAIR_PATH`: record list keypair file (default `keypair.json`)
    /// - `PORTAL_IDL_PATH`: program IDL (default `idl.json`)
    /// - `PORTAL_CONFIRM_TIMEOUT_SECS`: confirmation timeout (default 30)
    /// - `PORTAL_POLL_INTERVAL_MS`: status poll interval (default 500)
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Devnet (default)
    /// cargo test
    ///
    /// # Local validator
    /// PORTAL_CLUSTER=localnet PORTAL_COMMITMENT=confirmed cargo test
    /// ```
    pub fn from_env() -> Self {
        let cluster_str = env::var("PORTAL_CLUSTER")
            .unwrap_or_else(|_| "devnet".to_string())
            .to_lowercase();

        let cluster = match cluster_str.as_str() {
            "devnet" | "" => Cluster::Devnet,
            "testnet" => Cluster::Testnet,
            "mainnet-beta" | "mainnet" => Cluster::MainnetBeta,
            "localnet" | "localhost" => Cluster::Localnet,
            other => {
                log::warn!("⚠️  Unknown cluster '{}', defaulting to devnet", other);
                Cluster::Devnet
            }
        };

        let url = env::var("PORTAL_RPC_URL").unwrap_or_else(|_| cluster.url().to_string());
        log::info!("📡 RPC URL: {}", url);

        let commitment = match env::var("PORTAL_COMMITMENT") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                log::warn!("⚠️  {}, defaulting to processed", e);
                Commitment::Processed
            }),
            Err(_) => Commitment::Processed,
        };
        log::info!("🔒 Commitment: {}", commitment);

        let defaults = ConfirmPolicy::default();
        let confirm = ConfirmPolicy {
            timeout: env_number("PORTAL_CONFIRM_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            poll_interval: env_number("PORTAL_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
        };

        let keypair_path = env::var("PORTAL_KEYPAIR_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("keypair.json"));
        let idl_path = env::var("PORTAL_IDL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("idl.json"));
        log::info!("🔑 Keypair: {:?}, IDL: {:?}", keypair_path, idl_path);

        Self {
            endpoint: NetworkEndpoint::new(url, commitment),
            confirm,
            keypair_path,
            idl_path,
        }
    }
}

fn env_number(name: &str) -> Option<u64> {
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            log::warn!("⚠️  Ignoring {}={:?}, expected a positive integer", name, raw);
            None
        }
    }
}

impl Default for PortalConfig {
    /// Default configuration (devnet)
    fn default() -> Self {
        Self {
            endpoint: NetworkEndpoint::default(),
            confirm: ConfirmPolicy::default(),
            keypair_path: PathBuf::from("keypair.json"),
            idl_path: PathBuf::from("idl.json"),
        }
    }
}
