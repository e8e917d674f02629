//! Shared test harness: an in-process ledger mock, identity files on disk and
//! a portal wired to a headless keypair wallet.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use gif_portal::ledger::write_keypair_file;
use gif_portal::{
    Commitment, ConfirmPolicy, Keypair, KeypairWallet, NetworkEndpoint, Portal, PortalConfig,
    Pubkey, Signer, StaticEnvironment,
};
use ledger_mock::MockCluster;
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;

pub const GIF: &str = "https://media.giphy.com/media/zrvFl1IDvy0PC/giphy.gif";

pub fn init_logging() {
    dotenv::dotenv().ok();
    env_logger::builder().is_test(true).try_init().ok();
}

pub fn fast_confirm() -> ConfirmPolicy {
    ConfirmPolicy {
        timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(20),
    }
}

pub struct Harness {
    pub cluster: Arc<MockCluster>,
    pub config: PortalConfig,
    pub record_list: Pubkey,
    _dir: TempDir,
    _server: JoinHandle<()>,
}

impl Harness {
    /// Spawn a mock cluster and write an IDL and record list keypair for it
    pub async fn new(confirm: ConfirmPolicy) -> anyhow::Result<Self> {
        init_logging();

        let program_id = Pubkey::new_unique();
        let cluster = Arc::new(MockCluster::new(program_id));
        let (addr, server) = ledger_mock::spawn(cluster.clone()).await?;

        let dir = TempDir::new()?;
        let idl_path = dir.path().join("idl.json");
        std::fs::write(&idl_path, idl_json(&program_id))?;

        let record_list = Keypair::new();
        let keypair_path = dir.path().join("keypair.json");
        write_keypair_file(&record_list, &keypair_path)?;

        let config = PortalConfig {
            endpoint: NetworkEndpoint::new(format!("http://{}", addr), Commitment::Processed),
            confirm,
            keypair_path,
            idl_path,
        };

        Ok(Self {
            cluster,
            config,
            record_list: record_list.pubkey(),
            _dir: dir,
            _server: server,
        })
    }

    pub fn dir(&self) -> PathBuf {
        self._dir.path().to_path_buf()
    }

    /// A portal whose environment exposes `wallet`
    pub fn portal(&self, wallet: Arc<KeypairWallet>) -> anyhow::Result<Portal> {
        let probe = Arc::new(StaticEnvironment::with_extension(wallet));
        Ok(Portal::from_config(&self.config, probe)?)
    }

    /// A portal in an environment without any wallet extension
    pub fn portal_without_wallet(&self) -> anyhow::Result<Portal> {
        Ok(Portal::from_config(
            &self.config,
            Arc::new(StaticEnvironment::absent()),
        )?)
    }

    /// Connected portal with a funded wallet and an initialized record list
    pub async fn ready_portal(&self) -> anyhow::Result<(Portal, Arc<KeypairWallet>)> {
        let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
        self.cluster.airdrop(&wallet.pubkey(), 2_000_000_000);
        let portal = self.portal(wallet.clone())?;
        portal.connect().await?;
        if self.cluster.record_list(&self.record_list).is_none() {
            portal.initialize_account().await?;
        } else {
            portal.refresh().await?;
        }
        Ok((portal, wallet))
    }
}

/// Anchor IDL in the older layout with `metadata.address`
pub fn idl_json(program_id: &Pubkey) -> String {
    json!({
        "version": "0.1.0",
        "name": "myepicproject",
        "instructions": [
            { "name": "startStuffOff", "accounts": [], "args": [] },
            { "name": "addGif", "accounts": [], "args": [{ "name": "gifLink", "type": "string" }] }
        ],
        "metadata": { "address": program_id.to_string() }
    })
    .to_string()
}
