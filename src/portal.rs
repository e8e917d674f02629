//! Portal process root
//!
//! Owns the identity, the wallet session, the cache and the mutation states,
//! and sequences them: connect then refresh, mutation then refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::client::{ClientFactory, LedgerClient};
use crate::config::{ConfirmPolicy, NetworkEndpoint, PortalConfig};
use crate::error::PortalError;
use crate::identity::Identity;
use crate::ledger::{Pubkey, Signature};
use crate::submit::{parse_sol_amount, MutationKind, MutationState, MutationSubmitter};
use crate::sync::{LocalCache, Synchronizer};
use crate::view::{project, ViewInput, ViewState};
use crate::wallet::{EnvironmentProbe, SessionManager, WalletSession};

pub struct Portal {
    identity: Arc<Identity>,
    sessions: SessionManager,
    factory: ClientFactory,
    sync: Synchronizer,
    submitter: MutationSubmitter,
    started: AtomicBool,
}

impl Portal {
    pub fn new(
        endpoint: NetworkEndpoint,
        confirm: ConfirmPolicy,
        identity: Identity,
        probe: Arc<dyn EnvironmentProbe>,
    ) -> Self {
        let identity = Arc::new(identity);
        Self {
            sessions: SessionManager::new(probe),
            factory: ClientFactory::new(endpoint, confirm),
            sync: Synchronizer::new(),
            submitter: MutationSubmitter::new(identity.clone()),
            identity,
            started: AtomicBool::new(false),
        }
    }

    /// Load the identity files named by `config` and build a portal
    pub fn from_config(
        config: &PortalConfig,
        probe: Arc<dyn EnvironmentProbe>,
    ) -> Result<Self, PortalError> {
        let identity = Identity::load(config)?;
        Ok(Self::new(
            config.endpoint.clone(),
            config.confirm,
            identity,
            probe,
        ))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn session(&self) -> Option<WalletSession> {
        self.sessions.current()
    }

    /// Startup routine: silent reconnect, then a first refresh. Runs once.
    pub async fn start(&self) -> Option<WalletSession> {
        if self.started.swap(true, Ordering::SeqCst) {
            log::debug!("   Portal already started");
            return self.sessions.current();
        }
        log::info!(
            "🚀 Starting portal for record list {}",
            self.identity.record_list_address()
        );

        let session = self.sessions.probe_session().await?;
        self.refresh_quietly(&session).await;
        Some(session)
    }

    /// Interactive connect followed by a refresh
    pub async fn connect(&self) -> Result<WalletSession, PortalError> {
        let had_session = self.sessions.current().is_some();
        let session = self.sessions.request_session().await?;
        if !had_session {
            self.refresh_quietly(&session).await;
        }
        Ok(session)
    }

    pub async fn disconnect(&self) {
        self.sessions.disconnect().await;
        self.sync.reset();
    }

    pub async fn refresh(&self) -> Result<LocalCache, PortalError> {
        let client = self.client()?;
        self.sync
            .refresh(&client, &self.identity.record_list_address())
            .await
    }

    pub async fn initialize_account(&self) -> Result<Signature, PortalError> {
        let client = self.client()?;
        let epoch = self.sync.epoch();
        let signature = self
            .submitter
            .initialize_account(&client, &self.sync.snapshot())
            .await?;
        self.refresh_after(&client, epoch, MutationKind::Initialize)
            .await;
        Ok(signature)
    }

    pub async fn append_record(&self, content: &str) -> Result<Signature, PortalError> {
        let client = self.client()?;
        let epoch = self.sync.epoch();
        let signature = self
            .submitter
            .append_record(&client, &self.sync.snapshot(), content)
            .await?;
        self.refresh_after(&client, epoch, MutationKind::Append).await;
        Ok(signature)
    }

    /// Tip the author of the cached record at `record_index`
    pub async fn send_tip(&self, record_index: usize, lamports: u64) -> Result<Signature, PortalError> {
        let client = self.client()?;
        self.submitter
            .send_tip(&client, &self.sync.snapshot(), record_index, lamports)
            .await
    }

    /// [`Portal::send_tip`] with the amount given as decimal SOL text
    pub async fn send_tip_sol(
        &self,
        record_index: usize,
        amount: &str,
    ) -> Result<Signature, PortalError> {
        let lamports = parse_sol_amount(amount)?;
        self.send_tip(record_index, lamports).await
    }

    pub async fn balance(&self, address: &Pubkey) -> Result<u64, PortalError> {
        self.client()?.balance(address).await
    }

    pub fn cache(&self) -> LocalCache {
        self.sync.snapshot()
    }

    pub fn mutation_state(&self, kind: MutationKind) -> MutationState {
        self.submitter.state(kind)
    }

    pub fn view(&self) -> ViewState {
        project(&ViewInput {
            wallet_detected: self.sessions.wallet_detected(),
            connected: self.sessions.current().is_some(),
            cache: self.sync.snapshot(),
            initializing: self.submitter.is_submitting(MutationKind::Initialize),
            appending: self.submitter.is_submitting(MutationKind::Append),
            tipping: self.submitter.is_submitting(MutationKind::Tip),
        })
    }

    fn client(&self) -> Result<LedgerClient, PortalError> {
        let session = self.sessions.current().ok_or(PortalError::NotConnected)?;
        Ok(self.factory.build_client(&session))
    }

    async fn refresh_quietly(&self, session: &WalletSession) {
        let client = self.factory.build_client(session);
        if let Err(e) = self
            .sync
            .refresh(&client, &self.identity.record_list_address())
            .await
        {
            log::error!("❌ Initial refresh failed: {}", e);
        }
    }

    /// The mutation is confirmed at this point; a failed read does not undo it.
    /// Skipped when the session ended while the mutation was in flight.
    async fn refresh_after(&self, client: &LedgerClient, epoch: u64, kind: MutationKind) {
        if let Err(e) = self
            .sync
            .refresh_in(epoch, client, &self.identity.record_list_address())
            .await
        {
            log::error!("❌ Refresh after {} failed: {}", kind, e);
        }
    }
}
