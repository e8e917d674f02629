//! Wallet session lifecycle
//!
//! At most one session exists at a time. `probe_session` is the silent
//! reconnect run once at startup; `request_session` is the user-initiated
//! connect. Both go through the same lock so only one connect is ever
//! outstanding.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use super::extension::{EnvironmentProbe, ExtensionError, WalletExtension};
use crate::error::PortalError;
use crate::ledger::Pubkey;

/// How the session was established
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trust {
    /// Silent reconnect of a previously approved origin
    Implicit,
    /// The user approved a connect prompt
    Explicit,
}

#[derive(Clone)]
pub struct WalletSession {
    address: Pubkey,
    trust: Trust,
    extension: Arc<dyn WalletExtension>,
}

impl WalletSession {
    pub fn address(&self) -> Pubkey {
        self.address
    }

    pub fn trust(&self) -> Trust {
        self.trust
    }

    /// Signing capability of the connected wallet
    pub fn extension(&self) -> Arc<dyn WalletExtension> {
        self.extension.clone()
    }
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("address", &self.address)
            .field("trust", &self.trust)
            .field("extension", &self.extension.name())
            .finish()
    }
}

pub struct SessionManager {
    probe: Arc<dyn EnvironmentProbe>,
    session: RwLock<Option<WalletSession>>,
    connecting: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(probe: Arc<dyn EnvironmentProbe>) -> Self {
        Self {
            probe,
            session: RwLock::new(None),
            connecting: tokio::sync::Mutex::new(()),
        }
    }

    pub fn wallet_detected(&self) -> bool {
        self.probe.detect().is_some()
    }

    pub fn current(&self) -> Option<WalletSession> {
        self.session.read().clone()
    }

    pub fn address(&self) -> Option<Pubkey> {
        self.session.read().as_ref().map(|s| s.address)
    }

    /// Silent reconnect. Never prompts; any failure leaves the session absent.
    pub async fn probe_session(&self) -> Option<WalletSession> {
        let _guard = self.connecting.lock().await;
        if let Some(existing) = self.current() {
            return Some(existing);
        }

        let Some(extension) = self.probe.detect() else {
            log::warn!("👻 No wallet extension found, get a wallet to connect");
            return None;
        };
        log::info!("👛 Wallet extension found: {}", extension.name());

        match extension.connect(true).await {
            Ok(address) => {
                log::info!("✅ Reconnected with public key: {}", address);
                Some(self.establish(address, Trust::Implicit, extension))
            }
            Err(ExtensionError::NotTrusted) => {
                log::debug!("   Origin not trusted yet, waiting for an explicit connect");
                None
            }
            Err(e) => {
                log::error!("❌ Silent reconnect failed: {}", e);
                None
            }
        }
    }

    /// Interactive connect. Returns the existing session without prompting if
    /// one is already established.
    pub async fn request_session(&self) -> Result<WalletSession, PortalError> {
        let _guard = self.connecting.lock().await;
        if let Some(existing) = self.current() {
            log::debug!("   Session already established for {}", existing.address);
            return Ok(existing);
        }

        let extension = self.probe.detect().ok_or_else(|| {
            log::warn!("👻 No wallet extension found");
            PortalError::WalletUnavailable
        })?;

        match extension.connect(false).await {
            Ok(address) => {
                log::info!("✅ Connected with public key: {}", address);
                Ok(self.establish(address, Trust::Explicit, extension))
            }
            Err(ExtensionError::Rejected(reason)) => {
                log::info!("🚫 Connect rejected: {}", reason);
                Err(PortalError::UserRejected(reason))
            }
            Err(e) => {
                log::error!("❌ Wallet connect failed: {}", e);
                Err(PortalError::WalletUnavailable)
            }
        }
    }

    pub async fn disconnect(&self) {
        let session = self.session.write().take();
        if let Some(session) = session {
            session.extension.disconnect().await;
            log::info!("👋 Disconnected {}", session.address);
        }
    }

    fn establish(
        &self,
        address: Pubkey,
        trust: Trust,
        extension: Arc<dyn WalletExtension>,
    ) -> WalletSession {
        let session = WalletSession {
            address,
            trust,
            extension,
        };
        *self.session.write() = Some(session.clone());
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Keypair;
    use crate::wallet::{KeypairWallet, StaticEnvironment};

    fn manager_with(wallet: Arc<KeypairWallet>) -> SessionManager {
        SessionManager::new(Arc::new(StaticEnvironment::with_extension(wallet)))
    }

    #[tokio::test]
    async fn test_probe_with_trusted_origin() {
        let wallet = Arc::new(KeypairWallet::new(Keypair::new()).trusted());
        let manager = manager_with(wallet.clone());

        let session = manager.probe_session().await.unwrap();
        assert_eq!(session.trust(), Trust::Implicit);
        assert_eq!(session.address(), wallet.pubkey());
        assert_eq!(wallet.connect_prompts(), 0);
    }

    #[tokio::test]
    async fn test_probe_with_untrusted_origin_is_silent() {
        let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
        let manager = manager_with(wallet.clone());

        assert!(manager.probe_session().await.is_none());
        assert!(manager.current().is_none());
        assert_eq!(wallet.connect_prompts(), 0);
    }

    #[tokio::test]
    async fn test_request_is_a_noop_when_connected() {
        let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
        let manager = manager_with(wallet.clone());

        let first = manager.request_session().await.unwrap();
        assert_eq!(first.trust(), Trust::Explicit);
        let second = manager.request_session().await.unwrap();
        assert_eq!(second.address(), first.address());
        assert_eq!(wallet.connect_prompts(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_prompt_once() {
        let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
        let manager = manager_with(wallet.clone());

        let (a, b) = tokio::join!(manager.request_session(), manager.request_session());
        assert_eq!(a.unwrap().address(), b.unwrap().address());
        assert_eq!(wallet.connect_prompts(), 1);
    }

    #[tokio::test]
    async fn test_request_rejected_and_absent() {
        let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
        wallet.set_connect_approval(false);
        let manager = manager_with(wallet);
        assert!(matches!(
            manager.request_session().await,
            Err(PortalError::UserRejected(_))
        ));
        assert!(manager.address().is_none());

        let absent = SessionManager::new(Arc::new(StaticEnvironment::absent()));
        assert!(!absent.wallet_detected());
        assert_eq!(
            absent.request_session().await.unwrap_err(),
            PortalError::WalletUnavailable
        );
        assert!(absent.probe_session().await.is_none());
    }

    #[tokio::test]
    async fn test_disconnect_clears_session() {
        let wallet = Arc::new(KeypairWallet::new(Keypair::new()).trusted());
        let manager = manager_with(wallet);
        manager.probe_session().await.unwrap();
        manager.disconnect().await;
        assert!(manager.current().is_none());
    }
}
