use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::extension::{ExtensionError, WalletExtension};
use crate::ledger::{Keypair, Pubkey, Signer, Transaction};

/// Headless wallet backed by a local keypair.
///
/// Behaves like a browser extension towards the portal:
/// - a silent connect succeeds only once the origin has been approved
/// - interactive connects and signature requests count as prompts and can be
///   approved or declined
pub struct KeypairWallet {
    keypair: Keypair,
    trusted: AtomicBool,
    connected: AtomicBool,
    approve_connect: AtomicBool,
    approve_signing: AtomicBool,
    connect_prompts: AtomicUsize,
    signing_prompts: AtomicUsize,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            trusted: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            approve_connect: AtomicBool::new(true),
            approve_signing: AtomicBool::new(true),
            connect_prompts: AtomicUsize::new(0),
            signing_prompts: AtomicUsize::new(0),
        }
    }

    /// Mark this origin as previously approved
    pub fn trusted(self) -> Self {
        self.trusted.store(true, Ordering::SeqCst);
        self
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted.load(Ordering::SeqCst)
    }

    pub fn set_connect_approval(&self, approve: bool) {
        self.approve_connect.store(approve, Ordering::SeqCst);
    }

    pub fn set_signing_approval(&self, approve: bool) {
        self.approve_signing.store(approve, Ordering::SeqCst);
    }

    /// Number of interactive connect prompts shown so far
    pub fn connect_prompts(&self) -> usize {
        self.connect_prompts.load(Ordering::SeqCst)
    }

    pub fn signing_prompts(&self) -> usize {
        self.signing_prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletExtension for KeypairWallet {
    fn name(&self) -> &str {
        "keypair"
    }

    async fn connect(&self, only_if_trusted: bool) -> Result<Pubkey, ExtensionError> {
        if only_if_trusted {
            if !self.is_trusted() {
                return Err(ExtensionError::NotTrusted);
            }
        } else {
            self.connect_prompts.fetch_add(1, Ordering::SeqCst);
            if !self.approve_connect.load(Ordering::SeqCst) {
                return Err(ExtensionError::Rejected(
                    "user declined the connection request".to_string(),
                ));
            }
            self.trusted.store(true, Ordering::SeqCst);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.pubkey())
    }

    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction, ExtensionError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ExtensionError::Internal("wallet is not connected".to_string()));
        }
        self.signing_prompts.fetch_add(1, Ordering::SeqCst);
        if !self.approve_signing.load(Ordering::SeqCst) {
            return Err(ExtensionError::Rejected(
                "user declined to sign the transaction".to_string(),
            ));
        }
        let blockhash = tx.message.recent_blockhash;
        tx.try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| ExtensionError::Internal(e.to_string()))?;
        Ok(tx)
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}
