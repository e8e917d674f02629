//! Wallet extension capability and environment detection

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::ledger::{Pubkey, Transaction};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// Silent connect refused: this origin was never approved
    #[error("origin is not trusted")]
    NotTrusted,

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("wallet error: {0}")]
    Internal(String),
}

/// Signing capability exposed by a wallet extension
#[async_trait]
pub trait WalletExtension: Send + Sync {
    fn name(&self) -> &str;

    /// Connect and return the wallet's public key.
    ///
    /// With `only_if_trusted` the wallet must not prompt; it either approves
    /// silently or fails with [`ExtensionError::NotTrusted`].
    async fn connect(&self, only_if_trusted: bool) -> Result<Pubkey, ExtensionError>;

    /// Add the wallet's signature to `tx`, prompting the user
    async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction, ExtensionError>;

    async fn disconnect(&self);
}

/// Runtime detection of a wallet extension
pub trait EnvironmentProbe: Send + Sync {
    fn detect(&self) -> Option<Arc<dyn WalletExtension>>;
}

/// Environment with a fixed extension, or none at all
#[derive(Clone, Default)]
pub struct StaticEnvironment {
    extension: Option<Arc<dyn WalletExtension>>,
}

impl StaticEnvironment {
    pub fn with_extension(extension: Arc<dyn WalletExtension>) -> Self {
        Self {
            extension: Some(extension),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}

impl EnvironmentProbe for StaticEnvironment {
    fn detect(&self) -> Option<Arc<dyn WalletExtension>> {
        self.extension.clone()
    }
}
