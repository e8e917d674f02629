//! Error types for portal operations
//!
//! Every failure of a portal operation is turned into a [`PortalError`] value
//! at the operation boundary. Nothing is retried automatically.

use thiserror::Error;

use crate::submit::MutationKind;

/// Core error type for wallet, read and mutation operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// No compatible wallet extension is present (install a wallet)
    #[error("No wallet extension found. Install a Solana wallet to continue")]
    WalletUnavailable,

    /// The user declined to connect or to sign
    #[error("Request rejected by the user: {0}")]
    UserRejected(String),

    /// The account does not exist on the ledger yet
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Transient read or decode failure; the cache is left as it was
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The network or the remote program rejected the instruction
    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    /// Broadcast succeeded but confirmation was not observed in time.
    /// The transaction may still land.
    #[error("Confirmation not observed in time for {signature}; the transaction may still land")]
    ConfirmationTimeout { signature: String },

    /// Local precondition violation, nothing was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A mutation of the same kind is already being submitted
    #[error("A {0} request is already in flight")]
    MutationInFlight(MutationKind),

    /// The operation needs a wallet session
    #[error("Wallet not connected")]
    NotConnected,

    /// Static configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PortalError {
    /// Create a fetch failed error
    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    /// Create a submission failed error
    pub fn submission_failed(msg: impl Into<String>) -> Self {
        Self::SubmissionFailed(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
