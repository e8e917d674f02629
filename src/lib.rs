//! GIF Portal: a wallet-connected client for a shared on-ledger record list
//!
//! This crate connects a browser-style wallet extension, reads an ordered
//! list of records stored in a single program-owned account on a
//! Solana-style cluster, appends records through signed program
//! instructions and tips record authors with native transfers.
//!
//! # Architecture
//!
//! - **Identity**: record list keypair and program id, loaded once
//! - **Wallet Sessions**: silent reconnect at startup, interactive connect on demand
//! - **Client Factory**: fresh RPC clients bound to the endpoint and the session's signer
//! - **Synchronizer**: cached record list, classified as uninitialized or loaded
//! - **Mutation Submitter**: initialize, append and tip with per-kind in-flight tracking
//! - **View Projector**: pure mapping from state to what the user sees
//!
//! # Example
//!
//! ```ignore
//! use gif_portal::{Portal, PortalConfig, StaticEnvironment};
//!
//! let config = PortalConfig::from_env();
//! let portal = Portal::from_config(&config, Arc::new(StaticEnvironment::with_extension(wallet)))?;
//!
//! portal.start().await;
//! portal.connect().await?;
//! if matches!(portal.view(), ViewState::NeedsInitialization { .. }) {
//!     portal.initialize_account().await?;
//! }
//! portal.append_record("https://media.giphy.com/media/zrvFl1IDvy0PC/giphy.gif").await?;
//! portal.send_tip_sol(0, "0.1").await?;
//! ```

// Public modules
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod portal;
pub mod program;
pub mod submit;
pub mod sync;
pub mod view;
pub mod wallet;

// Re-exports for convenience
pub use client::{ClientFactory, LedgerClient};
pub use config::{Cluster, ConfirmPolicy, NetworkEndpoint, PortalConfig};
pub use error::PortalError;
pub use identity::Identity;
pub use ledger::{Commitment, Keypair, Pubkey, Signature, Signer, LAMPORTS_PER_SOL};
pub use portal::Portal;
pub use submit::{parse_sol_amount, MutationKind, MutationState, MutationSubmitter};
pub use sync::{CacheStatus, LocalCache, Record, Synchronizer};
pub use view::{project, ViewInput, ViewState};
pub use wallet::{
    EnvironmentProbe, ExtensionError, KeypairWallet, SessionManager, StaticEnvironment, Trust,
    WalletExtension, WalletSession,
};

/// Result type for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;
