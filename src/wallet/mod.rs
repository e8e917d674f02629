// Wallet integration
// Provides extension detection, a keypair-backed extension and session management

pub mod extension;
pub mod keypair_wallet;
pub mod session;

pub use extension::{EnvironmentProbe, ExtensionError, StaticEnvironment, WalletExtension};
pub use keypair_wallet::KeypairWallet;
pub use session::{SessionManager, Trust, WalletSession};
