// Ledger plumbing
// Key and transaction types come from solana-sdk; this module adds keypair
// file loading and a JSON-RPC client

pub mod keypair;
pub mod rpc;
pub mod types;

pub use keypair::{read_keypair, read_keypair_file, write_keypair_file, KeypairError};
pub use rpc::{Account, RpcClient, RpcError};
pub use types::Commitment;

pub use solana_sdk::hash::Hash;
pub use solana_sdk::instruction::{AccountMeta, Instruction};
pub use solana_sdk::message::Message;
pub use solana_sdk::native_token::LAMPORTS_PER_SOL;
pub use solana_sdk::pubkey::Pubkey;
pub use solana_sdk::signature::{Keypair, Signature};
pub use solana_sdk::signer::{Signer, SignerError};
pub use solana_sdk::system_instruction;
pub use solana_sdk::system_program;
pub use solana_sdk::transaction::Transaction;
