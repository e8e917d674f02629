//! Keypair credential files
//!
//! Two file layouts are accepted:
//! - a JSON array of 64 bytes (secret key followed by public key), as written
//!   by the Solana CLI
//! - a web3.js dump: `{"_keypair": {"publicKey": {...}, "secretKey": {"0": 12, "1": 34, ...}}}`

use serde::Deserialize;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeypairError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected 64 keypair bytes, got {0}")]
    WrongLength(usize),

    #[error("invalid secret key: {0}")]
    InvalidKey(String),

    #[error("invalid secret key index: {0}")]
    InvalidIndex(String),

    #[error("public key does not match secret key")]
    Mismatch,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeypairFile {
    Bytes(Vec<u8>),
    Web3 {
        #[serde(rename = "_keypair")]
        keypair: Web3Keypair,
    },
}

#[derive(Deserialize)]
struct Web3Keypair {
    #[serde(rename = "secretKey")]
    secret_key: BTreeMap<String, u8>,
}

/// Build from 64 keypair bytes, checking the public half against the secret half
fn from_keypair_bytes(bytes: &[u8]) -> Result<Keypair, KeypairError> {
    if bytes.len() != 64 {
        return Err(KeypairError::WrongLength(bytes.len()));
    }
    let derived =
        keypair_from_seed(&bytes[..32]).map_err(|e| KeypairError::InvalidKey(e.to_string()))?;
    if derived.pubkey().as_ref() != &bytes[32..] {
        return Err(KeypairError::Mismatch);
    }
    Ok(derived)
}

/// Parse either file layout
pub fn read_keypair(text: &str) -> Result<Keypair, KeypairError> {
    match serde_json::from_str::<KeypairFile>(text)? {
        KeypairFile::Bytes(bytes) => from_keypair_bytes(&bytes),
        KeypairFile::Web3 { keypair } => {
            // Object keys are decimal indices; BTreeMap order is lexical
            let mut indexed = keypair
                .secret_key
                .into_iter()
                .map(|(index, byte)| {
                    index
                        .parse::<usize>()
                        .map(|i| (i, byte))
                        .map_err(|_| KeypairError::InvalidIndex(index))
                })
                .collect::<Result<Vec<_>, _>>()?;
            indexed.sort_unstable_by_key(|(i, _)| *i);
            let bytes: Vec<u8> = indexed.into_iter().map(|(_, b)| b).collect();
            from_keypair_bytes(&bytes)
        }
    }
}

pub fn read_keypair_file(path: impl AsRef<Path>) -> Result<Keypair, KeypairError> {
    let text = std::fs::read_to_string(path)?;
    read_keypair(&text)
}

/// Write as a JSON byte array
pub fn write_keypair_file(keypair: &Keypair, path: impl AsRef<Path>) -> Result<(), KeypairError> {
    let json = serde_json::to_string(&keypair.to_bytes().to_vec())?;
    std::fs::write(path, json)?;
    Ok(())
}
