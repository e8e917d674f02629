//! JSON-RPC client for a cluster endpoint
//!
//! Thin typed wrapper over HTTP POST. Errors stay low level here
//! ([`RpcError`]); callers decide whether a failure is a fetch or a
//! submission problem.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use super::types::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("HTTP error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Decoded account contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub lamports: u64,
    pub data: Vec<u8>,
    pub owner: Pubkey,
    pub executable: bool,
}

impl TryFrom<UiAccount> for Account {
    type Error = RpcError;

    fn try_from(ui: UiAccount) -> Result<Self, Self::Error> {
        let (payload, encoding) = ui.data;
        if encoding != "base64" {
            return Err(RpcError::Decode(format!("unexpected encoding '{}'", encoding)));
        }
        let data = BASE64
            .decode(payload)
            .map_err(|e| RpcError::Decode(format!("account data: {}", e)))?;
        let owner = ui
            .owner
            .parse()
            .map_err(|e| RpcError::Decode(format!("account owner: {}", e)))?;
        Ok(Self {
            lamports: ui.lamports,
            data,
            owner,
            executable: ui.executable,
        })
    }
}

pub struct RpcClient {
    url: String,
    commitment: Commitment,
    /// reqwest::Client is internally Arc-based
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Self {
        Self {
            url: url.into(),
            commitment,
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        };
        log::debug!("   📤 {} #{} -> {}", method, id, self.url);

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Transport(format!("HTTP {}: {}", status, body)));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(format!("{} response: {}", method, e)))?;

        if let Some(error) = envelope.error {
            log::debug!("   📥 {} #{} failed: {}", method, id, error.message);
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        envelope
            .result
            .ok_or_else(|| RpcError::Decode(format!("{} response has no result", method)))
    }

    /// `Ok(None)` when the cluster has no account at `address`
    pub async fn get_account_info(&self, address: &Pubkey) -> Result<Option<Account>, RpcError> {
        let response: WithContext<Option<UiAccount>> = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.commitment }
                ]),
            )
            .await?;
        response.value.map(Account::try_from).transpose()
    }

    pub async fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
        let response: WithContext<RpcBlockhash> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment }]),
            )
            .await?;
        response
            .value
            .blockhash
            .parse()
            .map_err(|e| RpcError::Decode(format!("blockhash: {}", e)))
    }

    pub async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError> {
        let wire = bincode::serialize(tx)
            .map_err(|e| RpcError::Decode(format!("transaction encoding: {}", e)))?;
        let signature: String = self
            .call(
                "sendTransaction",
                json!([
                    BASE64.encode(wire),
                    {
                        "encoding": "base64",
                        "skipPreflight": false,
                        "preflightCommitment": self.commitment,
                    }
                ]),
            )
            .await?;
        signature
            .parse()
            .map_err(|e| RpcError::Decode(format!("signature: {}", e)))
    }

    /// `Ok(None)` while the cluster has not seen the signature
    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionStatus>, RpcError> {
        let response: WithContext<Vec<Option<TransactionStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    pub async fn get_balance(&self, address: &Pubkey) -> Result<u64, RpcError> {
        let response: WithContext<u64> = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment }]),
            )
            .await?;
        Ok(response.value)
    }
}
