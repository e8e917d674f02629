//! Ledger client factory
//!
//! A [`LedgerClient`] pairs an RPC connection with the signing capability of
//! a wallet session. Clients are cheap and built fresh for every operation so
//! they always reflect the session at call time.

use std::sync::Arc;

use crate::config::{ConfirmPolicy, NetworkEndpoint};
use crate::error::PortalError;
use crate::ledger::{
    Account, Hash, Instruction, Keypair, Message, Pubkey, RpcClient, RpcError, Signature,
    Transaction,
};
use crate::wallet::{ExtensionError, WalletExtension, WalletSession};

/// Builds request-capable clients bound to the fixed endpoint
#[derive(Clone, Debug)]
pub struct ClientFactory {
    endpoint: NetworkEndpoint,
    confirm: ConfirmPolicy,
}

impl ClientFactory {
    pub fn new(endpoint: NetworkEndpoint, confirm: ConfirmPolicy) -> Self {
        Self { endpoint, confirm }
    }

    pub fn endpoint(&self) -> &NetworkEndpoint {
        &self.endpoint
    }

    /// New client for `session`. Never cached, never fails.
    pub fn build_client(&self, session: &WalletSession) -> LedgerClient {
        log::debug!(
            "   Building client for {} at {} ({})",
            session.address(),
            self.endpoint.url,
            self.endpoint.commitment
        );
        LedgerClient {
            rpc: RpcClient::new(self.endpoint.url.clone(), self.endpoint.commitment),
            confirm: self.confirm,
            payer: session.address(),
            wallet: session.extension(),
        }
    }
}

pub struct LedgerClient {
    rpc: RpcClient,
    confirm: ConfirmPolicy,
    payer: Pubkey,
    wallet: Arc<dyn WalletExtension>,
}

impl LedgerClient {
    /// The wallet address that pays for and signs submissions
    pub fn payer(&self) -> Pubkey {
        self.payer
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Read an account; [`PortalError::AccountNotFound`] when it does not exist
    pub async fn get_account(&self, address: &Pubkey) -> Result<Account, PortalError> {
        match self.rpc.get_account_info(address).await {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(PortalError::AccountNotFound(address.to_string())),
            Err(e) => {
                log::error!("❌ Failed to read account {}: {}", address, e);
                Err(PortalError::fetch_failed(e.to_string()))
            }
        }
    }

    pub async fn balance(&self, address: &Pubkey) -> Result<u64, PortalError> {
        self.rpc
            .get_balance(address)
            .await
            .map_err(|e| PortalError::fetch_failed(e.to_string()))
    }

    pub async fn latest_blockhash(&self) -> Result<Hash, PortalError> {
        self.rpc.get_latest_blockhash().await.map_err(|e| {
            log::error!("❌ Failed to fetch a recent blockhash: {}", e);
            PortalError::submission_failed(format!("recent blockhash: {}", e))
        })
    }

    /// Compile, sign, broadcast and wait for the endpoint commitment.
    ///
    /// `co_signers` sign before the wallet is asked. The returned signature is
    /// the transaction id.
    pub async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        co_signers: &[&Keypair],
    ) -> Result<Signature, PortalError> {
        let blockhash = self.latest_blockhash().await?;
        log::debug!("   Recent blockhash: {}", blockhash);

        let message = Message::new_with_blockhash(instructions, Some(&self.payer), &blockhash);
        let mut tx = Transaction::new_unsigned(message);
        if !co_signers.is_empty() {
            tx.try_partial_sign(co_signers, blockhash)
                .map_err(|e| PortalError::submission_failed(e.to_string()))?;
        }

        log::info!("✍️  Requesting wallet signature from {}", self.wallet.name());
        let tx = self.wallet.sign_transaction(tx).await.map_err(|e| match e {
            ExtensionError::Rejected(reason) => {
                log::info!("🚫 Signature request rejected: {}", reason);
                PortalError::UserRejected(reason)
            }
            other => {
                log::error!("❌ Wallet failed to sign: {}", other);
                PortalError::submission_failed(other.to_string())
            }
        })?;
        if !tx.is_signed() {
            return Err(PortalError::submission_failed(
                "transaction is missing required signatures",
            ));
        }

        let signature = self.rpc.send_transaction(&tx).await.map_err(|e| {
            log::error!("❌ Broadcast failed: {}", e);
            PortalError::submission_failed(e.to_string())
        })?;
        log::info!("📡 Broadcast transaction {}", signature);

        self.await_confirmation(&signature).await?;
        log::info!("✅ Transaction {} reached {}", signature, self.rpc.commitment());
        Ok(signature)
    }

    async fn await_confirmation(&self, signature: &Signature) -> Result<(), PortalError> {
        let deadline = tokio::time::Instant::now() + self.confirm.timeout;
        loop {
            match self.rpc.get_signature_status(signature).await {
                Ok(Some(status)) => {
                    if let Some(err) = &status.err {
                        log::error!("❌ Transaction {} failed: {}", signature, err);
                        return Err(PortalError::submission_failed(format!(
                            "transaction {} failed: {}",
                            signature, err
                        )));
                    }
                    if status.satisfies(self.rpc.commitment()) {
                        return Ok(());
                    }
                }
                Ok(None) => {}
                // A status read failing does not mean the transaction failed
                Err(RpcError::Transport(e)) | Err(RpcError::Decode(e)) => {
                    log::warn!("⚠️  Status poll for {} failed: {}", signature, e);
                }
                Err(RpcError::Rpc { message, .. }) => {
                    log::warn!("⚠️  Status poll for {} failed: {}", signature, message);
                }
            }

            if tokio::time::Instant::now() + self.confirm.poll_interval > deadline {
                log::warn!("⏰ Timed out waiting for {}", signature);
                return Err(PortalError::ConfirmationTimeout {
                    signature: signature.to_string(),
                });
            }
            tokio::time::sleep(self.confirm.poll_interval).await;
        }
    }
}
