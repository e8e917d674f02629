//! Key material for the shared record list
//!
//! The record list account is addressed by a long-lived keypair that is not
//! the user's identity. It co-signs account creation. Loaded once at process
//! start and passed explicitly to whoever needs it.

use std::path::Path;

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::ledger::{read_keypair_file, Keypair, Pubkey, Signer};
use crate::program::Idl;

#[derive(Debug)]
pub struct Identity {
    program_id: Pubkey,
    record_list: Keypair,
}

impl Identity {
    pub fn new(program_id: Pubkey, record_list: Keypair) -> Self {
        Self {
            program_id,
            record_list,
        }
    }

    /// Load the IDL and keypair files named by the configuration
    pub fn load(config: &PortalConfig) -> Result<Self, PortalError> {
        Self::from_files(&config.idl_path, &config.keypair_path)
    }

    pub fn from_files(
        idl_path: impl AsRef<Path>,
        keypair_path: impl AsRef<Path>,
    ) -> Result<Self, PortalError> {
        let idl_path = idl_path.as_ref();
        let text = std::fs::read_to_string(idl_path).map_err(|e| {
            PortalError::Config(format!("Failed to read IDL {:?}: {}", idl_path, e))
        })?;
        let idl = Idl::from_json(&text).map_err(|e| PortalError::Config(e.to_string()))?;
        idl.check_interface()
            .map_err(|e| PortalError::Config(e.to_string()))?;
        let program_id = idl
            .program_id()
            .map_err(|e| PortalError::Config(e.to_string()))?;

        let keypair_path = keypair_path.as_ref();
        let record_list = read_keypair_file(keypair_path).map_err(|e| {
            PortalError::Config(format!("Failed to load keypair {:?}: {}", keypair_path, e))
        })?;

        log::info!(
            "🔑 Loaded identity: program {} ({}), record list {}",
            program_id,
            idl.name.as_deref().unwrap_or("unnamed"),
            record_list.pubkey()
        );

        Ok(Self::new(program_id, record_list))
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn record_list_address(&self) -> Pubkey {
        self.record_list.pubkey()
    }

    pub fn record_list_keypair(&self) -> &Keypair {
        &self.record_list
    }
}
