//! Fixed interface of the on-chain record list program
//!
//! The program is an Anchor program. Instructions are addressed by an 8-byte
//! discriminator `sha256("global:<name>")[..8]` followed by borsh arguments;
//! accounts carry `sha256("account:<Name>")[..8]` in front of their borsh body.
//!
//! - `start_stuff_off`: creates the record list account
//!   (record list: writable signer, user: writable signer, system program)
//! - `add_gif(gif_link: String)`: appends a record
//!   (record list: writable, user: writable signer)

use borsh::{BorshDeserialize, BorshSerialize};
use serde::Deserialize;
use solana_sdk::hash::hash;
use thiserror::Error;

use crate::ledger::{system_program, AccountMeta, Instruction, Pubkey};

pub const INITIALIZE_INSTRUCTION: &str = "start_stuff_off";
pub const APPEND_INSTRUCTION: &str = "add_gif";
pub const RECORD_LIST_ACCOUNT: &str = "BaseAccount";

/// Bytes the program allocates for the record list account
pub const RECORD_LIST_SPACE: usize = 9000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("account data too short: {0} bytes")]
    TooShort(usize),

    #[error("account discriminator mismatch: expected {expected}, found {found}")]
    WrongDiscriminator { expected: String, found: String },

    #[error("borsh decode failed: {0}")]
    Decode(String),

    #[error("unknown instruction")]
    UnknownInstruction,

    #[error("IDL error: {0}")]
    Idl(String),
}

pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    discriminator("global", name)
}

pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator("account", name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = hash(format!("{}:{}", namespace, name).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest.as_ref()[..8]);
    out
}

/// One entry of the on-chain list
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ItemStruct {
    pub gif_link: String,
    pub user_address: Pubkey,
}

/// On-chain body of the record list account
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BaseAccount {
    pub total_gifs: u64,
    pub gif_list: Vec<ItemStruct>,
}

impl BaseAccount {
    /// Decode account data; zero padding after the body is ignored
    pub fn decode(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() < 8 {
            return Err(ProgramError::TooShort(data.len()));
        }
        let expected = account_discriminator(RECORD_LIST_ACCOUNT);
        if data[..8] != expected {
            return Err(ProgramError::WrongDiscriminator {
                expected: hex::encode(expected),
                found: hex::encode(&data[..8]),
            });
        }
        let mut body = &data[8..];
        <Self as BorshDeserialize>::deserialize(&mut body).map_err(|e| ProgramError::Decode(e.to_string()))
    }

    /// Discriminator + borsh body, zero padded to `space` when it is larger
    pub fn encode(&self, space: usize) -> Result<Vec<u8>, ProgramError> {
        let mut out = account_discriminator(RECORD_LIST_ACCOUNT).to_vec();
        let body = borsh::to_vec(self).map_err(|e| ProgramError::Decode(e.to_string()))?;
        out.extend_from_slice(&body);
        if out.len() < space {
            out.resize(space, 0);
        }
        Ok(out)
    }
}

pub fn initialize_account(program_id: &Pubkey, record_list: &Pubkey, user: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*record_list, true),
            AccountMeta::new(*user, true),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: instruction_discriminator(INITIALIZE_INSTRUCTION).to_vec(),
    }
}

pub fn add_record(
    program_id: &Pubkey,
    record_list: &Pubkey,
    user: &Pubkey,
    content: &str,
) -> Result<Instruction, ProgramError> {
    let mut data = instruction_discriminator(APPEND_INSTRUCTION).to_vec();
    borsh::to_writer(&mut data, &content.to_string())
        .map_err(|e| ProgramError::Decode(e.to_string()))?;
    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*record_list, false),
            AccountMeta::new(*user, true),
        ],
        data,
    })
}

/// Instruction data as understood by the program
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgramInstruction {
    Initialize,
    AddRecord { content: String },
}

impl ProgramInstruction {
    pub fn decode(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() < 8 {
            return Err(ProgramError::UnknownInstruction);
        }
        let (tag, mut args) = data.split_at(8);
        if tag == instruction_discriminator(INITIALIZE_INSTRUCTION) {
            Ok(Self::Initialize)
        } else if tag == instruction_discriminator(APPEND_INSTRUCTION) {
            let content: String = BorshDeserialize::deserialize(&mut args)
                .map_err(|e| ProgramError::Decode(e.to_string()))?;
            Ok(Self::AddRecord { content })
        } else {
            Err(ProgramError::UnknownInstruction)
        }
    }
}

/// Interface description document for the program.
///
/// Older Anchor IDLs carry the program address in `metadata.address`, newer
/// ones at the top level.
#[derive(Debug, Clone, Deserialize)]
pub struct Idl {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub metadata: Option<IdlMetadata>,
    #[serde(default)]
    pub instructions: Vec<IdlInstruction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdlMetadata {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
}

impl Idl {
    pub fn from_json(text: &str) -> Result<Self, ProgramError> {
        serde_json::from_str(text).map_err(|e| ProgramError::Idl(e.to_string()))
    }

    pub fn program_id(&self) -> Result<Pubkey, ProgramError> {
        let address = self
            .metadata
            .as_ref()
            .and_then(|m| m.address.as_deref())
            .or(self.address.as_deref())
            .ok_or_else(|| ProgramError::Idl("IDL has no program address".to_string()))?;
        address
            .parse()
            .map_err(|e| ProgramError::Idl(format!("program address '{}': {}", address, e)))
    }

    /// Check that the program exposes the instructions this client sends
    pub fn check_interface(&self) -> Result<(), ProgramError> {
        for required in [INITIALIZE_INSTRUCTION, APPEND_INSTRUCTION] {
            if !self
                .instructions
                .iter()
                .any(|ix| to_snake_case(&ix.name) == required)
            {
                return Err(ProgramError::Idl(format!(
                    "IDL does not declare instruction '{}'",
                    required
                )));
            }
        }
        Ok(())
    }
}

/// `startStuffOff` -> `start_stuff_off`; snake case passes through
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminators_are_distinct() {
        let init = instruction_discriminator(INITIALIZE_INSTRUCTION);
        let append = instruction_discriminator(APPEND_INSTRUCTION);
        assert_ne!(init, append);
        assert_ne!(account_discriminator(RECORD_LIST_ACCOUNT), init);
        // sha256("global:start_stuff_off") and sha256("account:BaseAccount") prefixes
        assert_eq!(
            account_discriminator(RECORD_LIST_ACCOUNT),
            hash(b"account:BaseAccount").as_ref()[..8]
        );
    }

    #[test]
    fn test_account_decode_ignores_padding() {
        let author = Pubkey::new_unique();
        let account = BaseAccount {
            total_gifs: 2,
            gif_list: vec![
                ItemStruct {
                    gif_link: "https://media.giphy.com/media/zrvFl1IDvy0PC/giphy.gif".to_string(),
                    user_address: author,
                },
                ItemStruct {
                    gif_link: "https://x/y.gif".to_string(),
                    user_address: author,
                },
            ],
        };
        let data = account.encode(RECORD_LIST_SPACE).unwrap();
        assert_eq!(data.len(), RECORD_LIST_SPACE);
        assert_eq!(BaseAccount::decode(&data).unwrap(), account);
    }

    #[test]
    fn test_account_decode_rejects_foreign_data() {
        assert_eq!(BaseAccount::decode(&[1, 2, 3]), Err(ProgramError::TooShort(3)));
        let mut data = BaseAccount::default().encode(64).unwrap();
        data[0] ^= 1;
        assert!(matches!(
            BaseAccount::decode(&data),
            Err(ProgramError::WrongDiscriminator { .. })
        ));
    }

    #[test]
    fn test_add_record_data_layout() {
        let ix = add_record(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            "gm",
        )
        .unwrap();
        assert_eq!(ix.data[..8], instruction_discriminator(APPEND_INSTRUCTION));
        assert_eq!(ix.data[8..], [2, 0, 0, 0, b'g', b'm']);
        assert_eq!(
            ProgramInstruction::decode(&ix.data).unwrap(),
            ProgramInstruction::AddRecord {
                content: "gm".to_string()
            }
        );
    }

    #[test]
    fn test_idl_program_address_locations() {
        let program = Pubkey::new_unique();
        let legacy = format!(
            r#"{{"version":"0.0.0","name":"myepicproject",
                "instructions":[{{"name":"startStuffOff","accounts":[],"args":[]}},
                                {{"name":"addGif","accounts":[],"args":[]}}],
                "metadata":{{"address":"{}"}}}}"#,
            program
        );
        let idl = Idl::from_json(&legacy).unwrap();
        assert_eq!(idl.program_id().unwrap(), program);
        idl.check_interface().unwrap();

        let modern = format!(
            r#"{{"address":"{}","instructions":[{{"name":"start_stuff_off"}}]}}"#,
            program
        );
        let idl = Idl::from_json(&modern).unwrap();
        assert_eq!(idl.program_id().unwrap(), program);
        assert!(matches!(idl.check_interface(), Err(ProgramError::Idl(_))));
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(to_snake_case("startStuffOff"), "start_stuff_off");
        assert_eq!(to_snake_case("add_gif"), "add_gif");
    }
}
