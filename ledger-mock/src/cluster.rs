/// In-memory cluster state
///
/// Holds accounts, recent blockhashes and signature statuses, executes the
/// system transfer and the record list program, and carries the fault
/// injection knobs tests use to exercise failure paths. There are no fees
/// and no rent.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use gif_portal::ledger::types::TransactionStatus;
use gif_portal::ledger::{
    system_program, Account, AccountMeta, Commitment, Hash, Instruction, Message, Pubkey,
    Signature, Transaction,
};
use solana_sdk::sanitize::Sanitize;
use solana_sdk::system_instruction::SystemInstruction;
use gif_portal::program::{BaseAccount, ItemStruct, ProgramInstruction, RECORD_LIST_SPACE};

/// Blockhashes older than this many slots are rejected
const MAX_RECENT_BLOCKHASHES: usize = 150;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("Transaction signature verification failure")]
    SignatureFailure,

    #[error("Transaction simulation failed: Blockhash not found")]
    BlockhashNotFound,

    #[error("Transaction simulation failed: This transaction has already been processed")]
    AlreadyProcessed,

    #[error("Transaction simulation failed: Error processing Instruction {index}: {reason}")]
    InstructionFailed { index: usize, reason: String },

    #[error("Transaction simulation failed: {0}")]
    Injected(String),

    #[error("Node is unhealthy: {0}")]
    Unavailable(String),

    #[error("failed to deserialize transaction: {0}")]
    InvalidTransaction(String),
}

impl ClusterError {
    /// JSON-RPC error code the real cluster uses for this failure
    pub fn code(&self) -> i64 {
        match self {
            ClusterError::SignatureFailure => -32003,
            ClusterError::Unavailable(_) => -32005,
            ClusterError::InvalidTransaction(_) => -32602,
            _ => -32002,
        }
    }
}

struct Landed {
    slot: u64,
    /// `None` while confirmations are held
    visible_at: Option<Instant>,
}

struct Ledger {
    slot: u64,
    blockhashes: VecDeque<Hash>,
    accounts: HashMap<Pubkey, Account>,
    statuses: HashMap<Signature, Landed>,
    transactions: usize,
}

impl Ledger {
    fn latest_blockhash(&self) -> Hash {
        self.blockhashes.back().copied().unwrap_or_default()
    }

    fn advance(&mut self) -> u64 {
        self.slot += 1;
        self.blockhashes.push_back(Hash::new_unique());
        while self.blockhashes.len() > MAX_RECENT_BLOCKHASHES {
            self.blockhashes.pop_front();
        }
        self.slot
    }
}

#[derive(Default)]
struct Faults {
    failing_reads: usize,
    rejected_sends: usize,
    confirmation_delay: Duration,
    hold_confirmations: bool,
}

pub struct MockCluster {
    program_id: Pubkey,
    ledger: Mutex<Ledger>,
    faults: Mutex<Faults>,
    requests: AtomicUsize,
    methods: Mutex<HashMap<String, usize>>,
}

impl MockCluster {
    /// Empty cluster hosting the record list program at `program_id`
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            ledger: Mutex::new(Ledger {
                slot: 1,
                blockhashes: VecDeque::from([Hash::new_unique()]),
                accounts: HashMap::new(),
                statuses: HashMap::new(),
                transactions: 0,
            }),
            faults: Mutex::new(Faults::default()),
            requests: AtomicUsize::new(0),
            methods: Mutex::new(HashMap::new()),
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    // ========================================================================
    // Request accounting
    // ========================================================================

    pub fn record_request(&self, method: &str) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.methods.lock().entry(method.to_string()).or_insert(0) += 1;
    }

    /// Total JSON-RPC requests served
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn method_count(&self, method: &str) -> usize {
        self.methods.lock().get(method).copied().unwrap_or(0)
    }

    /// Transactions that landed
    pub fn transaction_count(&self) -> usize {
        self.ledger.lock().transactions
    }

    // ========================================================================
    // Fault injection
    // ========================================================================

    /// Fail the next `count` account reads
    pub fn fail_next_account_reads(&self, count: usize) {
        self.faults.lock().failing_reads = count;
    }

    /// Reject the next `count` transactions at preflight
    pub fn reject_next_sends(&self, count: usize) {
        self.faults.lock().rejected_sends = count;
    }

    /// Delay before a landed transaction reports a status
    pub fn set_confirmation_delay(&self, delay: Duration) {
        self.faults.lock().confirmation_delay = delay;
    }

    /// While held, landed transactions report no status at all.
    /// Releasing makes every held status visible at once.
    pub fn hold_confirmations(&self, hold: bool) {
        self.faults.lock().hold_confirmations = hold;
        if !hold {
            let now = Instant::now();
            for landed in self.ledger.lock().statuses.values_mut() {
                if landed.visible_at.is_none() {
                    landed.visible_at = Some(now);
                }
            }
        }
    }

    // ========================================================================
    // Balances
    // ========================================================================

    pub fn fund(&self, address: &Pubkey, lamports: u64) {
        let mut ledger = self.ledger.lock();
        let account = ledger
            .accounts
            .entry(*address)
            .or_insert_with(system_account);
        account.lamports = account.lamports.saturating_add(lamports);
    }

    pub fn balance(&self, address: &Pubkey) -> u64 {
        self.ledger
            .lock()
            .accounts
            .get(address)
            .map(|a| a.lamports)
            .unwrap_or(0)
    }

    /// Credit `lamports` to `address` as a landed, immediately visible transaction
    pub fn airdrop(&self, address: &Pubkey, lamports: u64) -> Signature {
        self.fund(address, lamports);
        let signature = Signature::new_unique();

        let mut ledger = self.ledger.lock();
        let slot = ledger.advance();
        ledger.statuses.insert(
            signature,
            Landed {
                slot,
                visible_at: Some(Instant::now()),
            },
        );
        log::info!("💧 Airdropped {} lamports to {}", lamports, address);
        signature
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn slot(&self) -> u64 {
        self.ledger.lock().slot
    }

    pub fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, ClusterError> {
        {
            let mut faults = self.faults.lock();
            if faults.failing_reads > 0 {
                faults.failing_reads -= 1;
                log::warn!("💥 Injected account read failure for {}", address);
                return Err(ClusterError::Unavailable(
                    "injected account read failure".to_string(),
                ));
            }
        }
        Ok(self.ledger.lock().accounts.get(address).cloned())
    }

    /// Decoded record list stored at `address`
    pub fn record_list(&self, address: &Pubkey) -> Option<BaseAccount> {
        let ledger = self.ledger.lock();
        let account = ledger.accounts.get(address)?;
        BaseAccount::decode(&account.data).ok()
    }

    pub fn latest_blockhash(&self) -> Hash {
        self.ledger.lock().latest_blockhash()
    }

    pub fn signature_statuses(&self, signatures: &[Signature]) -> Vec<Option<TransactionStatus>> {
        let now = Instant::now();
        let ledger = self.ledger.lock();
        signatures
            .iter()
            .map(|signature| {
                let landed = ledger.statuses.get(signature)?;
                match landed.visible_at {
                    Some(at) if at <= now => Some(TransactionStatus {
                        slot: landed.slot,
                        confirmations: None,
                        err: None,
                        confirmation_status: Some(Commitment::Finalized),
                    }),
                    _ => None,
                }
            })
            .collect()
    }

    // ========================================================================
    // Transaction processing
    // ========================================================================

    /// Verify and execute `tx` atomically
    pub fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ClusterError> {
        let (delay, hold) = {
            let mut faults = self.faults.lock();
            if faults.rejected_sends > 0 {
                faults.rejected_sends -= 1;
                log::warn!("💥 Injected send rejection");
                return Err(ClusterError::Injected("injected send rejection".to_string()));
            }
            (faults.confirmation_delay, faults.hold_confirmations)
        };

        tx.sanitize()
            .map_err(|e| ClusterError::InvalidTransaction(e.to_string()))?;
        if tx.verify().is_err() {
            return Err(ClusterError::SignatureFailure);
        }
        let signature = *tx.signatures.first().ok_or(ClusterError::SignatureFailure)?;
        let instructions = decompile(&tx.message);

        let mut ledger = self.ledger.lock();
        if ledger.statuses.contains_key(&signature) {
            return Err(ClusterError::AlreadyProcessed);
        }
        if !ledger.blockhashes.contains(&tx.message.recent_blockhash) {
            return Err(ClusterError::BlockhashNotFound);
        }

        let mut accounts = ledger.accounts.clone();
        for (index, ix) in instructions.iter().enumerate() {
            log::debug!(
                "   Executing instruction {} for {}: {}",
                index,
                ix.program_id,
                hex::encode(&ix.data)
            );
            self.execute(&mut accounts, ix)
                .map_err(|reason| ClusterError::InstructionFailed { index, reason })?;
        }

        ledger.accounts = accounts;
        ledger.transactions += 1;
        let slot = ledger.advance();
        ledger.statuses.insert(
            signature,
            Landed {
                slot,
                visible_at: if hold { None } else { Some(Instant::now() + delay) },
            },
        );
        log::info!("✅ Transaction {} landed in slot {}", signature, slot);
        Ok(signature)
    }

    fn execute(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        ix: &Instruction,
    ) -> Result<(), String> {
        if system_program::check_id(&ix.program_id) {
            self.execute_system(accounts, ix)
        } else if ix.program_id == self.program_id {
            self.execute_program(accounts, ix)
        } else {
            Err(format!("program {} not found", ix.program_id))
        }
    }

    fn execute_system(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        ix: &Instruction,
    ) -> Result<(), String> {
        let Ok(SystemInstruction::Transfer { lamports }) =
            bincode::deserialize::<SystemInstruction>(&ix.data)
        else {
            return Err("invalid instruction data".to_string());
        };
        let [from, to] = ix.accounts.as_slice() else {
            return Err("not enough account keys".to_string());
        };
        if !from.is_signer {
            return Err("missing required signature for instruction".to_string());
        }
        if !from.is_writable || !to.is_writable {
            return Err("instruction requires a writable account".to_string());
        }

        let source = accounts
            .get_mut(&from.pubkey)
            .filter(|a| a.lamports >= lamports)
            .ok_or_else(|| "custom program error: 0x1 (insufficient lamports)".to_string())?;
        source.lamports -= lamports;
        let destination = accounts.entry(to.pubkey).or_insert_with(system_account);
        destination.lamports = destination
            .lamports
            .checked_add(lamports)
            .ok_or_else(|| "arithmetic overflow".to_string())?;
        log::info!("💸 Transfer {} lamports {} -> {}", lamports, from.pubkey, to.pubkey);
        Ok(())
    }

    fn execute_program(
        &self,
        accounts: &mut HashMap<Pubkey, Account>,
        ix: &Instruction,
    ) -> Result<(), String> {
        match ProgramInstruction::decode(&ix.data).map_err(|e| e.to_string())? {
            ProgramInstruction::Initialize => {
                let [list, user, system] = ix.accounts.as_slice() else {
                    return Err("not enough account keys".to_string());
                };
                if !list.is_signer || !user.is_signer {
                    return Err("missing required signature for instruction".to_string());
                }
                if !system_program::check_id(&system.pubkey) {
                    return Err("expected the system program".to_string());
                }
                if accounts
                    .get(&list.pubkey)
                    .is_some_and(|a| !system_program::check_id(&a.owner) || !a.data.is_empty())
                {
                    return Err(format!("account {} already in use", list.pubkey));
                }
                let data = BaseAccount::default()
                    .encode(RECORD_LIST_SPACE)
                    .map_err(|e| e.to_string())?;
                accounts.insert(
                    list.pubkey,
                    Account {
                        lamports: 0,
                        data,
                        owner: self.program_id,
                        executable: false,
                    },
                );
                log::info!("📋 Record list {} created", list.pubkey);
                Ok(())
            }
            ProgramInstruction::AddRecord { content } => {
                let [list, user] = ix.accounts.as_slice() else {
                    return Err("not enough account keys".to_string());
                };
                if !user.is_signer {
                    return Err("missing required signature for instruction".to_string());
                }
                if !list.is_writable {
                    return Err("record list must be writable".to_string());
                }
                let account = accounts
                    .get_mut(&list.pubkey)
                    .ok_or_else(|| "AccountNotInitialized".to_string())?;
                if account.owner != self.program_id {
                    return Err("AccountOwnedByWrongProgram".to_string());
                }
                let mut state = BaseAccount::decode(&account.data).map_err(|e| e.to_string())?;
                state.gif_list.push(ItemStruct {
                    gif_link: content,
                    user_address: user.pubkey,
                });
                state.total_gifs += 1;
                let data = state.encode(RECORD_LIST_SPACE).map_err(|e| e.to_string())?;
                if data.len() > RECORD_LIST_SPACE {
                    return Err("AccountDidNotSerialize".to_string());
                }
                account.data = data;
                log::info!("➕ Record #{} added by {}", state.total_gifs, user.pubkey);
                Ok(())
            }
        }
    }
}

fn system_account() -> Account {
    Account {
        lamports: 0,
        data: Vec::new(),
        owner: system_program::id(),
        executable: false,
    }
}

/// Expand compiled instructions back into full instructions.
/// Indices are in range once the message has been sanitized.
#[allow(deprecated)]
fn decompile(message: &Message) -> Vec<Instruction> {
    message
        .instructions
        .iter()
        .map(|ix| Instruction {
            program_id: message.account_keys[usize::from(ix.program_id_index)],
            accounts: ix
                .accounts
                .iter()
                .map(|&i| {
                    let i = usize::from(i);
                    AccountMeta {
                        pubkey: message.account_keys[i],
                        is_signer: message.is_signer(i),
                        is_writable: message.is_writable(i),
                    }
                })
                .collect(),
            data: ix.data.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gif_portal::ledger::{system_instruction, Keypair, Signer};
    use gif_portal::program;

    fn signed(cluster: &MockCluster, ixs: &[Instruction], signers: &[&Keypair]) -> Transaction {
        Transaction::new_signed_with_payer(
            ixs,
            Some(&signers[0].pubkey()),
            signers,
            cluster.latest_blockhash(),
        )
    }

    #[test]
    fn test_initialize_then_append() {
        let cluster = MockCluster::new(Pubkey::new_unique());
        let user = Keypair::new();
        let list = Keypair::new();

        let init = program::initialize_account(&cluster.program_id(), &list.pubkey(), &user.pubkey());
        cluster
            .send_transaction(&signed(&cluster, &[init], &[&user, &list]))
            .unwrap();

        let add = program::add_record(
            &cluster.program_id(),
            &list.pubkey(),
            &user.pubkey(),
            "https://x/y.gif",
        )
        .unwrap();
        cluster
            .send_transaction(&signed(&cluster, &[add], &[&user]))
            .unwrap();

        let state = cluster.record_list(&list.pubkey()).unwrap();
        assert_eq!(state.total_gifs, 1);
        assert_eq!(state.gif_list[0].gif_link, "https://x/y.gif");
        assert_eq!(state.gif_list[0].user_address, user.pubkey());
        assert_eq!(cluster.transaction_count(), 2);
    }

    #[test]
    fn test_rejects_unsigned_and_stale() {
        let cluster = MockCluster::new(Pubkey::new_unique());
        let user = Keypair::new();
        let list = Keypair::new();
        let init = program::initialize_account(&cluster.program_id(), &list.pubkey(), &user.pubkey());

        // Record list keypair did not sign
        let mut tx = Transaction::new_unsigned(Message::new(&[init.clone()], Some(&user.pubkey())));
        tx.partial_sign(&[&user], cluster.latest_blockhash());
        assert_eq!(cluster.send_transaction(&tx), Err(ClusterError::SignatureFailure));

        let tx = Transaction::new_signed_with_payer(
            &[init],
            Some(&user.pubkey()),
            &[&user, &list],
            Hash::new_unique(),
        );
        assert_eq!(cluster.send_transaction(&tx), Err(ClusterError::BlockhashNotFound));
    }

    #[test]
    fn test_transfer_needs_funds() {
        let cluster = MockCluster::new(Pubkey::new_unique());
        let payer = Keypair::new();
        let to = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer.pubkey(), &to, 10);

        let err = cluster
            .send_transaction(&signed(&cluster, &[ix.clone()], &[&payer]))
            .unwrap_err();
        assert!(matches!(err, ClusterError::InstructionFailed { index: 0, .. }));

        cluster.fund(&payer.pubkey(), 25);
        cluster
            .send_transaction(&signed(&cluster, &[ix], &[&payer]))
            .unwrap();
        assert_eq!(cluster.balance(&payer.pubkey()), 15);
        assert_eq!(cluster.balance(&to), 10);
    }

    #[tokio::test]
    async fn test_held_confirmations() {
        let cluster = MockCluster::new(Pubkey::new_unique());
        let payer = Keypair::new();
        cluster.fund(&payer.pubkey(), 100);
        cluster.hold_confirmations(true);

        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        let signature = cluster
            .send_transaction(&signed(&cluster, &[ix], &[&payer]))
            .unwrap();
        assert!(cluster.signature_statuses(&[signature])[0].is_none());

        cluster.hold_confirmations(false);
        let status = cluster.signature_statuses(&[signature]).remove(0).unwrap();
        assert!(status.satisfies(Commitment::Finalized));
    }

    #[test]
    fn test_injected_read_failure() {
        let cluster = MockCluster::new(Pubkey::new_unique());
        cluster.fail_next_account_reads(1);
        let address = Pubkey::new_unique();
        assert!(cluster.get_account(&address).is_err());
        assert_eq!(cluster.get_account(&address), Ok(None));
    }
}
