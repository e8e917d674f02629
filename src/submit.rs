//! Mutation submitter
//!
//! Builds the three state-changing requests (create the record list, append a
//! record, tip an author) and tracks one state machine per kind:
//!
//! ```text
//! Idle -> Submitting -> Confirmed(signature)
//!                    -> Failed(error)
//! ```
//!
//! A kind that is `Submitting` rejects further requests of that kind. Local
//! preconditions are checked before anything is signed or sent.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::client::LedgerClient;
use crate::error::PortalError;
use crate::identity::Identity;
use crate::ledger::{system_instruction, Signature, LAMPORTS_PER_SOL};
use crate::program;
use crate::sync::{CacheStatus, LocalCache};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Initialize,
    Append,
    Tip,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Initialize => "initialize",
            MutationKind::Append => "append",
            MutationKind::Tip => "tip",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MutationState {
    #[default]
    Idle,
    Submitting,
    Confirmed(Signature),
    Failed(PortalError),
}

type States = Mutex<HashMap<MutationKind, MutationState>>;

/// Marks a kind as submitting until settled; reverts to idle if dropped early
struct InFlight<'a> {
    states: &'a States,
    kind: MutationKind,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn begin(states: &'a States, kind: MutationKind) -> Result<Self, PortalError> {
        let mut guard = states.lock();
        let state = guard.entry(kind).or_default();
        if *state == MutationState::Submitting {
            log::warn!("⏳ {} already in flight, ignoring the new request", kind);
            return Err(PortalError::MutationInFlight(kind));
        }
        *state = MutationState::Submitting;
        Ok(Self {
            states,
            kind,
            settled: false,
        })
    }

    fn settle(mut self, result: &Result<Signature, PortalError>) {
        let next = match result {
            Ok(signature) => MutationState::Confirmed(*signature),
            Err(e) => MutationState::Failed(e.clone()),
        };
        self.states.lock().insert(self.kind, next);
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.states.lock().insert(self.kind, MutationState::Idle);
        }
    }
}

pub struct MutationSubmitter {
    identity: Arc<Identity>,
    states: States,
}

impl MutationSubmitter {
    pub fn new(identity: Arc<Identity>) -> Self {
        Self {
            identity,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self, kind: MutationKind) -> MutationState {
        self.states.lock().get(&kind).cloned().unwrap_or_default()
    }

    pub fn is_submitting(&self, kind: MutationKind) -> bool {
        self.state(kind) == MutationState::Submitting
    }

    /// Create the record list account, co-signed by its keypair
    pub async fn initialize_account(
        &self,
        client: &LedgerClient,
        cache: &LocalCache,
    ) -> Result<Signature, PortalError> {
        match cache.status {
            CacheStatus::Uninitialized => {}
            CacheStatus::Loaded => {
                return Err(PortalError::invalid_input("record list is already initialized"))
            }
            CacheStatus::Unknown => {
                return Err(PortalError::invalid_input(
                    "record list state is not known yet, refresh first",
                ))
            }
        }

        let flight = InFlight::begin(&self.states, MutationKind::Initialize)?;
        log::info!(
            "🚀 Initializing record list {}",
            self.identity.record_list_address()
        );
        let instruction = program::initialize_account(
            &self.identity.program_id(),
            &self.identity.record_list_address(),
            &client.payer(),
        );
        let result = client
            .send_and_confirm(&[instruction], &[self.identity.record_list_keypair()])
            .await;
        flight.settle(&result);
        result
    }

    pub async fn append_record(
        &self,
        client: &LedgerClient,
        cache: &LocalCache,
        content: &str,
    ) -> Result<Signature, PortalError> {
        // Whitespace-only content is empty; anything else is sent verbatim
        if content.trim().is_empty() {
            log::warn!("⚠️  Empty record content, nothing sent");
            return Err(PortalError::invalid_input("record content is empty"));
        }
        if cache.status != CacheStatus::Loaded {
            return Err(PortalError::invalid_input(
                "record list is not initialized",
            ));
        }

        let flight = InFlight::begin(&self.states, MutationKind::Append)?;
        log::info!("➕ Appending record: {}", content);
        let result = match program::add_record(
            &self.identity.program_id(),
            &self.identity.record_list_address(),
            &client.payer(),
            content,
        ) {
            Ok(instruction) => client.send_and_confirm(&[instruction], &[]).await,
            Err(e) => Err(PortalError::invalid_input(e.to_string())),
        };
        flight.settle(&result);
        result
    }

    /// Transfer `lamports` from the wallet to the author of a cached record
    pub async fn send_tip(
        &self,
        client: &LedgerClient,
        cache: &LocalCache,
        record_index: usize,
        lamports: u64,
    ) -> Result<Signature, PortalError> {
        if lamports == 0 {
            return Err(PortalError::invalid_input("tip amount must be positive"));
        }
        let records = cache.records();
        if records.is_empty() {
            return Err(PortalError::invalid_input("there are no records to tip"));
        }
        let recipient = records
            .get(record_index)
            .ok_or_else(|| {
                PortalError::invalid_input(format!(
                    "record {} does not exist ({} records)",
                    record_index,
                    records.len()
                ))
            })?
            .author;

        let flight = InFlight::begin(&self.states, MutationKind::Tip)?;
        log::info!(
            "💸 Tipping {} lamports from {} to {}",
            lamports,
            client.payer(),
            recipient
        );
        let instruction = system_instruction::transfer(&client.payer(), &recipient, lamports);
        let result = client.send_and_confirm(&[instruction], &[]).await;
        flight.settle(&result);
        result
    }
}

/// Parse a decimal SOL amount into lamports
pub fn parse_sol_amount(text: &str) -> Result<u64, PortalError> {
    let text = text.trim();
    let invalid = |why: &str| PortalError::invalid_input(format!("tip amount '{}' {}", text, why));

    if text.is_empty() {
        return Err(invalid("is empty"));
    }
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("is not a number"));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("is not a positive decimal number"));
    }
    if fraction.len() > 9 {
        return Err(invalid("has more than 9 decimal places"));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("is too large"))?
    };
    let fraction: u64 = if fraction.is_empty() {
        0
    } else {
        format!("{:0<9}", fraction)
            .parse()
            .map_err(|_| invalid("is not a number"))?
    };
    let lamports = whole
        .checked_mul(LAMPORTS_PER_SOL)
        .and_then(|l| l.checked_add(fraction))
        .ok_or_else(|| invalid("is too large"))?;
    if lamports == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(lamports)
}
