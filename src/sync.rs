//! Record list synchronizer
//!
//! Reads the record list account and keeps the last successfully decoded
//! state in a local cache. A missing account is a normal state
//! ([`CacheStatus::Uninitialized`]); every other failure leaves the cache
//! exactly as it was.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::client::LedgerClient;
use crate::error::PortalError;
use crate::ledger::Pubkey;
use crate::program::{BaseAccount, ItemStruct};

/// One entry of the shared list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub content: String,
    pub author: Pubkey,
}

impl From<ItemStruct> for Record {
    fn from(item: ItemStruct) -> Self {
        Self {
            content: item.gif_link,
            author: item.user_address,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheStatus {
    /// No fetch has completed yet
    #[default]
    Unknown,
    /// The account does not exist on the ledger
    Uninitialized,
    Loaded,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalCache {
    pub status: CacheStatus,
    /// On-chain order; `Some` only when `Loaded`
    pub records: Option<Vec<Record>>,
    /// Counter advertised by the account
    pub total: u64,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl LocalCache {
    pub fn uninitialized() -> Self {
        Self {
            status: CacheStatus::Uninitialized,
            records: None,
            total: 0,
            fetched_at: Some(Utc::now()),
        }
    }

    pub fn loaded(account: BaseAccount) -> Self {
        Self {
            status: CacheStatus::Loaded,
            total: account.total_gifs,
            records: Some(account.gif_list.into_iter().map(Record::from).collect()),
            fetched_at: Some(Utc::now()),
        }
    }

    pub fn records(&self) -> &[Record] {
        self.records.as_deref().unwrap_or(&[])
    }
}

/// Fetch and classify the record list account
pub async fn refresh(client: &LedgerClient, account: &Pubkey) -> Result<LocalCache, PortalError> {
    log::debug!("   Fetching record list {}", account);
    match client.get_account(account).await {
        Ok(raw) => {
            let decoded = BaseAccount::decode(&raw.data).map_err(|e| {
                log::error!("❌ Failed to decode record list {}: {}", account, e);
                PortalError::fetch_failed(format!("decode record list: {}", e))
            })?;
            log::info!(
                "📋 Record list loaded: {} record(s)",
                decoded.gif_list.len()
            );
            Ok(LocalCache::loaded(decoded))
        }
        Err(PortalError::AccountNotFound(_)) => {
            log::info!("📭 Record list {} is not initialized", account);
            Ok(LocalCache::uninitialized())
        }
        Err(e) => Err(e),
    }
}

struct Slot {
    cache: LocalCache,
    /// Generation of the refresh that produced `cache`
    applied: u64,
    /// Last generation handed out
    issued: u64,
    /// Bumped by every reset
    epoch: u64,
}

/// Counts a fetch in progress for as long as it lives
struct Fetching<'a>(&'a AtomicUsize);

impl<'a> Fetching<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for Fetching<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owner of the local cache
pub struct Synchronizer {
    slot: RwLock<Slot>,
    fetching: AtomicUsize,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synchronizer {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Slot {
                cache: LocalCache::default(),
                applied: 0,
                issued: 0,
                epoch: 0,
            }),
            fetching: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> LocalCache {
        self.slot.read().cache.clone()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching.load(Ordering::SeqCst) > 0
    }

    /// Current reset epoch; pass it to [`Synchronizer::refresh_in`] from work
    /// that outlives a session
    pub fn epoch(&self) -> u64 {
        self.slot.read().epoch
    }

    /// Refresh the cache from the ledger.
    ///
    /// On failure the previous cache is kept. A refresh that completes after
    /// a newer one (or after [`Synchronizer::reset`]) is discarded.
    pub async fn refresh(
        &self,
        client: &LedgerClient,
        account: &Pubkey,
    ) -> Result<LocalCache, PortalError> {
        let epoch = self.epoch();
        self.refresh_in(epoch, client, account).await
    }

    /// Refresh on behalf of work that started in `epoch`.
    ///
    /// If the cache has been reset since, nothing is fetched and the current
    /// cache is returned unchanged.
    pub async fn refresh_in(
        &self,
        epoch: u64,
        client: &LedgerClient,
        account: &Pubkey,
    ) -> Result<LocalCache, PortalError> {
        let generation = {
            let mut slot = self.slot.write();
            if slot.epoch != epoch {
                log::debug!("   Cache was reset since epoch {}, skipping refresh", epoch);
                return Ok(slot.cache.clone());
            }
            slot.issued += 1;
            slot.issued
        };
        let result = {
            let _fetching = Fetching::start(&self.fetching);
            refresh(client, account).await
        };

        let fresh = result.map_err(|e| {
            log::warn!("⚠️  Refresh failed, keeping the cached state: {}", e);
            e
        })?;

        let mut slot = self.slot.write();
        if slot.epoch == epoch && generation > slot.applied {
            slot.cache = fresh;
            slot.applied = generation;
        } else {
            log::debug!("   Discarding stale refresh #{}", generation);
        }
        Ok(slot.cache.clone())
    }

    /// Forget everything, including refreshes still in flight
    pub fn reset(&self) {
        let mut slot = self.slot.write();
        slot.cache = LocalCache::default();
        slot.issued += 1;
        slot.applied = slot.issued;
        slot.epoch += 1;
    }
}
