//! Wallet session and startup tests against the ledger mock
//!
//! Tests cover:
//! - Silent reconnect at startup never prompts
//! - Interactive connect outcomes (approved, rejected, no wallet)
//! - Startup runs once
//! - Disconnect drops the session and the cache, even with a mutation in flight

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fast_confirm, Harness};
use gif_portal::{CacheStatus, Keypair, KeypairWallet, PortalError, Trust, ViewState};

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn test_start_with_untrusted_wallet_stays_disconnected() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
    let portal = harness.portal(wallet.clone())?;

    assert!(portal.start().await.is_none());
    assert_eq!(wallet.connect_prompts(), 0);
    assert_eq!(portal.view(), ViewState::Disconnected);
    // Nothing to read without a session
    assert_eq!(harness.cluster.request_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_start_with_trusted_wallet_reconnects_and_refreshes() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let wallet = Arc::new(KeypairWallet::new(Keypair::new()).trusted());
    let portal = harness.portal(wallet.clone())?;

    let session = portal.start().await.expect("silent reconnect");
    assert_eq!(session.trust(), Trust::Implicit);
    assert_eq!(session.address(), wallet.pubkey());
    assert_eq!(wallet.connect_prompts(), 0);

    assert_eq!(portal.cache().status, CacheStatus::Uninitialized);
    assert_eq!(
        portal.view(),
        ViewState::NeedsInitialization {
            initializing: false
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_start_runs_once() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let wallet = Arc::new(KeypairWallet::new(Keypair::new()).trusted());
    let portal = harness.portal(wallet)?;

    portal.start().await.expect("silent reconnect");
    let reads = harness.cluster.method_count("getAccountInfo");
    assert_eq!(reads, 1);

    assert!(portal.start().await.is_some());
    assert_eq!(harness.cluster.method_count("getAccountInfo"), reads);
    Ok(())
}

#[tokio::test]
async fn test_start_without_wallet() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let portal = harness.portal_without_wallet()?;

    assert!(portal.start().await.is_none());
    assert_eq!(portal.view(), ViewState::WalletMissing);
    Ok(())
}

// ============================================================================
// Interactive connect
// ============================================================================

#[tokio::test]
async fn test_connect_prompts_once_and_loads() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
    let portal = harness.portal(wallet.clone())?;

    portal.start().await;
    let session = portal.connect().await?;
    assert_eq!(session.trust(), Trust::Explicit);
    assert_eq!(wallet.connect_prompts(), 1);
    assert_eq!(portal.cache().status, CacheStatus::Uninitialized);

    // Already connected: no new prompt, same address
    let again = portal.connect().await?;
    assert_eq!(again.address(), session.address());
    assert_eq!(wallet.connect_prompts(), 1);
    Ok(())
}

#[tokio::test]
async fn test_connect_rejected() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let wallet = Arc::new(KeypairWallet::new(Keypair::new()));
    wallet.set_connect_approval(false);
    let portal = harness.portal(wallet)?;

    let err = portal.connect().await.unwrap_err();
    assert!(matches!(err, PortalError::UserRejected(_)));
    assert!(portal.session().is_none());
    assert_eq!(portal.view(), ViewState::Disconnected);
    Ok(())
}

#[tokio::test]
async fn test_connect_without_wallet() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let portal = harness.portal_without_wallet()?;

    assert_eq!(portal.connect().await.unwrap_err(), PortalError::WalletUnavailable);
    assert_eq!(portal.refresh().await.unwrap_err(), PortalError::NotConnected);
    Ok(())
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn test_disconnect_clears_cache() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let (portal, _wallet) = harness.ready_portal().await?;
    assert_eq!(portal.cache().status, CacheStatus::Loaded);

    portal.disconnect().await;
    assert!(portal.session().is_none());
    assert_eq!(portal.cache().status, CacheStatus::Unknown);
    assert_eq!(portal.view(), ViewState::Disconnected);

    // The cache is rebuilt for the new session
    let session = portal.connect().await?;
    assert_eq!(session.trust(), Trust::Explicit);
    assert_eq!(portal.cache().status, CacheStatus::Loaded);
    Ok(())
}

#[tokio::test]
async fn test_disconnect_during_append_keeps_cache_clear() -> anyhow::Result<()> {
    let harness = Harness::new(fast_confirm()).await?;
    let (portal, _wallet) = harness.ready_portal().await?;
    harness.cluster.hold_confirmations(true);

    let leave = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        portal.disconnect().await;
        harness.cluster.hold_confirmations(false);
    };
    let (result, ()) = tokio::join!(portal.append_record(common::GIF), leave);

    // The append landed, but its follow-up read belongs to the ended session
    result?;
    assert_eq!(
        harness
            .cluster
            .record_list(&harness.record_list)
            .expect("record list")
            .gif_list
            .len(),
        1
    );
    assert!(portal.session().is_none());
    assert_eq!(portal.cache().status, CacheStatus::Unknown);
    assert_eq!(portal.view(), ViewState::Disconnected);
    Ok(())
}
