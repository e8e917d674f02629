//! Projection of portal state onto what the user should see

use crate::sync::{CacheStatus, LocalCache, Record};

/// Everything the projection depends on
#[derive(Clone, Debug, Default)]
pub struct ViewInput {
    pub wallet_detected: bool,
    pub connected: bool,
    pub cache: LocalCache,
    pub initializing: bool,
    pub appending: bool,
    pub tipping: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewState {
    /// No wallet extension; prompt the user to install one
    WalletMissing,
    /// Wallet present, not connected; offer the connect action
    Disconnected,
    /// Connected, first fetch not completed
    Loading,
    /// Connected, the record list does not exist yet
    NeedsInitialization { initializing: bool },
    Ready {
        records: Vec<Record>,
        appending: bool,
        tipping: bool,
    },
}

pub fn project(input: &ViewInput) -> ViewState {
    if !input.connected {
        return if input.wallet_detected {
            ViewState::Disconnected
        } else {
            ViewState::WalletMissing
        };
    }

    match input.cache.status {
        CacheStatus::Unknown => ViewState::Loading,
        CacheStatus::Uninitialized => ViewState::NeedsInitialization {
            initializing: input.initializing,
        },
        CacheStatus::Loaded => ViewState::Ready {
            records: input.cache.records().to_vec(),
            appending: input.appending,
            tipping: input.tipping,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Pubkey;
    use crate::program::{BaseAccount, ItemStruct};

    #[test]
    fn test_disconnected_states() {
        let mut input = ViewInput::default();
        assert_eq!(project(&input), ViewState::WalletMissing);
        input.wallet_detected = true;
        assert_eq!(project(&input), ViewState::Disconnected);
        // A cached list is not shown without a session
        input.cache = LocalCache::uninitialized();
        assert_eq!(project(&input), ViewState::Disconnected);
    }

    #[test]
    fn test_connected_states() {
        let mut input = ViewInput {
            wallet_detected: true,
            connected: true,
            ..Default::default()
        };
        assert_eq!(project(&input), ViewState::Loading);

        input.cache = LocalCache::uninitialized();
        input.initializing = true;
        assert_eq!(
            project(&input),
            ViewState::NeedsInitialization { initializing: true }
        );

        let author = Pubkey::new_unique();
        input.cache = LocalCache::loaded(BaseAccount {
            total_gifs: 1,
            gif_list: vec![ItemStruct {
                gif_link: "https://x/y.gif".to_string(),
                user_address: author,
            }],
        });
        input.tipping = true;
        match project(&input) {
            ViewState::Ready {
                records,
                appending,
                tipping,
            } => {
                assert_eq!(records.len(), 1);
                assert_eq!(records[0].author, author);
                assert!(!appending);
                assert!(tipping);
            }
            other => panic!("unexpected view {:?}", other),
        }
    }
}
