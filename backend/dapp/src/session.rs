//! The connected wallet account, and the board refresh it drives.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::chain::{AccountAddress, ChainClient};
use crate::errors::{DappError, Result};
use crate::rows::RowBoard;

#[derive(Clone)]
pub struct Session {
    account: Arc<watch::Sender<Option<AccountAddress>>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (account, _) = watch::channel(None);
        Self {
            account: Arc::new(account),
        }
    }

    pub fn account(&self) -> Option<AccountAddress> {
        *self.account.borrow()
    }

    /// The acting account, or [`DappError::NotConnected`].
    pub fn require(&self) -> Result<AccountAddress> {
        self.account().ok_or(DappError::NotConnected)
    }

    /// Connect or switch accounts. Returns `false` when `raw` is already connected.
    pub fn connect(&self, raw: &str) -> Result<bool> {
        let address = AccountAddress::parse(raw)?;
        let changed = self.account.send_if_modified(|current| {
            if *current == Some(address) {
                false
            } else {
                *current = Some(address);
                true
            }
        });
        if changed {
            info!(%address, "Account connected");
        }
        Ok(changed)
    }

    pub fn disconnect(&self) {
        let changed = self.account.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("Account disconnected");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AccountAddress>> {
        self.account.subscribe()
    }
}

/// Refresh `board` every time the session moves to a new account.
///
/// Runs until the session is dropped.
pub async fn watch_account<C: ChainClient>(
    board: Arc<RowBoard<C>>,
    mut account: watch::Receiver<Option<AccountAddress>>,
) {
    loop {
        let current = *account.borrow_and_update();
        match current {
            // Reads run detached; the next change supersedes them by epoch.
            Some(address) => drop(board.refresh(address)),
            None => board.invalidate(),
        }
        if account.changed().await.is_err() {
            return;
        }
    }
}
