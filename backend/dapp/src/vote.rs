//! Vote screen: the pool board plus per-row Vote / Unvote controls.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::chain::{AccountAddress, ChainClient, FunctionId, TransactionIntent};
use crate::config::NoticeTiming;
use crate::errors::{DappError, Result};
use crate::lifecycle::{ControlSnapshot, TxController};
use crate::notify::{Notice, Notifier};
use crate::rows::{vote_pools, PoolRow, RefreshBatch, RowBoard, RowView};

/// Raw amount deposited by one Vote click (one token at 8 decimals).
pub const VOTE_AMOUNT: &str = "100000000";

const SMART_CHEF: &str = "smart_chef";

struct RowControls<C> {
    deposit: Arc<TxController<C>>,
    withdraw: Arc<TxController<C>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteRowView {
    #[serde(flatten)]
    pub row: RowView,
    pub vote: ControlSnapshot,
    /// Absent until the user's stake in this pool is known.
    pub unvote: Option<ControlSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteView {
    pub account: Option<String>,
    pub rows: Vec<VoteRowView>,
    pub notice: Option<Notice>,
}

pub struct VoteScreen<C> {
    contract: AccountAddress,
    notifier: Notifier,
    board: Arc<RowBoard<C>>,
    controls: BTreeMap<u64, RowControls<C>>,
}

impl<C: ChainClient> VoteScreen<C> {
    pub fn new(chain: Arc<C>, contract: AccountAddress, timing: NoticeTiming) -> Self {
        let notifier = Notifier::new();
        let pools = vote_pools();
        let controls = pools
            .iter()
            .map(|pool| {
                let controls = RowControls {
                    deposit: Arc::new(TxController::new(
                        format!("vote-{}", pool.id),
                        chain.clone(),
                        notifier.clone(),
                        timing,
                    )),
                    withdraw: Arc::new(TxController::new(
                        format!("unvote-{}", pool.id),
                        chain.clone(),
                        notifier.clone(),
                        timing,
                    )),
                };
                (pool.id, controls)
            })
            .collect();
        let board = Arc::new(RowBoard::new(chain, contract, pools));
        Self {
            contract,
            notifier,
            board,
            controls,
        }
    }

    pub fn board(&self) -> &Arc<RowBoard<C>> {
        &self.board
    }

    pub fn refresh(&self, account: AccountAddress) -> RefreshBatch {
        self.board.refresh(account)
    }

    pub fn deposit_intent(&self, sender: AccountAddress, pool: u64) -> TransactionIntent {
        TransactionIntent::new(
            sender,
            &FunctionId::new(self.contract, SMART_CHEF, "deposit"),
            vec![],
            vec![json!(pool.to_string()), json!(VOTE_AMOUNT)],
        )
    }

    /// Withdraw the user's whole stake; needs `sender`'s stake to have been read.
    pub fn withdraw_intent(&self, sender: AccountAddress, pool: u64) -> Result<TransactionIntent> {
        if self.board.account() != Some(sender) {
            return Err(DappError::NotFound(format!("stake of {sender} not loaded")));
        }
        let row = self
            .board
            .row(pool)
            .ok_or_else(|| DappError::NotFound(format!("pool {pool}")))?;
        let stake = row
            .user_stake
            .raw()
            .ok_or_else(|| DappError::NotFound(format!("stake in pool {pool} not loaded")))?;
        Ok(TransactionIntent::new(
            sender,
            &FunctionId::new(self.contract, SMART_CHEF, "withdraw"),
            vec![],
            vec![json!(pool.to_string()), json!(stake.to_string())],
        ))
    }

    pub fn vote(&self, sender: AccountAddress, pool: u64) -> Result<()> {
        let controls = self.controls(pool)?;
        controls.deposit.begin(self.deposit_intent(sender, pool))?;
        Ok(())
    }

    pub fn unvote(&self, sender: AccountAddress, pool: u64) -> Result<()> {
        let controls = self.controls(pool)?;
        let intent = self.withdraw_intent(sender, pool)?;
        controls.withdraw.begin(intent)?;
        Ok(())
    }

    pub fn view(&self) -> VoteView {
        let rows = self
            .board
            .rows()
            .iter()
            .filter_map(|row| self.row_view(row))
            .collect();
        VoteView {
            account: self.board.account().map(|a| a.to_string()),
            rows,
            notice: self.notifier.current(),
        }
    }

    fn row_view(&self, row: &PoolRow) -> Option<VoteRowView> {
        let controls = self.controls.get(&row.listing.id)?;
        Some(VoteRowView {
            row: row.view(),
            vote: controls.deposit.snapshot(),
            unvote: row
                .user_stake
                .raw()
                .map(|_| controls.withdraw.snapshot()),
        })
    }

    fn controls(&self, pool: u64) -> Result<&RowControls<C>> {
        self.controls
            .get(&pool)
            .ok_or_else(|| DappError::NotFound(format!("pool {pool}")))
    }
}
