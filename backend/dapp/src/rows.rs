//! Vote board: per-pool rows refreshed by independent view calls.
//!
//! Every refresh issues three reads per row (user stake, pending reward,
//! pool info). Results land one by one, in whatever order the node answers,
//! and each only touches its own fields of its own row. A refresh opens a new
//! epoch; answers belonging to an older epoch are dropped on arrival.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::{AccountAddress, ChainClient, FunctionId, ViewRequest};
use crate::errors::{DappError, Result};
use crate::units::{format_units, TOKEN_DECIMALS};

const SMART_CHEF: &str = "smart_chef";

/// A dynamic row value. `Unset` until its read resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Field {
    #[default]
    Unset,
    Set(u128),
}

impl Field {
    /// `"-"` while unset, otherwise the 8-decimal amount.
    pub fn render(&self) -> String {
        match self {
            Field::Unset => "-".to_string(),
            Field::Set(raw) => format_units(*raw, TOKEN_DECIMALS),
        }
    }

    pub fn raw(&self) -> Option<u128> {
        match self {
            Field::Unset => None,
            Field::Set(raw) => Some(*raw),
        }
    }
}

/// Static description of a pool shown on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolListing {
    pub id: u64,
    pub name: &'static str,
    pub token_one_url: &'static str,
    pub token_two_url: &'static str,
}

/// The pools the Vote screen lists, in display order.
pub fn vote_pools() -> Vec<PoolListing> {
    vec![
        PoolListing {
            id: 0,
            name: "Qka - VeQka",
            token_one_url: "https://cdn.moralis.io/eth/0x2260fac5e5542a773aa44fbcfedf7c193bc2c599.png",
            token_two_url: "https://cdn.moralis.io/eth/0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2.png",
        },
        PoolListing {
            id: 1,
            name: "VeQka - Qka",
            token_one_url: "https://cdn.moralis.io/eth/0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48.png",
            token_two_url: "https://cdn.moralis.io/eth/0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2.png",
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRow {
    pub listing: PoolListing,
    pub user_stake: Field,
    pub user_pending_reward: Field,
    pub total_staked: Field,
    pub reward_per_second: Field,
}

impl PoolRow {
    fn new(listing: PoolListing) -> Self {
        Self {
            listing,
            user_stake: Field::Unset,
            user_pending_reward: Field::Unset,
            total_staked: Field::Unset,
            reward_per_second: Field::Unset,
        }
    }

    fn clear(&mut self) {
        self.user_stake = Field::Unset;
        self.user_pending_reward = Field::Unset;
        self.total_staked = Field::Unset;
        self.reward_per_second = Field::Unset;
    }

    pub fn view(&self) -> RowView {
        RowView {
            id: self.listing.id,
            name: self.listing.name,
            token_one_url: self.listing.token_one_url,
            token_two_url: self.listing.token_two_url,
            user_stake: self.user_stake.render(),
            user_pending_reward: self.user_pending_reward.render(),
            total_staked: self.total_staked.render(),
            reward_per_second: self.reward_per_second.render(),
        }
    }
}

/// Rendered row, as served to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub id: u64,
    pub name: &'static str,
    pub token_one_url: &'static str,
    pub token_two_url: &'static str,
    pub user_stake: String,
    pub user_pending_reward: String,
    pub total_staked: String,
    pub reward_per_second: String,
}

/// The three reads issued per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRead {
    UserStake,
    PendingReward,
    PoolInfo,
}

impl RowRead {
    pub const ALL: [RowRead; 3] = [RowRead::UserStake, RowRead::PendingReward, RowRead::PoolInfo];

    fn function(self) -> &'static str {
        match self {
            RowRead::UserStake => "get_user_stake_amount",
            RowRead::PendingReward => "get_pending_reward",
            RowRead::PoolInfo => "get_pool_info",
        }
    }

    pub fn request(self, contract: AccountAddress, account: AccountAddress, pool: u64) -> ViewRequest {
        let function = FunctionId::new(contract, SMART_CHEF, self.function());
        let arguments = match self {
            RowRead::UserStake | RowRead::PendingReward => {
                vec![json!(account.to_string()), json!(pool.to_string())]
            }
            RowRead::PoolInfo => vec![json!(pool.to_string())],
        };
        ViewRequest::new(&function, arguments)
    }

    /// Turn a view result into the row fields it owns.
    pub fn decode(self, values: &[Value]) -> Result<FieldUpdate> {
        match self {
            RowRead::UserStake => Ok(FieldUpdate::UserStake(integer_at(values, 0)?)),
            RowRead::PendingReward => Ok(FieldUpdate::PendingReward(integer_at(values, 0)?)),
            RowRead::PoolInfo => Ok(FieldUpdate::PoolInfo {
                total_staked: integer_at(values, 0)?,
                reward_per_second: integer_at(values, 2)?,
            }),
        }
    }
}

/// Result of one read, scoped to the fields that read owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldUpdate {
    UserStake(u128),
    PendingReward(u128),
    PoolInfo {
        total_staked: u128,
        reward_per_second: u128,
    },
}

impl FieldUpdate {
    fn apply_to(self, row: &mut PoolRow) {
        match self {
            FieldUpdate::UserStake(v) => row.user_stake = Field::Set(v),
            FieldUpdate::PendingReward(v) => row.user_pending_reward = Field::Set(v),
            FieldUpdate::PoolInfo {
                total_staked,
                reward_per_second,
            } => {
                row.total_staked = Field::Set(total_staked);
                row.reward_per_second = Field::Set(reward_per_second);
            }
        }
    }
}

/// Move `u64`/`u128` values come back as decimal strings; small ones may be bare numbers.
fn integer_at(values: &[Value], index: usize) -> Result<u128> {
    let value = values
        .get(index)
        .ok_or_else(|| DappError::ReadFailed(format!("missing return value {index}")))?;
    match value {
        Value::String(s) => s
            .parse()
            .map_err(|_| DappError::ReadFailed(format!("not an integer: {s:?}"))),
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| DappError::ReadFailed(format!("not an unsigned integer: {n}"))),
        other => Err(DappError::ReadFailed(format!("unexpected value: {other}"))),
    }
}

struct BoardState {
    epoch: u64,
    account: Option<AccountAddress>,
    rows: BTreeMap<u64, PoolRow>,
}

pub struct RowBoard<C> {
    chain: Arc<C>,
    contract: AccountAddress,
    order: Vec<u64>,
    state: Mutex<BoardState>,
}

/// The reads issued by one refresh. Dropping it leaves them running.
pub struct RefreshBatch {
    pub epoch: u64,
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshBatch {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every read of this batch to land or fail.
    #[cfg(test)]
    pub async fn finished(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

impl<C: ChainClient> RowBoard<C> {
    pub fn new(chain: Arc<C>, contract: AccountAddress, pools: Vec<PoolListing>) -> Self {
        let order = pools.iter().map(|p| p.id).collect();
        let rows = pools.into_iter().map(|p| (p.id, PoolRow::new(p))).collect();
        Self {
            chain,
            contract,
            order,
            state: Mutex::new(BoardState {
                epoch: 0,
                account: None,
                rows,
            }),
        }
    }

    pub fn account(&self) -> Option<AccountAddress> {
        self.lock().account
    }

    pub fn row(&self, id: u64) -> Option<PoolRow> {
        self.lock().rows.get(&id).cloned()
    }

    /// Rows in display order.
    pub fn rows(&self) -> Vec<PoolRow> {
        let state = self.lock();
        self.order
            .iter()
            .filter_map(|id| state.rows.get(id).cloned())
            .collect()
    }

    /// Open a new epoch for `account` and fire all reads for every row.
    pub fn refresh(self: &Arc<Self>, account: AccountAddress) -> RefreshBatch {
        let epoch = {
            let mut state = self.lock();
            state.epoch += 1;
            state.account = Some(account);
            state.rows.values_mut().for_each(PoolRow::clear);
            state.epoch
        };
        info!(%account, epoch, rows = self.order.len(), "Refreshing vote board");

        let mut tasks = Vec::with_capacity(self.order.len() * RowRead::ALL.len());
        for &pool in &self.order {
            for read in RowRead::ALL {
                let board = Arc::clone(self);
                tasks.push(tokio::spawn(async move {
                    board.fetch(epoch, account, pool, read).await;
                }));
            }
        }
        RefreshBatch { epoch, tasks }
    }

    /// Forget the current account; anything still in flight becomes stale.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.epoch += 1;
        state.account = None;
        state.rows.values_mut().for_each(PoolRow::clear);
    }

    async fn fetch(&self, epoch: u64, account: AccountAddress, pool: u64, read: RowRead) {
        let request = read.request(self.contract, account, pool);
        let result = self
            .chain
            .view(&request)
            .await
            .and_then(|values| read.decode(&values));
        match result {
            Ok(update) => {
                self.apply(epoch, pool, update);
            }
            Err(e) => warn!(pool, function = %request.function, "Row read failed: {e}"),
        }
    }

    /// Merge one read result into its row. Returns `false` when it was stale or unknown.
    pub fn apply(&self, epoch: u64, pool: u64, update: FieldUpdate) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            debug!(pool, epoch, current = state.epoch, "Dropping stale row update");
            return false;
        }
        match state.rows.get_mut(&pool) {
            Some(row) => {
                update.apply_to(row);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
