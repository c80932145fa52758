//! Transaction lifecycle controller.
//!
//! One [`TxController`] backs one clickable control (the Ve "Stake" button,
//! each Vote row's "Vote" and "Unvote" buttons). It walks a
//! [`TransactionIntent`] through build → sign → submit → confirm and mirrors
//! every phase change onto the screen's [`Notifier`]:
//!
//! ```text
//! Idle ──begin──► Pending ──► Succeeded ──(notice dismissed)──► Idle
//!                    └──────► Failed ─────(notice dismissed)──► Idle
//! ```
//!
//! `begin` is refused unless the control is Idle, so a control never has two
//! transactions in flight.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::{ChainClient, TransactionIntent, TxHandle};
use crate::config::{NoticeTiming, PendingTimeoutPolicy};
use crate::errors::{DappError, Result, TxFailure};
use crate::notify::{Dismissal, NoticeKind, Notifier};

pub const PENDING_TEXT: &str = "Transaction is Pending...";
pub const SUCCESS_TEXT: &str = "Transaction Successful";
pub const FAILURE_TEXT: &str = "Transaction Failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl Phase {
    fn is_terminal(self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed)
    }
}

/// Point-in-time view of a control, as served to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlSnapshot {
    pub label: String,
    pub phase: Phase,
    pub handle: Option<TxHandle>,
}

struct Lifecycle {
    phase: Phase,
    handle: Option<TxHandle>,
    /// Bumped on every `begin`; outcomes carrying an older value are ignored.
    attempt: u64,
}

pub struct TxController<C> {
    label: String,
    chain: Arc<C>,
    notifier: Notifier,
    timing: NoticeTiming,
    state: Mutex<Lifecycle>,
    transitions: broadcast::Sender<Phase>,
}

impl<C: ChainClient> TxController<C> {
    pub fn new(label: impl Into<String>, chain: Arc<C>, notifier: Notifier, timing: NoticeTiming) -> Self {
        let (transitions, _) = broadcast::channel(16);
        Self {
            label: label.into(),
            chain,
            notifier,
            timing,
            state: Mutex::new(Lifecycle {
                phase: Phase::Idle,
                handle: None,
                attempt: 0,
            }),
            transitions,
        }
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn snapshot(&self) -> ControlSnapshot {
        let state = self.lock();
        ControlSnapshot {
            label: self.label.clone(),
            phase: state.phase,
            handle: state.handle.clone(),
        }
    }

    /// Every phase change, in order.
    #[cfg(test)]
    pub fn subscribe(&self) -> broadcast::Receiver<Phase> {
        self.transitions.subscribe()
    }

    /// Start driving `intent`. Fails with [`DappError::Busy`] unless the control is Idle.
    ///
    /// The returned task resolves with the chain outcome; the phase keeps
    /// moving on its own (terminal → Idle) after the task finishes.
    pub fn begin(
        self: &Arc<Self>,
        intent: TransactionIntent,
    ) -> Result<JoinHandle<std::result::Result<TxHandle, TxFailure>>> {
        let attempt = {
            let mut state = self.lock();
            if state.phase != Phase::Idle {
                return Err(DappError::Busy(self.label.clone()));
            }
            state.attempt += 1;
            state.phase = Phase::Pending;
            state.handle = None;
            state.attempt
        };
        let _ = self.transitions.send(Phase::Pending);
        info!(control = %self.label, function = intent.function(), "Transaction pending");

        let pending = self
            .notifier
            .show(NoticeKind::Loading, PENDING_TEXT, self.timing.pending);
        debug!(control = %self.label, notice = pending.id, "Pending notice shown");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if pending.dismissed().await == Dismissal::Elapsed {
                this.pending_display_elapsed(attempt);
            }
        });

        let this = Arc::clone(self);
        Ok(tokio::spawn(async move {
            let outcome = this.drive(attempt, &intent).await;
            this.settle(attempt, &outcome);
            outcome
        }))
    }

    async fn drive(
        &self,
        attempt: u64,
        intent: &TransactionIntent,
    ) -> std::result::Result<TxHandle, TxFailure> {
        let unsigned = self.chain.build_transaction(intent).await?;
        let signed = self.chain.sign(&unsigned).await?;
        let handle = self.chain.submit(&unsigned, &signed).await?;
        {
            let mut state = self.lock();
            if state.attempt == attempt && state.phase == Phase::Pending {
                state.handle = Some(handle.clone());
            }
        }
        debug!(control = %self.label, hash = %handle.hash, "Transaction submitted");
        self.chain.await_confirmation(&handle).await?;
        Ok(handle)
    }

    fn settle(self: &Arc<Self>, attempt: u64, outcome: &std::result::Result<TxHandle, TxFailure>) {
        let phase = if outcome.is_ok() {
            Phase::Succeeded
        } else {
            Phase::Failed
        };
        {
            let mut state = self.lock();
            if state.attempt != attempt || state.phase != Phase::Pending {
                debug!(control = %self.label, ?outcome, "Ignoring outcome of abandoned transaction");
                return;
            }
            state.phase = phase;
        }
        let _ = self.transitions.send(phase);

        let notice = match outcome {
            Ok(handle) => {
                info!(control = %self.label, hash = %handle.hash, "Transaction successful");
                self.notifier
                    .show(NoticeKind::Success, SUCCESS_TEXT, self.timing.result)
            }
            Err(cause) => {
                warn!(control = %self.label, %cause, "Transaction failed");
                self.notifier
                    .show(NoticeKind::Error, FAILURE_TEXT, self.timing.result)
            }
        };

        // Whether the result notice runs its course or another control takes
        // the slot, this control becomes available again.
        let this = Arc::clone(self);
        tokio::spawn(async move {
            notice.dismissed().await;
            this.reset(attempt);
        });
    }

    fn pending_display_elapsed(&self, attempt: u64) {
        if self.timing.pending_timeout != PendingTimeoutPolicy::Reset {
            return;
        }
        {
            let mut state = self.lock();
            if state.attempt != attempt || state.phase != Phase::Pending {
                return;
            }
            state.phase = Phase::Idle;
            state.handle = None;
        }
        let _ = self.transitions.send(Phase::Idle);
        debug!(control = %self.label, "Pending notice expired; control released");
    }

    fn reset(&self, attempt: u64) {
        {
            let mut state = self.lock();
            if state.attempt != attempt || !state.phase.is_terminal() {
                return;
            }
            state.phase = Phase::Idle;
            state.handle = None;
        }
        let _ = self.transitions.send(Phase::Idle);
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
