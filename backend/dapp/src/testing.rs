//! Scripted [`ChainClient`] for deterministic tests.
//!
//! View replies are keyed by `"<module>::<function>(<args>)"`, e.g.
//! `"smart_chef::get_pool_info(0)"`. Every reply may carry a delay so tests
//! running on a paused clock can choose the completion order.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::chain::{
    ChainClient, EntryFunctionPayload, SignedPayload, TransactionIntent, TransactionRequest,
    TxHandle, UnsignedTransaction, ViewRequest,
};
use crate::errors::{DappError, Result, TxFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Build,
    Sign,
    Submit,
    Confirm,
    /// The transaction never leaves the mempool.
    Timeout,
}

#[derive(Clone)]
enum ViewScript {
    Reply(Vec<Value>, Duration),
    Fail(Duration),
}

#[derive(Default)]
pub struct MockChain {
    views: Mutex<HashMap<String, ViewScript>>,
    fail_at: Mutex<Option<Stage>>,
    confirm_delay: Mutex<Duration>,
    view_log: Mutex<Vec<String>>,
    intents: Mutex<Vec<TransactionIntent>>,
    submitted: Mutex<Vec<TxHandle>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, key: &str, values: Vec<Value>, delay: Duration) {
        self.views
            .lock()
            .unwrap()
            .insert(key.to_string(), ViewScript::Reply(values, delay));
    }

    pub fn fail_view(&self, key: &str, delay: Duration) {
        self.views
            .lock()
            .unwrap()
            .insert(key.to_string(), ViewScript::Fail(delay));
    }

    pub fn fail_at(&self, stage: Stage) {
        *self.fail_at.lock().unwrap() = Some(stage);
    }

    pub fn heal(&self) {
        *self.fail_at.lock().unwrap() = None;
    }

    pub fn confirm_after(&self, delay: Duration) {
        *self.confirm_delay.lock().unwrap() = delay;
    }

    pub fn view_log(&self) -> Vec<String> {
        self.view_log.lock().unwrap().clone()
    }

    pub fn intents(&self) -> Vec<TransactionIntent> {
        self.intents.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<TxHandle> {
        self.submitted.lock().unwrap().clone()
    }

    fn failing(&self, stage: Stage) -> bool {
        *self.fail_at.lock().unwrap() == Some(stage)
    }
}

/// `"0x…::smart_chef::get_pool_info"` + `["0"]` → `"smart_chef::get_pool_info(0)"`.
pub fn view_key(request: &ViewRequest) -> String {
    let short = request
        .function
        .split_once("::")
        .map(|(_, rest)| rest)
        .unwrap_or(&request.function);
    let args: Vec<String> = request
        .arguments
        .iter()
        .map(|a| match a {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    format!("{short}({})", args.join(","))
}

impl ChainClient for MockChain {
    async fn view(&self, request: &ViewRequest) -> Result<Vec<Value>> {
        let key = view_key(request);
        self.view_log.lock().unwrap().push(key.clone());
        let script = self.views.lock().unwrap().get(&key).cloned();
        match script {
            Some(ViewScript::Reply(values, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(values)
            }
            Some(ViewScript::Fail(delay)) => {
                tokio::time::sleep(delay).await;
                Err(DappError::ReadFailed(format!("{key} aborted")))
            }
            None => Err(DappError::ReadFailed(format!("no reply scripted for {key}"))),
        }
    }

    async fn build_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> std::result::Result<UnsignedTransaction, TxFailure> {
        self.intents.lock().unwrap().push(intent.clone());
        if self.failing(Stage::Build) {
            return Err(TxFailure::BuildFailed("account not found".to_string()));
        }
        Ok(UnsignedTransaction {
            chain_id: 2,
            request: TransactionRequest {
                sender: intent.sender().to_string(),
                sequence_number: "0".to_string(),
                max_gas_amount: "2000".to_string(),
                gas_unit_price: "100".to_string(),
                expiration_timestamp_secs: "0".to_string(),
                payload: EntryFunctionPayload {
                    kind: "entry_function_payload".to_string(),
                    function: intent.function().to_string(),
                    type_arguments: intent.type_arguments().to_vec(),
                    arguments: intent.arguments().to_vec(),
                },
            },
        })
    }

    async fn sign(
        &self,
        _txn: &UnsignedTransaction,
    ) -> std::result::Result<SignedPayload, TxFailure> {
        if self.failing(Stage::Sign) {
            return Err(TxFailure::SignRejected("user rejected the request".to_string()));
        }
        Ok(SignedPayload {
            public_key: "0xaa".to_string(),
            signature: "0xbb".to_string(),
        })
    }

    async fn submit(
        &self,
        _txn: &UnsignedTransaction,
        _signed: &SignedPayload,
    ) -> std::result::Result<TxHandle, TxFailure> {
        if self.failing(Stage::Submit) {
            return Err(TxFailure::SubmitFailed("mempool full".to_string()));
        }
        let mut submitted = self.submitted.lock().unwrap();
        let handle = TxHandle {
            hash: format!("0x{:064x}", submitted.len() + 1),
        };
        submitted.push(handle.clone());
        Ok(handle)
    }

    async fn await_confirmation(&self, handle: &TxHandle) -> std::result::Result<(), TxFailure> {
        let delay = *self.confirm_delay.lock().unwrap();
        tokio::time::sleep(delay).await;
        if self.failing(Stage::Confirm) {
            return Err(TxFailure::Reverted(format!("{}: Move abort", handle.hash)));
        }
        if self.failing(Stage::Timeout) {
            return Err(TxFailure::ConfirmationTimedOut(handle.hash.clone()));
        }
        Ok(())
    }
}
