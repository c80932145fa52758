//! Aptos REST + wallet bridge implementation of [`ChainClient`].
//!
//! ## Resilience
//!
//! * Confirmation polling backs off exponentially on rate-limit responses, up
//!   to [`MAX_BACKOFF_SECS`] seconds, and gives up after the configured
//!   confirmation timeout.
//! * Writes are never retried: a failed build, sign or submit is reported once.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::chain::{
    ChainClient, EntryFunctionPayload, SignedPayload, TransactionIntent, TransactionRequest,
    TxHandle, UnsignedTransaction, ViewRequest,
};
use crate::errors::{DappError, Result, TxFailure};

const MAX_BACKOFF_SECS: u64 = 8;
const DEFAULT_MAX_GAS: u64 = 200_000;
const EXPIRATION_SECS: i64 = 600;

// ─────────────────────────────────────────────────────────
// JSON response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NodeError {
    pub message: String,
    pub error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountResource {
    pub sequence_number: String,
}

#[derive(Debug, Deserialize)]
pub struct GasEstimate {
    pub gas_estimate: u64,
}

#[derive(Debug, Deserialize)]
pub struct LedgerInfo {
    pub chain_id: u8,
}

#[derive(Debug, Deserialize)]
pub struct PendingTransaction {
    pub hash: String,
}

/// Subset of `GET /transactions/by_hash/{hash}`.
#[derive(Debug, Deserialize)]
pub struct TransactionStatus {
    #[serde(rename = "type")]
    pub kind: String,
    pub success: Option<bool>,
    pub vm_status: Option<String>,
}

/// What the wallet bridge answers to a sign request.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WalletReply {
    Signed(SignedPayload),
    Rejected { rejected: bool, reason: Option<String> },
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    #[serde(flatten)]
    request: &'a TransactionRequest,
    signature: Value,
}

// ─────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RestClient {
    client: Client,
    node_url: String,
    wallet_url: String,
    confirm_timeout: Duration,
    confirm_poll: Duration,
}

impl RestClient {
    pub fn new(
        client: Client,
        node_url: &str,
        wallet_url: &str,
        confirm_timeout: Duration,
        confirm_poll: Duration,
    ) -> Self {
        Self {
            client,
            node_url: node_url.trim_end_matches('/').to_string(),
            wallet_url: wallet_url.trim_end_matches('/').to_string(),
            confirm_timeout,
            confirm_poll,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(format!("{}{path}", self.node_url))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(node_error(resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn assemble(&self, intent: &TransactionIntent) -> Result<UnsignedTransaction> {
        let sender = intent.sender();
        let account: AccountResource = self.get_json(&format!("/accounts/{sender}")).await?;
        let gas: GasEstimate = self.get_json("/estimate_gas_price").await?;
        let ledger: LedgerInfo = self.get_json("/").await?;

        Ok(UnsignedTransaction {
            chain_id: ledger.chain_id,
            request: TransactionRequest {
                sender: sender.to_string(),
                sequence_number: account.sequence_number,
                max_gas_amount: DEFAULT_MAX_GAS.to_string(),
                gas_unit_price: gas.gas_estimate.to_string(),
                expiration_timestamp_secs: (Utc::now().timestamp() + EXPIRATION_SECS).to_string(),
                payload: EntryFunctionPayload {
                    kind: "entry_function_payload".to_string(),
                    function: intent.function().to_string(),
                    type_arguments: intent.type_arguments().to_vec(),
                    arguments: intent.arguments().to_vec(),
                },
            },
        })
    }

    /// One status poll. `None` while the node has not committed the transaction yet.
    async fn poll_status(&self, hash: &str) -> Result<Option<TransactionStatus>> {
        let resp = self
            .client
            .get(format!("{}/transactions/by_hash/{hash}", self.node_url))
            .send()
            .await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: TransactionStatus = resp.json().await?;
                if body.kind == "pending_transaction" {
                    Ok(None)
                } else {
                    Ok(Some(body))
                }
            }
            StatusCode::TOO_MANY_REQUESTS => Err(DappError::ReadFailed("rate limited".to_string())),
            _ => Err(node_error(resp).await),
        }
    }
}

/// Turn a non-2xx node response into an error carrying the node's message.
async fn node_error(resp: reqwest::Response) -> DappError {
    let status = resp.status();
    match resp.json::<NodeError>().await {
        Ok(err) => DappError::ReadFailed(format!(
            "{status}: {} ({})",
            err.message,
            err.error_code.as_deref().unwrap_or("unknown")
        )),
        Err(_) => DappError::ReadFailed(format!("{status}")),
    }
}

/// Hex string with optional `0x`, as wallets return keys and signatures.
fn is_hex(raw: &str) -> bool {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    !digits.is_empty() && hex::decode(digits).is_ok()
}

impl ChainClient for RestClient {
    async fn view(&self, request: &ViewRequest) -> Result<Vec<Value>> {
        let resp = self
            .client
            .post(format!("{}/view", self.node_url))
            .json(request)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(node_error(resp).await);
        }
        let values: Vec<Value> = resp.json().await?;
        debug!(function = %request.function, returned = values.len(), "View call answered");
        Ok(values)
    }

    async fn build_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> std::result::Result<UnsignedTransaction, TxFailure> {
        self.assemble(intent)
            .await
            .map_err(|e| TxFailure::BuildFailed(e.to_string()))
    }

    async fn sign(
        &self,
        txn: &UnsignedTransaction,
    ) -> std::result::Result<SignedPayload, TxFailure> {
        let resp = self
            .client
            .post(format!("{}/sign", self.wallet_url))
            .json(&json!({
                "chain_id": txn.chain_id,
                "transaction": txn.request,
            }))
            .send()
            .await
            .map_err(|e| TxFailure::SignRejected(format!("wallet unreachable: {e}")))?;

        let status = resp.status();
        let reply: WalletReply = resp
            .json()
            .await
            .map_err(|e| TxFailure::SignRejected(format!("{status}: unreadable wallet reply: {e}")))?;

        match reply {
            WalletReply::Signed(signed) if status.is_success() => {
                if !is_hex(&signed.public_key) || !is_hex(&signed.signature) {
                    return Err(TxFailure::SignRejected(
                        "wallet returned malformed signature".to_string(),
                    ));
                }
                Ok(signed)
            }
            WalletReply::Signed(_) => Err(TxFailure::SignRejected(format!("{status}"))),
            WalletReply::Rejected { rejected, reason } => Err(TxFailure::SignRejected(
                reason.unwrap_or_else(|| format!("{status} (rejected={rejected})")),
            )),
        }
    }

    async fn submit(
        &self,
        txn: &UnsignedTransaction,
        signed: &SignedPayload,
    ) -> std::result::Result<TxHandle, TxFailure> {
        let body = SubmitRequest {
            request: &txn.request,
            signature: json!({
                "type": "ed25519_signature",
                "public_key": signed.public_key,
                "signature": signed.signature,
            }),
        };
        let resp = self
            .client
            .post(format!("{}/transactions", self.node_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| TxFailure::SubmitFailed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(TxFailure::SubmitFailed(node_error(resp).await.to_string()));
        }
        let pending: PendingTransaction = resp
            .json()
            .await
            .map_err(|e| TxFailure::SubmitFailed(e.to_string()))?;
        Ok(TxHandle { hash: pending.hash })
    }

    async fn await_confirmation(&self, handle: &TxHandle) -> std::result::Result<(), TxFailure> {
        let deadline = Instant::now() + self.confirm_timeout;
        let mut wait = self.confirm_poll;

        loop {
            match self.poll_status(&handle.hash).await {
                Ok(Some(status)) => {
                    return match status.success {
                        Some(true) => Ok(()),
                        _ => Err(TxFailure::Reverted(
                            status.vm_status.unwrap_or_else(|| status.kind.clone()),
                        )),
                    };
                }
                Ok(None) => wait = self.confirm_poll,
                Err(e) => {
                    warn!(hash = %handle.hash, "Confirmation poll failed (will retry in {wait:?}): {e}");
                    wait = (wait * 2).min(Duration::from_secs(MAX_BACKOFF_SECS));
                }
            }

            if Instant::now() + wait > deadline {
                return Err(TxFailure::ConfirmationTimedOut(handle.hash.clone()));
            }
            tokio::time::sleep(wait).await;
        }
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
