//! Chain-facing types and the [`ChainClient`] seam.
//!
//! Everything the screens need from the outside world (reads, building,
//! wallet signing, submission and confirmation) goes through [`ChainClient`].
//! The production implementation lives in [`crate::rpc`]; tests use a scripted
//! mock.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{DappError, Result, TxFailure};

/// A 32-byte account address, always rendered in long `0x`-prefixed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    /// Accepts short (`0x1`) and long forms, with or without the `0x` prefix.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > 64 {
            return Err(DappError::InvalidAddress(raw.to_string()));
        }

        let padded = format!("{digits:0>64}");
        let bytes = hex::decode(&padded).map_err(|_| DappError::InvalidAddress(raw.to_string()))?;
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for AccountAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Fully qualified entry point or view function: `<address>::<module>::<function>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionId {
    pub address: AccountAddress,
    pub module: &'static str,
    pub name: &'static str,
}

impl FunctionId {
    pub fn new(address: AccountAddress, module: &'static str, name: &'static str) -> Self {
        Self {
            address,
            module,
            name,
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.address, self.module, self.name)
    }
}

/// A read-only view call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRequest {
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

impl ViewRequest {
    pub fn new(function: &FunctionId, arguments: Vec<Value>) -> Self {
        Self {
            function: function.to_string(),
            type_arguments: Vec::new(),
            arguments,
        }
    }
}

/// One user-initiated write action. Built fresh for every click and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIntent {
    sender: AccountAddress,
    function: String,
    type_arguments: Vec<String>,
    arguments: Vec<Value>,
}

impl TransactionIntent {
    pub fn new(
        sender: AccountAddress,
        function: &FunctionId,
        type_arguments: Vec<String>,
        arguments: Vec<Value>,
    ) -> Self {
        Self {
            sender,
            function: function.to_string(),
            type_arguments,
            arguments,
        }
    }

    pub fn sender(&self) -> AccountAddress {
        self.sender
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn type_arguments(&self) -> &[String] {
        &self.type_arguments
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }
}

/// `entry_function_payload` as the node's JSON API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFunctionPayload {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: String,
    pub type_arguments: Vec<String>,
    pub arguments: Vec<Value>,
}

/// The user transaction request fields that get signed and submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub sender: String,
    pub sequence_number: String,
    pub max_gas_amount: String,
    pub gas_unit_price: String,
    pub expiration_timestamp_secs: String,
    pub payload: EntryFunctionPayload,
}

/// A transaction ready for the wallet to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnsignedTransaction {
    pub chain_id: u8,
    pub request: TransactionRequest,
}

/// Wallet output: the sender's public key and its signature, both hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    pub public_key: String,
    pub signature: String,
}

/// Reference to a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    pub hash: String,
}

/// Read and write access to the chain plus the connected wallet.
///
/// None of these operations can be cancelled once issued.
pub trait ChainClient: Send + Sync + 'static {
    /// Side-effect-free view call returning the function's result values.
    fn view(&self, request: &ViewRequest) -> impl Future<Output = Result<Vec<Value>>> + Send;

    fn build_transaction(
        &self,
        intent: &TransactionIntent,
    ) -> impl Future<Output = std::result::Result<UnsignedTransaction, TxFailure>> + Send;

    /// Ask the wallet to sign. The user may decline.
    fn sign(
        &self,
        txn: &UnsignedTransaction,
    ) -> impl Future<Output = std::result::Result<SignedPayload, TxFailure>> + Send;

    fn submit(
        &self,
        txn: &UnsignedTransaction,
        signed: &SignedPayload,
    ) -> impl Future<Output = std::result::Result<TxHandle, TxFailure>> + Send;

    /// Resolves once the transaction is committed successfully, reverted, or
    /// the client's own confirmation timeout passes.
    fn await_confirmation(
        &self,
        handle: &TxHandle,
    ) -> impl Future<Output = std::result::Result<(), TxFailure>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn address_parse_pads_short_form() {
        let addr = AccountAddress::parse("0x1").unwrap();
        assert_eq!(
            addr.to_string(),
            "0x0000000000000000000000000000000000000000000000000000000000000001"
        );
        assert_eq!(AccountAddress::parse("1").unwrap(), addr);
    }

    #[test]
    fn address_parse_rejects_garbage() {
        assert!(matches!(AccountAddress::parse(""), Err(DappError::InvalidAddress(_))));
        assert!(matches!(AccountAddress::parse("0x"), Err(DappError::InvalidAddress(_))));
        assert!(matches!(AccountAddress::parse("0xzz"), Err(DappError::InvalidAddress(_))));
        let too_long = format!("0x{}", "a".repeat(65));
        assert!(AccountAddress::parse(&too_long).is_err());
    }

    #[test]
    fn function_id_display() {
        let id = FunctionId::new(AccountAddress::parse("0xab").unwrap(), "faucet", "mint");
        assert!(id.to_string().ends_with("00ab::faucet::mint"));
    }

    #[test]
    fn view_request_serializes_as_node_body() {
        let id = FunctionId::new(AccountAddress::parse("0x1").unwrap(), "smart_chef", "get_pool_info");
        let body = serde_json::to_value(ViewRequest::new(&id, vec![json!("0")])).unwrap();
        assert_eq!(body["type_arguments"], json!([]));
        assert_eq!(body["arguments"], json!(["0"]));
        assert!(body["function"].as_str().unwrap().ends_with("::smart_chef::get_pool_info"));
    }
}
