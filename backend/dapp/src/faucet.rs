//! Test-token faucet.
//!
//! Each entry mints a fixed amount of its coin to the connected account. A
//! mint is a plain sign-and-submit: no lifecycle, no notification, and a
//! failure is only logged.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{error, info};

use crate::chain::{AccountAddress, ChainClient, FunctionId, TransactionIntent, TxHandle};
use crate::errors::{DappError, Result, TxFailure};

/// Raw amount minted per click (10 tokens at 8 decimals).
pub const MINT_AMOUNT: &str = "1000000000";

const FAUCET_MODULE: &str = "faucet";
const COINS: [&str; 3] = ["USDC", "WETH", "WBTC"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaucetEntry {
    pub name: String,
    pub coin_type: String,
}

pub struct Faucet<C> {
    chain: Arc<C>,
    contract: AccountAddress,
    entries: Vec<FaucetEntry>,
}

impl<C: ChainClient> Faucet<C> {
    pub fn new(chain: Arc<C>, contract: AccountAddress) -> Self {
        let entries = COINS
            .iter()
            .map(|name| FaucetEntry {
                name: name.to_string(),
                coin_type: format!("{contract}::{FAUCET_MODULE}::{name}"),
            })
            .collect();
        Self {
            chain,
            contract,
            entries,
        }
    }

    pub fn entries(&self) -> &[FaucetEntry] {
        &self.entries
    }

    pub fn mint_intent(&self, sender: AccountAddress, entry: &FaucetEntry) -> TransactionIntent {
        TransactionIntent::new(
            sender,
            &FunctionId::new(self.contract, FAUCET_MODULE, "mint"),
            vec![entry.coin_type.clone()],
            vec![json!(MINT_AMOUNT)],
        )
    }

    /// Sign and submit a mint of `name` for `sender`. Does not wait for confirmation.
    pub async fn mint(&self, sender: AccountAddress, name: &str) -> Result<TxHandle> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| DappError::NotFound(format!("faucet entry {name}")))?;

        let intent = self.mint_intent(sender, entry);
        match self.sign_and_submit(&intent).await {
            Ok(handle) => {
                info!(coin = %entry.name, hash = %handle.hash, "Faucet mint submitted");
                Ok(handle)
            }
            Err(cause) => {
                error!(coin = %entry.name, %cause, "Faucet mint failed");
                Err(cause.into())
            }
        }
    }

    async fn sign_and_submit(
        &self,
        intent: &TransactionIntent,
    ) -> std::result::Result<TxHandle, TxFailure> {
        let unsigned = self.chain.build_transaction(intent).await?;
        let signed = self.chain.sign(&unsigned).await?;
        self.chain.submit(&unsigned, &signed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, Stage};

    const FAUCET: &str = "0x0629b1b00b749a903909aab5ccd68a453b874cce963dffce03e38e318bf348b6";

    fn faucet(chain: Arc<MockChain>) -> Faucet<MockChain> {
        Faucet::new(chain, AccountAddress::parse(FAUCET).unwrap())
    }

    fn user() -> AccountAddress {
        AccountAddress::parse("0xa11ce").unwrap()
    }

    #[test]
    fn entries_are_qualified_by_faucet_address() {
        let chain = Arc::new(MockChain::new());
        let faucet = faucet(chain);
        let names: Vec<&str> = faucet.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["USDC", "WETH", "WBTC"]);
        assert_eq!(faucet.entries()[0].coin_type, format!("{FAUCET}::faucet::USDC"));
    }

    #[tokio::test]
    async fn usdc_mint_issues_expected_intent() {
        let chain = Arc::new(MockChain::new());
        let faucet = faucet(chain.clone());

        faucet.mint(user(), "USDC").await.unwrap();

        let intents = chain.intents();
        assert_eq!(intents.len(), 1);
        let intent = &intents[0];
        assert_eq!(intent.function(), format!("{FAUCET}::faucet::mint"));
        assert_eq!(intent.type_arguments(), [format!("{FAUCET}::faucet::USDC")]);
        assert_eq!(intent.arguments(), [json!("1000000000")]);
        assert_eq!(intent.sender(), user());
        assert_eq!(chain.submitted().len(), 1);
    }

    #[tokio::test]
    async fn rejected_signature_is_reported_and_changes_nothing() {
        let chain = Arc::new(MockChain::new());
        chain.fail_at(Stage::Sign);
        let faucet = faucet(chain.clone());
        let before = faucet.entries().to_vec();

        let err = faucet.mint(user(), "WETH").await.unwrap_err();
        assert!(matches!(err, DappError::Transaction(TxFailure::SignRejected(_))));
        assert_eq!(faucet.entries(), before.as_slice());
        assert!(chain.submitted().is_empty());

        // The faucet keeps working afterwards.
        chain.heal();
        assert!(faucet.mint(user(), "wbtc").await.is_ok());
        assert_eq!(chain.submitted().len(), 1);
    }

    #[tokio::test]
    async fn unknown_entry_is_not_found() {
        let chain = Arc::new(MockChain::new());
        let err = faucet(chain.clone()).mint(user(), "DOGE").await.unwrap_err();
        assert!(matches!(err, DappError::NotFound(_)));
        assert!(chain.intents().is_empty());
    }
}
