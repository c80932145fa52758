//! Ve screen: lock QKA into VeQKA.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::chain::{AccountAddress, ChainClient, FunctionId, TransactionIntent};
use crate::config::NoticeTiming;
use crate::errors::Result;
use crate::lifecycle::{ControlSnapshot, TxController};
use crate::notify::{Notice, Notifier};
use crate::units::{parse_units, TOKEN_DECIMALS};

/// Every stake locks for two years.
pub const LOCK_SECS: u64 = 24 * 60 * 60 * 365 * 2;

#[derive(Debug, Clone, Serialize)]
pub struct VeView {
    pub stake: ControlSnapshot,
    pub notice: Option<Notice>,
}

pub struct VeScreen<C> {
    contract: AccountAddress,
    notifier: Notifier,
    stake: Arc<TxController<C>>,
}

impl<C: ChainClient> VeScreen<C> {
    pub fn new(chain: Arc<C>, contract: AccountAddress, timing: NoticeTiming) -> Self {
        let notifier = Notifier::new();
        let stake = Arc::new(TxController::new("ve-stake", chain, notifier.clone(), timing));
        Self {
            contract,
            notifier,
            stake,
        }
    }

    /// `amount` is a decimal token amount as typed by the user.
    pub fn stake_intent(&self, sender: AccountAddress, amount: &str) -> Result<TransactionIntent> {
        let raw = parse_units(amount, TOKEN_DECIMALS)?;
        Ok(TransactionIntent::new(
            sender,
            &FunctionId::new(self.contract, "veqka", "stake"),
            vec![],
            vec![json!(LOCK_SECS.to_string()), json!(raw.to_string())],
        ))
    }

    /// Start a stake lifecycle; the outcome is reflected in [`VeScreen::view`].
    pub fn stake(&self, sender: AccountAddress, amount: &str) -> Result<()> {
        let intent = self.stake_intent(sender, amount)?;
        self.stake.begin(intent)?;
        Ok(())
    }

    pub fn view(&self) -> VeView {
        VeView {
            stake: self.stake.snapshot(),
            notice: self.notifier.current(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::errors::DappError;
    use crate::lifecycle::{Phase, PENDING_TEXT, SUCCESS_TEXT};
    use crate::testing::MockChain;

    fn screen(chain: Arc<MockChain>) -> VeScreen<MockChain> {
        VeScreen::new(chain, AccountAddress::parse("0x77").unwrap(), NoticeTiming::default())
    }

    fn user() -> AccountAddress {
        AccountAddress::parse("0xa11ce").unwrap()
    }

    #[test]
    fn stake_intent_locks_two_years_in_base_units() {
        let chain = Arc::new(MockChain::new());
        let intent = screen(chain).stake_intent(user(), "2.5").unwrap();
        assert!(intent.function().ends_with("::veqka::stake"));
        assert!(intent.type_arguments().is_empty());
        assert_eq!(intent.arguments(), [json!("63072000"), json!("250000000")]);
    }

    #[test]
    fn bad_amount_never_reaches_the_chain() {
        let chain = Arc::new(MockChain::new());
        let ve = screen(chain.clone());
        assert!(matches!(ve.stake(user(), "ten"), Err(DappError::InvalidAmount(_))));
        assert_eq!(ve.view().stake.phase, Phase::Idle);
        assert!(chain.intents().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stake_reflects_lifecycle_in_view() {
        let chain = Arc::new(MockChain::new());
        chain.confirm_after(Duration::from_secs(1));
        let ve = screen(chain);

        ve.stake(user(), "1").unwrap();
        let view = ve.view();
        assert_eq!(view.stake.phase, Phase::Pending);
        assert_eq!(view.notice.unwrap().content, PENDING_TEXT);
        assert!(matches!(ve.stake(user(), "1"), Err(DappError::Busy(_))));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let view = ve.view();
        assert_eq!(view.stake.phase, Phase::Succeeded);
        assert_eq!(view.notice.unwrap().content, SUCCESS_TEXT);

        tokio::time::sleep(Duration::from_secs(2)).await;
        let view = ve.view();
        assert_eq!(view.stake.phase, Phase::Idle);
        assert!(view.notice.is_none());
    }
}
