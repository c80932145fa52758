//! Application configuration loaded from environment variables.

use std::time::Duration;

use crate::chain::AccountAddress;
use crate::errors::{DappError, Result};

const DEFAULT_VE_CONTRACT: &str =
    "0x77ebedd6a221df5ac3b31eeaa688d5af8696a0296e475500cf89ced93eb59ddc";
const DEFAULT_CHEF_CONTRACT: &str =
    "0xae253c60cc171bebefb5d08cf7c4c18f295bd74cc577931143159b541606bbea";
const DEFAULT_FAUCET_CONTRACT: &str =
    "0x0629b1b00b749a903909aab5ccd68a453b874cce963dffce03e38e318bf348b6";

/// Aptos network the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl Network {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            other => Err(DappError::Config(format!("Unknown NETWORK: {other}"))),
        }
    }

    /// Public fullnode REST endpoint for this network.
    pub fn default_node_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.mainnet.aptoslabs.com/v1",
            Self::Testnet => "https://api.testnet.aptoslabs.com/v1",
            Self::Devnet => "https://api.devnet.aptoslabs.com/v1",
        }
    }
}

/// What happens to a Pending lifecycle when its pending notification times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTimeoutPolicy {
    /// Only the notification goes away; the control stays Pending until the chain answers.
    Keep,
    /// The control silently returns to Idle and a late outcome is ignored.
    Reset,
}

impl PendingTimeoutPolicy {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "reset" => Ok(Self::Reset),
            other => Err(DappError::Config(format!(
                "Invalid PENDING_TIMEOUT_POLICY: {other}"
            ))),
        }
    }
}

/// Display timings shared by every transaction control.
#[derive(Debug, Clone, Copy)]
pub struct NoticeTiming {
    pub pending: Duration,
    pub result: Duration,
    pub pending_timeout: PendingTimeoutPolicy,
}

impl Default for NoticeTiming {
    fn default() -> Self {
        Self {
            pending: Duration::from_secs(5),
            result: Duration::from_millis(1500),
            pending_timeout: PendingTimeoutPolicy::Keep,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub network: Network,
    /// Aptos REST endpoint (e.g. https://api.testnet.aptoslabs.com/v1)
    pub node_url: String,
    /// Wallet bridge that signs transactions on behalf of the connected account
    pub wallet_url: String,
    /// Address publishing the `veqka` module
    pub ve_contract: AccountAddress,
    /// Address publishing the `smart_chef` module used by the Vote screen
    pub vote_contract: AccountAddress,
    /// Address publishing the `smart_chef` module used by the Farm screen
    pub chef_contract: AccountAddress,
    /// Address publishing the `faucet` module
    pub faucet_contract: AccountAddress,
    /// Port for the HTTP API
    pub api_port: u16,
    pub notices: NoticeTiming,
    /// Give up waiting for a submitted transaction after this long
    pub confirm_timeout: Duration,
    /// How often to poll for a submitted transaction
    pub confirm_poll: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let network = Network::parse(
            &env_var("NETWORK").unwrap_or_else(|_| "testnet".to_string()),
        )?;

        Ok(Config {
            network,
            node_url: env_var("NODE_URL")
                .unwrap_or_else(|_| network.default_node_url().to_string()),
            wallet_url: env_var("WALLET_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8787".to_string()),
            ve_contract: contract_var("VE_CONTRACT", DEFAULT_VE_CONTRACT)?,
            vote_contract: contract_var("VOTE_CONTRACT", DEFAULT_CHEF_CONTRACT)?,
            chef_contract: contract_var("CHEF_CONTRACT", DEFAULT_CHEF_CONTRACT)?,
            faucet_contract: contract_var("FAUCET_CONTRACT", DEFAULT_FAUCET_CONTRACT)?,
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| DappError::Config("Invalid API_PORT".to_string()))?,
            notices: NoticeTiming {
                pending: Duration::from_secs(
                    env_var("PENDING_NOTICE_SECS")
                        .unwrap_or_else(|_| "5".to_string())
                        .parse()
                        .map_err(|_| {
                            DappError::Config("Invalid PENDING_NOTICE_SECS".to_string())
                        })?,
                ),
                result: Duration::from_millis(
                    env_var("RESULT_NOTICE_MILLIS")
                        .unwrap_or_else(|_| "1500".to_string())
                        .parse()
                        .map_err(|_| {
                            DappError::Config("Invalid RESULT_NOTICE_MILLIS".to_string())
                        })?,
                ),
                pending_timeout: PendingTimeoutPolicy::parse(
                    &env_var("PENDING_TIMEOUT_POLICY").unwrap_or_else(|_| "keep".to_string()),
                )?,
            },
            confirm_timeout: Duration::from_secs(
                env_var("CONFIRM_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .map_err(|_| DappError::Config("Invalid CONFIRM_TIMEOUT_SECS".to_string()))?,
            ),
            confirm_poll: Duration::from_millis(
                env_var("CONFIRM_POLL_MILLIS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .map_err(|_| DappError::Config("Invalid CONFIRM_POLL_MILLIS".to_string()))?,
            ),
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| DappError::Config(format!("Missing env var: {key}")))
}

fn contract_var(key: &str, default: &str) -> Result<AccountAddress> {
    let raw = env_var(key).unwrap_or_else(|_| default.to_string());
    AccountAddress::parse(&raw).map_err(|e| DappError::Config(format!("Invalid {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_parse_and_default_urls() {
        assert_eq!(Network::parse("TESTNET").unwrap(), Network::Testnet);
        assert_eq!(
            Network::parse("mainnet").unwrap().default_node_url(),
            "https://api.mainnet.aptoslabs.com/v1"
        );
        assert!(matches!(Network::parse("localnet"), Err(DappError::Config(_))));
    }

    #[test]
    fn pending_timeout_policy_parse() {
        assert_eq!(PendingTimeoutPolicy::parse("keep").unwrap(), PendingTimeoutPolicy::Keep);
        assert_eq!(PendingTimeoutPolicy::parse("Reset").unwrap(), PendingTimeoutPolicy::Reset);
        assert!(PendingTimeoutPolicy::parse("drop").is_err());
    }

    #[test]
    fn default_contracts_are_valid_addresses() {
        for raw in [DEFAULT_VE_CONTRACT, DEFAULT_CHEF_CONTRACT, DEFAULT_FAUCET_CONTRACT] {
            assert_eq!(AccountAddress::parse(raw).unwrap().to_string(), raw);
        }
    }
}
