use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::chain::Address;
use crate::constants::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_SETTLE_DELAY_MILLIS, DEMO_GOVERNANCE_ADDRESS,
    DEMO_TOKEN_ADDRESS, DEMO_VAULT_ADDRESS, EXPECTED_CHAIN_ID,
};
use crate::error::ClientError;
use crate::utils::is_valid_address;

/// Terminal client for the DaiShield privacy vault and governance contracts
#[derive(Debug, Parser)]
#[command(name = "daishield", version, about)]
pub struct Cli {
    /// Vault contract address
    #[arg(long, env = "VAULT_ADDRESS")]
    pub vault_address: Option<String>,

    /// Governance contract address
    #[arg(long, env = "GOVERNANCE_ADDRESS")]
    pub governance_address: Option<String>,

    /// mDAI token contract address
    #[arg(long, env = "MDAI_ADDRESS")]
    pub token_address: Option<String>,

    /// Seconds between background refreshes of on-chain reads
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,

    /// Where tracing output goes; the terminal belongs to the UI
    #[arg(long, default_value = "daishield.log")]
    pub log_file: PathBuf,

    /// Confirmation latency of the simulated ledger
    #[arg(long, default_value_t = DEFAULT_SETTLE_DELAY_MILLIS)]
    pub settle_delay_ms: u64,

    /// Fill unset contract addresses with the simulated deployment
    #[arg(long)]
    pub demo: bool,

    /// Account the simulated wallet signs with
    #[arg(
        long,
        env = "WALLET_ADDRESS",
        default_value = "0x598928d17a9a5dadfaffdaca2e5d2315bd2e9387"
    )]
    pub wallet_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    Vault,
    Governance,
    Token,
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Vault => f.write_str("vault"),
            ContractKind::Governance => f.write_str("governance"),
            ContractKind::Token => f.write_str("token"),
        }
    }
}

/// Raw contract addresses as supplied by the environment. Validated on use.
#[derive(Debug, Clone, Default)]
pub struct ContractAddresses {
    pub vault: Option<String>,
    pub governance: Option<String>,
    pub token: Option<String>,
}

/// Immutable client configuration, shared by the gateway and orchestrators
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub contracts: ContractAddresses,
    pub poll_interval: Duration,
    pub expected_chain_id: u64,
}

impl ClientConfig {
    pub fn new(contracts: ContractAddresses, poll_interval: Duration) -> Self {
        Self {
            contracts,
            poll_interval,
            expected_chain_id: EXPECTED_CHAIN_ID,
        }
    }

    pub fn from_cli(cli: &Cli) -> Self {
        let or_demo = |given: &Option<String>, demo: &str| match given {
            Some(address) => Some(address.clone()),
            None if cli.demo => Some(demo.to_string()),
            None => None,
        };
        let contracts = ContractAddresses {
            vault: or_demo(&cli.vault_address, DEMO_VAULT_ADDRESS),
            governance: or_demo(&cli.governance_address, DEMO_GOVERNANCE_ADDRESS),
            token: or_demo(&cli.token_address, DEMO_TOKEN_ADDRESS),
        };
        Self::new(contracts, Duration::from_secs(cli.poll_interval_secs.max(1)))
    }

    fn raw(&self, kind: ContractKind) -> Option<&str> {
        match kind {
            ContractKind::Vault => self.contracts.vault.as_deref(),
            ContractKind::Governance => self.contracts.governance.as_deref(),
            ContractKind::Token => self.contracts.token.as_deref(),
        }
    }

    /// Resolve a contract address, failing with a configuration error if unset or malformed
    pub fn contract(&self, kind: ContractKind) -> Result<Address, ClientError> {
        match self.raw(kind).map(str::trim) {
            None | Some("") => Err(ClientError::Config(format!(
                "{} contract address is not configured",
                kind
            ))),
            Some(raw) if !is_valid_address(raw) => Err(ClientError::Config(format!(
                "{} contract address '{}' is malformed",
                kind, raw
            ))),
            Some(raw) => Address::parse(raw)
                .map_err(|_| ClientError::Config(format!("{} contract address is malformed", kind))),
        }
    }

    /// Every configuration problem, for the startup banner
    pub fn problems(&self) -> Vec<String> {
        [ContractKind::Vault, ContractKind::Governance, ContractKind::Token]
            .into_iter()
            .filter_map(|kind| self.contract(kind).err())
            .map(|err| err.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vault: Option<&str>) -> ClientConfig {
        ClientConfig::new(
            ContractAddresses {
                vault: vault.map(str::to_string),
                governance: Some("0x3333333333333333333333333333333333333333".to_string()),
                token: Some("0x1111111111111111111111111111111111111111".to_string()),
            },
            Duration::from_secs(10),
        )
    }

    #[test]
    fn missing_and_malformed_are_config_errors() {
        let missing = config(None).contract(ContractKind::Vault).unwrap_err();
        assert!(matches!(missing, ClientError::Config(ref m) if m.contains("not configured")));

        let malformed = config(Some("0x1234")).contract(ContractKind::Vault).unwrap_err();
        assert!(matches!(malformed, ClientError::Config(ref m) if m.contains("malformed")));

        assert_eq!(config(Some("")).problems().len(), 1);
    }

    #[test]
    fn resolves_valid_addresses() {
        let cfg = config(Some("0x2222222222222222222222222222222222222222"));
        assert!(cfg.problems().is_empty());
        assert_eq!(
            cfg.contract(ContractKind::Vault).unwrap().as_str(),
            "0x2222222222222222222222222222222222222222"
        );
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from([
            "daishield",
            "--vault-address",
            "0x2222222222222222222222222222222222222222",
            "--poll-interval-secs",
            "0",
        ]);
        let cfg = ClientConfig::from_cli(&cli);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert!(cfg.contract(ContractKind::Vault).is_ok());
        assert_eq!(cfg.expected_chain_id, EXPECTED_CHAIN_ID);
    }

    #[test]
    fn demo_fills_only_unset_addresses() {
        let cli = Cli::parse_from([
            "daishield",
            "--demo",
            "--token-address",
            "0x1111111111111111111111111111111111111111",
        ]);
        let cfg = ClientConfig::from_cli(&cli);
        assert!(cfg.problems().is_empty());
        assert_eq!(
            cfg.contract(ContractKind::Token).unwrap().as_str(),
            "0x1111111111111111111111111111111111111111"
        );
    }
}
