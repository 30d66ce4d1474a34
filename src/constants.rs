/// Sepolia, the only network the vault and governance contracts are deployed on
pub const EXPECTED_CHAIN_ID: u64 = 11_155_111;
pub const EXPECTED_CHAIN_NAME: &str = "sepolia";

pub const TOKEN_SYMBOL: &str = "mDAI";
pub const NATIVE_SYMBOL: &str = "SEP";
pub const TOKEN_DECIMALS: u32 = 18;

/// Proposals created from the client always run for seven days
pub const PROPOSAL_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_SETTLE_DELAY_MILLIS: u64 = 2_500;
pub const UI_TICK_MILLIS: u64 = 50;
pub const WALLET_CONNECT_DELAY_MILLIS: u64 = 1_200;

pub const MAX_TITLE_LEN: usize = 80;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MESSAGE_AREA_MARGIN: u16 = 4;
pub const MESSAGE_HISTORY: usize = 4;

// Where the simulated deployment lives when running with --demo
pub const DEMO_TOKEN_ADDRESS: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const DEMO_VAULT_ADDRESS: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";
pub const DEMO_GOVERNANCE_ADDRESS: &str = "0x9fe46736679d2d9a65f0992f2272de9f3c7fa6e0";

pub const PREFERENCES_DIR: &str = "daishield";
pub const PREFERENCES_FILE: &str = "preferences.json";

// Contract entry points
pub const FN_APPROVE: &str = "approve";
pub const FN_DEPOSIT: &str = "deposit";
pub const FN_WITHDRAW: &str = "withdraw";
pub const FN_PRIVATE_TRANSACTION: &str = "privateTransaction";
pub const FN_CREATE_PROPOSAL: &str = "createProposal";
pub const FN_VOTE: &str = "vote";

// View functions
pub const FN_BALANCE_OF: &str = "balanceOf";
pub const FN_ALLOWANCE: &str = "allowance";
pub const FN_GET_BALANCE: &str = "getBalance";
pub const FN_GET_ACTIVE_PROPOSALS: &str = "getActiveProposals";
