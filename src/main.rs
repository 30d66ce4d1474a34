use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self as crossterm_event, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod chain;
mod config;
mod constants;
mod error;
mod ledger;
mod orchestrator;
mod transactions;
mod ui;
mod utils;
mod wallet;

use app::{App, Control, Preferences};
use chain::simulated::{SettleMode, SimulatedChain, SimulatedContracts};
use chain::Address;
use config::{Cli, ClientConfig, ContractKind};
use constants::{
    DEMO_GOVERNANCE_ADDRESS, DEMO_TOKEN_ADDRESS, DEMO_VAULT_ADDRESS, EXPECTED_CHAIN_ID,
    PROPOSAL_DURATION_SECS, UI_TICK_MILLIS, WALLET_CONNECT_DELAY_MILLIS,
};
use utils::parse_amount;
use wallet::{ConnectionStatus, LocalWallet, WalletSession};

// Chain the wallet reports before it is asked to switch
const WALLET_START_CHAIN_ID: u64 = 1;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let config = Arc::new(ClientConfig::from_cli(&cli));
    let account = Address::parse(&cli.wallet_address)
        .with_context(|| format!("invalid --wallet-address '{}'", cli.wallet_address))?;
    let chain = Arc::new(simulated_ledger(&config, &cli, &account)?);

    let wallet = Arc::new(LocalWallet::new(WalletSession {
        address: None,
        status: ConnectionStatus::Connecting,
        chain_id: None,
    }));
    {
        let wallet = Arc::clone(&wallet);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(WALLET_CONNECT_DELAY_MILLIS)).await;
            wallet.connect(account, WALLET_START_CHAIN_ID);
        });
    }

    let mut app = App::new(config, wallet, chain, Preferences::default_path());

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        println!("{:?}", err);
    }

    Ok(())
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let file = File::create(&cli.log_file)
        .with_context(|| format!("cannot open log file {}", cli.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// In-process ledger answering at the configured addresses, seeded with
/// a funded account and a couple of open proposals.
fn simulated_ledger(config: &ClientConfig, cli: &Cli, account: &Address) -> Result<SimulatedChain> {
    let at = |kind: ContractKind, demo: &str| match config.contract(kind) {
        Ok(address) => Ok(address),
        Err(_) => Address::parse(demo),
    };
    let contracts = SimulatedContracts {
        token: at(ContractKind::Token, DEMO_TOKEN_ADDRESS)?,
        vault: at(ContractKind::Vault, DEMO_VAULT_ADDRESS)?,
        governance: at(ContractKind::Governance, DEMO_GOVERNANCE_ADDRESS)?,
    };
    let chain = SimulatedChain::new(
        contracts,
        SettleMode::Auto(Duration::from_millis(cli.settle_delay_ms)),
    );

    chain.mint(account, parse_amount("1000")?);
    chain.fund_native(account, parse_amount("0.5")?);
    chain.seed_proposal(
        "Raise the vault deposit cap",
        "Lift the per-account deposit cap from 10,000 to 25,000 mDAI now that the \
         withdrawal queue has been stable for a full epoch.",
        PROPOSAL_DURATION_SECS,
    );
    chain.seed_proposal(
        "Fund a second audit",
        "Allocate treasury funds for an independent review of the shielded transfer path.",
        PROPOSAL_DURATION_SECS / 2,
    );
    info!(
        account = %account,
        expected_chain = EXPECTED_CHAIN_ID,
        "simulated ledger seeded"
    );
    Ok(chain)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick(Instant::now());
        terminal.draw(|f| ui::draw(f, app))?;

        if crossterm_event::poll(Duration::from_millis(UI_TICK_MILLIS))? {
            if let Event::Key(key) = crossterm_event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if app.handle_key(key) == Control::Quit {
                    return Ok(());
                }
            }
        }
    }
}
