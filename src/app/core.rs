use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ratatui::widgets::ListState;
use tracing::{debug, info, warn};

use super::preferences::{Preferences, Theme};
use super::ui_state::{InputField, Tab};
use crate::chain::{Address, ContractCaller};
use crate::config::ClientConfig;
use crate::ledger::{LedgerCache, ReadQuery, ReadView};
use crate::constants::MESSAGE_HISTORY;
use crate::orchestrator::{
    FlowKind, GovernanceFlow, MessageType, Notification, Notifier, OperationKey, VaultFlow,
};
use crate::transactions::ContractGateway;
use crate::wallet::{WalletProvider, WalletSession};

/// Reads shown for the connected account
#[derive(Debug, Clone, Default)]
pub struct AccountQueries {
    pub native: Option<ReadQuery>,
    pub token: Option<ReadQuery>,
    pub vault: Option<ReadQuery>,
    pub allowance: Option<ReadQuery>,
    pub proposals: Option<ReadQuery>,
}

impl AccountQueries {
    /// Queries whose contract address is unusable are left out; the config banner covers them
    pub fn for_account(config: &ClientConfig, owner: Option<&Address>) -> Self {
        let proposals = ReadQuery::active_proposals(config).ok();
        let Some(owner) = owner else {
            return Self {
                proposals,
                ..Self::default()
            };
        };
        Self {
            native: Some(ReadQuery::native_balance(owner)),
            token: ReadQuery::token_balance(config, owner).ok(),
            vault: ReadQuery::vault_balance(config, owner).ok(),
            allowance: ReadQuery::allowance(config, owner).ok(),
            proposals,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &ReadQuery> {
        [
            &self.native,
            &self.token,
            &self.vault,
            &self.allowance,
            &self.proposals,
        ]
        .into_iter()
        .flatten()
    }

    fn collect(queries: &[&Option<ReadQuery>]) -> Vec<ReadQuery> {
        queries.iter().filter_map(|q| (*q).clone()).collect()
    }

    fn flows(&self) -> (VaultFlow, VaultFlow, VaultFlow, GovernanceFlow) {
        (
            VaultFlow::new(
                FlowKind::Deposit,
                Self::collect(&[&self.token, &self.vault, &self.allowance]),
            ),
            VaultFlow::new(FlowKind::Withdraw, Self::collect(&[&self.token, &self.vault])),
            VaultFlow::new(FlowKind::Transfer, Self::collect(&[&self.vault])),
            GovernanceFlow::new(Self::collect(&[&self.proposals])),
        )
    }
}

pub struct App {
    pub config: Arc<ClientConfig>,
    pub wallet: Arc<dyn WalletProvider>,
    pub gateway: ContractGateway,
    pub cache: LedgerCache,
    pub notifier: Notifier,
    pub session: WalletSession,
    pub queries: AccountQueries,
    pub deposit: VaultFlow,
    pub withdraw: VaultFlow,
    pub transfer: VaultFlow,
    pub governance: GovernanceFlow,
    pub tab: Tab,
    pub focus: Option<InputField>,
    pub composing: bool,
    pub proposals_state: ListState,
    pub theme: Theme,
    pub preferences_path: Option<PathBuf>,
    pub config_problems: Vec<String>,
    pub switch_requested_for: Option<u64>,
    /// Most recent last; several outcomes can land in one tick
    pub messages: VecDeque<Notification>,
}

impl App {
    pub fn new(
        config: Arc<ClientConfig>,
        wallet: Arc<dyn WalletProvider>,
        caller: Arc<dyn ContractCaller>,
        preferences_path: Option<PathBuf>,
    ) -> App {
        let gateway = ContractGateway::new(
            Arc::clone(&config),
            Arc::clone(&wallet),
            Arc::clone(&caller),
        );
        let cache = LedgerCache::new(caller, config.poll_interval);
        let session = wallet.session();
        let queries = AccountQueries::for_account(&config, session.address.as_ref());
        let (deposit, withdraw, transfer, governance) = queries.flows();
        let theme = preferences_path
            .as_deref()
            .map(Preferences::load)
            .unwrap_or_default()
            .theme;
        let config_problems = config.problems();
        for problem in &config_problems {
            warn!(%problem, "configuration problem");
        }

        App {
            config,
            wallet,
            gateway,
            cache,
            notifier: Notifier::new(),
            session,
            queries,
            deposit,
            withdraw,
            transfer,
            governance,
            tab: Tab::Dashboard,
            focus: None,
            composing: false,
            proposals_state: ListState::default(),
            theme,
            preferences_path,
            config_problems,
            switch_requested_for: None,
            messages: VecDeque::new(),
        }
    }

    pub fn clear_message(&mut self) {
        self.messages.clear();
    }

    pub fn set_message(&mut self, message_type: MessageType, message: String) {
        self.messages.push_back(Notification {
            message_type,
            message,
        });
        while self.messages.len() > MESSAGE_HISTORY {
            self.messages.pop_front();
        }
    }

    /// One turn of the event loop: observe the wallet, poll reads, fold in transaction updates
    pub fn tick(&mut self, now: Instant) {
        let session = self.wallet.session();
        self.enforce_network(&session);
        if session.address != self.session.address || session.chain_id != self.session.chain_id {
            self.on_context_change(&session);
        }
        self.session = session;

        for query in self.queries.all() {
            self.cache.watch(query);
        }
        let started = self.cache.poll(now);
        if started > 0 {
            debug!(started, "reads started");
        }

        self.deposit.sync(&mut self.notifier, &mut self.cache);
        self.withdraw.sync(&mut self.notifier, &mut self.cache);
        self.transfer.sync(&mut self.notifier, &mut self.cache);
        self.governance.sync(&mut self.notifier, &mut self.cache);
        let held = self.held_attempts();
        self.notifier.retain_fired(held);
        self.clamp_selection();
        self.flush_notifications();
    }

    /// Account or network changed: nothing read or submitted for the old context applies
    fn on_context_change(&mut self, session: &WalletSession) {
        info!(
            address = ?session.address.as_ref().map(Address::as_str),
            chain_id = ?session.chain_id,
            "wallet context changed"
        );
        self.cache.reset();
        self.queries = AccountQueries::for_account(&self.config, session.address.as_ref());
        let (deposit, withdraw, transfer, governance) = self.queries.flows();
        self.deposit = deposit;
        self.withdraw = withdraw;
        self.transfer = transfer;
        self.governance = governance;
        self.proposals_state.select(None);
        self.composing = false;
    }

    /// Keys of every attempt a flow still observes
    fn held_attempts(&self) -> Vec<OperationKey> {
        self.deposit
            .attempt_keys()
            .chain(self.withdraw.attempt_keys())
            .chain(self.transfer.attempt_keys())
            .chain(self.governance.attempt_keys())
            .collect()
    }

    pub(crate) fn flush_notifications(&mut self) {
        for notification in self.notifier.drain() {
            self.set_message(notification.message_type, notification.message);
        }
    }

    pub fn read(&self, query: &Option<ReadQuery>) -> Option<ReadView> {
        query.as_ref().map(|q| self.cache.read(q))
    }

    pub fn flow(&self, kind: FlowKind) -> &VaultFlow {
        match kind {
            FlowKind::Deposit => &self.deposit,
            FlowKind::Withdraw => &self.withdraw,
            FlowKind::Transfer => &self.transfer,
        }
    }

    pub fn active_flow_kind(&self) -> Option<FlowKind> {
        match self.tab {
            Tab::Deposit => Some(FlowKind::Deposit),
            Tab::Withdraw => Some(FlowKind::Withdraw),
            Tab::Transfer => Some(FlowKind::Transfer),
            Tab::Dashboard | Tab::Proposals => None,
        }
    }

    pub(crate) fn active_flow_mut(&mut self) -> Option<&mut VaultFlow> {
        match self.tab {
            Tab::Deposit => Some(&mut self.deposit),
            Tab::Withdraw => Some(&mut self.withdraw),
            Tab::Transfer => Some(&mut self.transfer),
            Tab::Dashboard | Tab::Proposals => None,
        }
    }

    /// Ask every shown read to refetch on the next tick
    pub fn refresh(&mut self) {
        for query in self.queries.all() {
            self.cache.invalidate(query);
        }
        self.set_message(MessageType::Info, "Refreshing on-chain data".to_string());
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        let Some(path) = &self.preferences_path else {
            return;
        };
        let prefs = Preferences { theme: self.theme };
        if let Err(e) = prefs.save(path) {
            warn!(error = %e, "failed to persist theme");
            self.set_message(MessageType::Error, format!("Failed to save theme: {}", e));
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::chain::simulated::fixtures::{bob, UNIT};
    use crate::chain::VoteChoice;
    use crate::constants::EXPECTED_CHAIN_ID;
    use crate::orchestrator::Phase;
    use crate::transactions::fixtures::drain_tasks;

    #[tokio::test]
    async fn tick_loads_balances_for_connected_account() {
        let TestApp { mut app, .. } = test_app(None);
        let now = Instant::now();

        app.tick(now);
        let token = app.read(&app.queries.token.clone()).unwrap();
        assert!(token.is_loading);

        drain_tasks().await;
        app.tick(now);
        let token = app.read(&app.queries.token.clone()).unwrap();
        assert!(!token.is_loading);
        assert_eq!(token.amount(), 1_000 * UNIT);
    }

    #[tokio::test]
    async fn account_change_discards_flows_and_reads() {
        let TestApp {
            mut app,
            chain,
            wallet,
        } = test_app(None);
        let now = Instant::now();
        app.tick(now);

        app.select_tab(Tab::Deposit);
        app.deposit.set_amount("5");
        app.submit();
        assert_eq!(app.deposit.phase(), Phase::Authorizing);

        wallet.connect(bob(), EXPECTED_CHAIN_ID);
        app.tick(now);
        assert_eq!(app.deposit.phase(), Phase::Idle);
        assert_eq!(app.deposit.amount(), "");

        // The old approval still mines, but nobody is listening any more
        drain_tasks().await;
        chain.settle_next();
        drain_tasks().await;
        app.clear_message();
        app.tick(now);
        assert_eq!(app.deposit.phase(), Phase::Idle);
        assert!(app.messages.is_empty());

        drain_tasks().await;
        app.tick(now);
        let token = app.read(&app.queries.token.clone()).unwrap();
        assert_eq!(token.amount(), 0, "bob holds no tokens");
    }

    #[tokio::test]
    async fn theme_toggle_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        let TestApp { mut app, .. } = test_app(Some(path.clone()));
        assert_eq!(app.theme, Theme::Light);

        app.toggle_theme();
        assert_eq!(Preferences::load(&path).theme, Theme::Dark);

        let TestApp { app: reopened, .. } = test_app(Some(path));
        assert_eq!(reopened.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn outcomes_landing_in_one_tick_are_all_shown() {
        let TestApp { mut app, chain, .. } = test_app(None);
        let first = chain.seed_proposal("Lower fees", "Cut the fee", 3600);
        let second = chain.seed_proposal("Raise cap", "Double the cap", 3600);
        let now = Instant::now();
        app.tick(now);

        app.governance
            .vote(&app.gateway, &mut app.notifier, first, VoteChoice::For)
            .unwrap();
        app.governance
            .vote(&app.gateway, &mut app.notifier, second, VoteChoice::Against)
            .unwrap();
        drain_tasks().await;
        app.tick(now);
        app.clear_message();

        chain.settle_next();
        chain.settle_next();
        drain_tasks().await;
        app.tick(now);

        let shown: Vec<&str> = app.messages.iter().map(|n| n.message.as_str()).collect();
        let voted_first = format!("Voted For on proposal #{first}");
        let voted_second = format!("Voted Against on proposal #{second}");
        assert!(shown.contains(&voted_first.as_str()), "{shown:?}");
        assert!(shown.contains(&voted_second.as_str()), "{shown:?}");
        assert!(app
            .messages
            .iter()
            .all(|n| n.message_type == MessageType::Success));

        // Re-observing the confirmed votes adds nothing
        app.tick(now);
        assert_eq!(app.messages.len(), 2);
    }

    #[tokio::test]
    async fn message_history_is_bounded() {
        let TestApp { mut app, .. } = test_app(None);
        for n in 0..MESSAGE_HISTORY + 3 {
            app.set_message(MessageType::Info, format!("message {n}"));
        }
        assert_eq!(app.messages.len(), MESSAGE_HISTORY);
        assert_eq!(
            app.messages.back().map(|n| n.message.clone()),
            Some(format!("message {}", MESSAGE_HISTORY + 2))
        );
    }

    #[tokio::test]
    async fn fired_keys_are_dropped_with_their_attempts() {
        let TestApp { mut app, chain, .. } = test_app(None);
        let now = Instant::now();
        app.tick(now);

        app.select_tab(Tab::Withdraw);
        app.withdraw.set_amount("1");
        app.submit();
        let key = app.withdraw.action().unwrap().key;
        drain_tasks().await;
        chain.revert_next("Insufficient vault balance");
        drain_tasks().await;
        app.tick(now);
        assert!(app.notifier.has_fired(key));

        // A new attempt replaces the failed one, which nobody observes any more
        app.withdraw.set_amount("2");
        app.submit();
        assert_ne!(app.withdraw.action().unwrap().key, key);
        app.tick(now);
        assert!(!app.notifier.has_fired(key));
    }
}
