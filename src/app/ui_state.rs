use crate::app::core::App;
use crate::chain::Proposal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Deposit,
    Withdraw,
    Transfer,
    Proposals,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Dashboard,
        Tab::Deposit,
        Tab::Withdraw,
        Tab::Transfer,
        Tab::Proposals,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Deposit => "Deposit",
            Tab::Withdraw => "Withdraw",
            Tab::Transfer => "Transfer",
            Tab::Proposals => "Proposals",
        }
    }

    pub fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }
}

/// Which text input receives typed characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Amount,
    Recipient,
    Title,
    Description,
}

impl App {
    pub fn next_tab(&mut self) {
        let next = (self.tab.index() + 1) % Tab::ALL.len();
        self.select_tab(Tab::ALL[next]);
    }

    pub fn previous_tab(&mut self) {
        let len = Tab::ALL.len();
        let prev = (self.tab.index() + len - 1) % len;
        self.select_tab(Tab::ALL[prev]);
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.composing = false;
        self.focus = match tab {
            Tab::Deposit | Tab::Withdraw | Tab::Transfer => Some(InputField::Amount),
            Tab::Dashboard | Tab::Proposals => None,
        };
    }

    /// Cycle between the inputs of the current form
    pub fn next_field(&mut self) {
        self.focus = match (self.tab, self.focus) {
            (Tab::Transfer, Some(InputField::Amount)) => Some(InputField::Recipient),
            (Tab::Transfer, _) => Some(InputField::Amount),
            (Tab::Proposals, Some(InputField::Title)) if self.composing => Some(InputField::Description),
            (Tab::Proposals, _) if self.composing => Some(InputField::Title),
            (_, focus) => focus,
        };
    }

    pub fn start_compose(&mut self) {
        self.composing = true;
        self.focus = Some(InputField::Title);
    }

    pub fn cancel_compose(&mut self) {
        self.composing = false;
        self.focus = None;
    }

    pub fn proposals(&self) -> Vec<Proposal> {
        match &self.queries.proposals {
            Some(query) => self.cache.read(query).proposals().to_vec(),
            None => Vec::new(),
        }
    }

    pub fn selected_proposal(&self) -> Option<Proposal> {
        let proposals = self.proposals();
        self.proposals_state
            .selected()
            .and_then(|i| proposals.get(i).cloned())
    }

    pub fn next_item(&mut self) {
        let len = self.proposals().len();
        if len == 0 {
            return;
        }
        let i = match self.proposals_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            Some(i) => i,
            None => 0,
        };
        self.proposals_state.select(Some(i));
    }

    pub fn previous_item(&mut self) {
        if self.proposals().is_empty() {
            return;
        }
        let i = match self.proposals_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.proposals_state.select(Some(i));
    }

    /// Keep the selection inside the list after it was refetched
    pub(crate) fn clamp_selection(&mut self) {
        let len = self.proposals().len();
        match (len, self.proposals_state.selected()) {
            (0, _) => self.proposals_state.select(None),
            (_, None) => self.proposals_state.select(Some(0)),
            (len, Some(i)) if i >= len => self.proposals_state.select(Some(len - 1)),
            _ => {}
        }
    }
}
