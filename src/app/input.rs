use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::app::core::App;
use crate::app::ui_state::{InputField, Tab};
use crate::chain::VoteChoice;
use crate::constants::{MAX_DESCRIPTION_LEN, MAX_TITLE_LEN, PROPOSAL_DURATION_SECS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

impl App {
    pub fn handle_key(&mut self, key: KeyEvent) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }
        match key.code {
            KeyCode::Esc if self.composing => self.cancel_compose(),
            KeyCode::Esc => return Control::Quit,
            KeyCode::Tab => self.next_tab(),
            KeyCode::BackTab => self.previous_tab(),
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Up if self.tab == Tab::Proposals && !self.composing => self.previous_item(),
            KeyCode::Down if self.tab == Tab::Proposals && !self.composing => self.next_item(),
            KeyCode::Up | KeyCode::Down => self.next_field(),
            KeyCode::Char(c) if self.accepts(c) => self.type_char(c),
            KeyCode::Char('q') => return Control::Quit,
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Char('c') if self.tab == Tab::Proposals => self.start_compose(),
            KeyCode::Char('y') if self.tab == Tab::Proposals => self.vote_selected(VoteChoice::For),
            KeyCode::Char('n') if self.tab == Tab::Proposals => self.vote_selected(VoteChoice::Against),
            _ => self.clear_message(),
        }
        Control::Continue
    }

    /// Whether `c` is text for the focused input rather than a command
    fn accepts(&self, c: char) -> bool {
        match self.focus {
            Some(InputField::Amount) => c.is_ascii_digit() || c == '.',
            Some(InputField::Recipient) => c.is_ascii_hexdigit() || c == 'x' || c == 'X',
            Some(InputField::Title) | Some(InputField::Description) => self.composing && !c.is_control(),
            None => false,
        }
    }

    fn type_char(&mut self, c: char) {
        match self.focus {
            Some(InputField::Amount) => {
                if let Some(flow) = self.active_flow_mut() {
                    let value = format!("{}{}", flow.amount(), c);
                    flow.set_amount(&value);
                }
            }
            Some(InputField::Recipient) => {
                let value = format!("{}{}", self.transfer.recipient(), c);
                self.transfer.set_recipient(&value);
            }
            Some(InputField::Title) => {
                if self.governance.title().chars().count() < MAX_TITLE_LEN {
                    let value = format!("{}{}", self.governance.title(), c);
                    self.governance.set_title(&value);
                }
            }
            Some(InputField::Description) => {
                if self.governance.description().chars().count() < MAX_DESCRIPTION_LEN {
                    let value = format!("{}{}", self.governance.description(), c);
                    self.governance.set_description(&value);
                }
            }
            None => {}
        }
    }

    fn backspace(&mut self) {
        fn pop(value: &str) -> String {
            let mut value = value.to_string();
            value.pop();
            value
        }
        match self.focus {
            Some(InputField::Amount) => {
                if let Some(flow) = self.active_flow_mut() {
                    let value = pop(flow.amount());
                    flow.set_amount(&value);
                }
            }
            Some(InputField::Recipient) => {
                let value = pop(self.transfer.recipient());
                self.transfer.set_recipient(&value);
            }
            Some(InputField::Title) => {
                let value = pop(self.governance.title());
                self.governance.set_title(&value);
            }
            Some(InputField::Description) => {
                let value = pop(self.governance.description());
                self.governance.set_description(&value);
            }
            None => {}
        }
    }

    /// Enter: the primary action of the current form
    pub fn submit(&mut self) {
        let result = match self.tab {
            Tab::Deposit => self.deposit.primary_action(&self.gateway, &mut self.notifier),
            Tab::Withdraw => self.withdraw.primary_action(&self.gateway, &mut self.notifier),
            Tab::Transfer => self.transfer.primary_action(&self.gateway, &mut self.notifier),
            Tab::Proposals if self.composing => {
                let title = self.governance.title().to_string();
                let description = self.governance.description().to_string();
                self.governance.create_proposal(
                    &self.gateway,
                    &mut self.notifier,
                    &title,
                    &description,
                    PROPOSAL_DURATION_SECS,
                )
            }
            Tab::Dashboard | Tab::Proposals => Ok(()),
        };
        if let Err(err) = result {
            debug!(%err, kind = ?err.kind(), tab = self.tab.title(), "action rejected");
        }
        self.flush_notifications();
    }

    fn vote_selected(&mut self, choice: VoteChoice) {
        let Some(proposal) = self.selected_proposal() else {
            return;
        };
        if let Err(err) = self
            .governance
            .vote(&self.gateway, &mut self.notifier, proposal.id, choice)
        {
            debug!(%err, kind = ?err.kind(), proposal_id = proposal.id, "vote rejected");
        }
        self.flush_notifications();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::app::core::fixtures::{test_app, TestApp};
    use crate::constants::{FN_APPROVE, FN_CREATE_PROPOSAL, FN_VOTE};
    use crate::orchestrator::{MessageType, Phase};
    use crate::transactions::fixtures::drain_tasks;

    fn press(app: &mut App, code: KeyCode) -> Control {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[tokio::test]
    async fn typing_an_amount_and_enter_starts_a_deposit() {
        let TestApp { mut app, chain, .. } = test_app(None);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.tab, Tab::Deposit);

        type_text(&mut app, "12.5q");
        assert_eq!(app.deposit.amount(), "12.5");
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.deposit.amount(), "12.");

        assert_eq!(press(&mut app, KeyCode::Enter), Control::Continue);
        assert_eq!(app.deposit.phase(), Phase::Authorizing);
        assert_eq!(
            app.messages.back().map(|n| n.message_type),
            Some(MessageType::Info)
        );

        drain_tasks().await;
        assert_eq!(chain.sent_calls()[0].function, FN_APPROVE);
    }

    #[tokio::test]
    async fn q_quits_outside_text_inputs() {
        let TestApp { mut app, .. } = test_app(None);
        assert_eq!(press(&mut app, KeyCode::Char('q')), Control::Quit);

        app.select_tab(Tab::Proposals);
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(press(&mut app, KeyCode::Char('q')), Control::Continue);
        assert_eq!(app.governance.title(), "q");
        assert_eq!(press(&mut app, KeyCode::Esc), Control::Continue);
        assert!(!app.composing);
        assert_eq!(press(&mut app, KeyCode::Esc), Control::Quit);
    }

    #[tokio::test]
    async fn compose_and_vote_from_the_proposals_tab() {
        let TestApp { mut app, chain, .. } = test_app(None);
        let id = chain.seed_proposal("Lower fees", "Cut the fee", 3600);
        let now = Instant::now();
        app.tick(now);
        drain_tasks().await;
        app.tick(now);

        app.select_tab(Tab::Proposals);
        assert_eq!(app.selected_proposal().map(|p| p.id), Some(id));
        press(&mut app, KeyCode::Char('y'));
        assert!(!app.governance.can_vote(id));

        press(&mut app, KeyCode::Char('c'));
        type_text(&mut app, "Raise cap");
        press(&mut app, KeyCode::Down);
        type_text(&mut app, "Double the deposit cap");
        press(&mut app, KeyCode::Enter);
        assert!(app.governance.is_creating());

        drain_tasks().await;
        let functions: Vec<String> = chain.sent_calls().into_iter().map(|c| c.function).collect();
        assert_eq!(functions, vec![FN_VOTE.to_string(), FN_CREATE_PROPOSAL.to_string()]);
    }
}
