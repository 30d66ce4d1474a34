use std::collections::HashMap;

use tracing::{info, warn};

use super::notify::{Notifier, OperationKey, Outcome};
use super::Attempt;
use crate::chain::{CallArg, VoteChoice};
use crate::config::ContractKind;
use crate::constants::{FN_CREATE_PROPOSAL, FN_VOTE, MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};
use crate::error::{ClientError, Field};
use crate::ledger::{LedgerCache, ReadQuery};
use crate::transactions::{ContractGateway, TxState};

#[derive(Debug, Clone)]
pub struct VoteIntent {
    pub choice: VoteChoice,
    pub attempt: Attempt,
}

/// Proposal creation and voting
#[derive(Debug)]
pub struct GovernanceFlow {
    title: String,
    description: String,
    create: Option<Attempt>,
    create_error: Option<ClientError>,
    votes: HashMap<u64, VoteIntent>,
    recorded: HashMap<u64, VoteChoice>,
    refresh: Vec<ReadQuery>,
}

impl GovernanceFlow {
    pub fn new(refresh: Vec<ReadQuery>) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            create: None,
            create_error: None,
            votes: HashMap::new(),
            recorded: HashMap::new(),
            refresh,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_title(&mut self, value: &str) {
        self.title = value.to_string();
        self.create_error = None;
    }

    pub fn set_description(&mut self, value: &str) {
        self.description = value.to_string();
        self.create_error = None;
    }

    /// Why the last create was rejected locally; cleared by any edit
    pub fn create_error(&self) -> Option<&ClientError> {
        self.create_error.as_ref()
    }

    pub fn create_attempt(&self) -> Option<&Attempt> {
        self.create.as_ref()
    }

    pub fn is_creating(&self) -> bool {
        self.create.as_ref().map_or(false, Attempt::is_live)
    }

    pub fn vote_intent(&self, proposal_id: u64) -> Option<&VoteIntent> {
        self.votes.get(&proposal_id)
    }

    pub fn recorded_vote(&self, proposal_id: u64) -> Option<VoteChoice> {
        self.recorded.get(&proposal_id).copied()
    }

    pub fn attempt_keys(&self) -> impl Iterator<Item = OperationKey> + '_ {
        self.create
            .iter()
            .chain(self.votes.values().map(|intent| &intent.attempt))
            .map(|attempt| attempt.key)
    }

    /// Whether the UI should offer vote buttons for this proposal
    pub fn can_vote(&self, proposal_id: u64) -> bool {
        !self.recorded.contains_key(&proposal_id)
            && self.votes.get(&proposal_id).map_or(true, |intent| !intent.attempt.is_live())
    }

    pub fn create_proposal(
        &mut self,
        gateway: &ContractGateway,
        notifier: &mut Notifier,
        title: &str,
        description: &str,
        duration_secs: u64,
    ) -> Result<(), ClientError> {
        let result = self.submit_proposal(gateway, notifier, title, description, duration_secs);
        if let Err(err) = &result {
            notifier.error(err.to_string());
        }
        self.create_error = result.as_ref().err().cloned();
        result
    }

    fn submit_proposal(
        &mut self,
        gateway: &ContractGateway,
        notifier: &mut Notifier,
        title: &str,
        description: &str,
        duration_secs: u64,
    ) -> Result<(), ClientError> {
        if self.is_creating() {
            return Err(ClientError::InFlight);
        }
        let title = title.trim();
        let description = description.trim();
        if title.is_empty() {
            return Err(ClientError::validation(Field::Title, "cannot be empty"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ClientError::validation(
                Field::Title,
                format!("must be at most {MAX_TITLE_LEN} characters"),
            ));
        }
        if description.is_empty() {
            return Err(ClientError::validation(Field::Description, "cannot be empty"));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ClientError::validation(
                Field::Description,
                format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
            ));
        }

        let handle = gateway.submit(
            ContractKind::Governance,
            FN_CREATE_PROPOSAL,
            vec![
                CallArg::Str(title.to_string()),
                CallArg::Str(description.to_string()),
                CallArg::Uint(u128::from(duration_secs)),
            ],
        );
        if let Some(err @ ClientError::Config(_)) = handle.error() {
            return Err(err);
        }
        info!(title, duration_secs, "proposal creation submitted");
        self.create = Some(Attempt::new(notifier.next_key(), handle));
        notifier.info("Proposal transaction submitted");
        Ok(())
    }

    pub fn vote(
        &mut self,
        gateway: &ContractGateway,
        notifier: &mut Notifier,
        proposal_id: u64,
        choice: VoteChoice,
    ) -> Result<(), ClientError> {
        let result = self.submit_vote(gateway, notifier, proposal_id, choice);
        if let Err(err) = &result {
            notifier.error(err.to_string());
        }
        result
    }

    fn submit_vote(
        &mut self,
        gateway: &ContractGateway,
        notifier: &mut Notifier,
        proposal_id: u64,
        choice: VoteChoice,
    ) -> Result<(), ClientError> {
        if self.votes.get(&proposal_id).map_or(false, |intent| intent.attempt.is_live()) {
            return Err(ClientError::InFlight);
        }
        if let Some(previous) = self.recorded.get(&proposal_id) {
            return Err(ClientError::validation(
                Field::Proposal,
                format!("already voted {previous} on proposal #{proposal_id}"),
            ));
        }

        let handle = gateway.submit(
            ContractKind::Governance,
            FN_VOTE,
            vec![CallArg::Uint(u128::from(proposal_id)), choice.as_arg()],
        );
        if let Some(err @ ClientError::Config(_)) = handle.error() {
            return Err(err);
        }
        info!(proposal_id, %choice, "vote submitted");
        let attempt = Attempt::new(notifier.next_key(), handle);
        self.votes.insert(proposal_id, VoteIntent { choice, attempt });
        notifier.info(format!("Vote {choice} on proposal #{proposal_id} submitted"));
        Ok(())
    }

    /// Fold handle transitions in. Side effects run once per attempt, keyed by its notification.
    pub fn sync(&mut self, notifier: &mut Notifier, cache: &mut LedgerCache) {
        self.sync_create(notifier, cache);
        self.sync_votes(notifier, cache);
    }

    fn sync_create(&mut self, notifier: &mut Notifier, cache: &mut LedgerCache) {
        let Some(attempt) = &self.create else {
            return;
        };
        match attempt.state() {
            TxState::Confirmed => {
                if notifier.fire_once(attempt.key, Outcome::Confirmed, "Proposal created") {
                    info!("proposal creation confirmed");
                    self.title.clear();
                    self.description.clear();
                    self.invalidate_all(cache);
                }
            }
            TxState::Failed => {
                let message = match attempt.handle.error() {
                    Some(err) => format!("Proposal creation failed: {err}"),
                    None => "Proposal creation failed".to_string(),
                };
                if notifier.fire_once(attempt.key, Outcome::Failed, message) {
                    warn!(error = ?attempt.handle.error(), "proposal creation failed");
                }
            }
            TxState::Unsent | TxState::Submitted | TxState::Pending => {}
        }
    }

    fn sync_votes(&mut self, notifier: &mut Notifier, cache: &mut LedgerCache) {
        let mut confirmed = Vec::new();
        let mut failed = Vec::new();
        for (&id, intent) in &self.votes {
            match intent.attempt.state() {
                TxState::Confirmed => confirmed.push(id),
                TxState::Failed => failed.push(id),
                TxState::Unsent | TxState::Submitted | TxState::Pending => {}
            }
        }

        for id in confirmed {
            let Some(intent) = self.votes.get(&id) else {
                continue;
            };
            let message = format!("Voted {} on proposal #{id}", intent.choice);
            if notifier.fire_once(intent.attempt.key, Outcome::Confirmed, message) {
                info!(proposal_id = id, choice = %intent.choice, "vote confirmed");
                self.recorded.insert(id, intent.choice);
                self.invalidate_all(cache);
            }
        }

        for id in failed {
            // Dropping the intent clears the in-flight marker so the user can retry
            let Some(intent) = self.votes.remove(&id) else {
                continue;
            };
            let message = match intent.attempt.handle.error() {
                Some(err) => format!("Vote on proposal #{id} failed: {err}"),
                None => format!("Vote on proposal #{id} failed"),
            };
            if notifier.fire_once(intent.attempt.key, Outcome::Failed, message) {
                warn!(proposal_id = id, error = ?intent.attempt.handle.error(), "vote failed");
            }
        }
    }

    fn invalidate_all(&self, cache: &mut LedgerCache) {
        for query in &self.refresh {
            cache.invalidate(query);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::chain::ContractCaller;
    use crate::constants::PROPOSAL_DURATION_SECS;
    use crate::orchestrator::MessageType;
    use crate::transactions::fixtures::{drain_tasks, harness, Harness};

    fn setup(h: &Harness) -> (GovernanceFlow, LedgerCache, ReadQuery) {
        let query = ReadQuery::active_proposals(h.gateway.config()).unwrap();
        let cache = LedgerCache::new(
            h.chain.clone() as Arc<dyn ContractCaller>,
            Duration::from_secs(10),
        );
        (GovernanceFlow::new(vec![query.clone()]), cache, query)
    }

    fn successes(notifier: &mut Notifier) -> Vec<String> {
        notifier
            .drain()
            .into_iter()
            .filter(|n| n.message_type == MessageType::Success)
            .map(|n| n.message)
            .collect()
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_locally() {
        let h = harness();
        let (mut flow, _, _) = setup(&h);
        let mut notifier = Notifier::new();

        let err = flow
            .create_proposal(&h.gateway, &mut notifier, "Lower fees", "   ", PROPOSAL_DURATION_SECS)
            .unwrap_err();
        assert_eq!(err.field(), Some(Field::Description));
        let err = flow
            .create_proposal(&h.gateway, &mut notifier, "", "Cut the fee", PROPOSAL_DURATION_SECS)
            .unwrap_err();
        assert_eq!(err.field(), Some(Field::Title));
        assert_eq!(flow.create_error().and_then(ClientError::field), Some(Field::Title));

        flow.set_title("Lower fees");
        assert!(flow.create_error().is_none());
        assert!(flow.create_attempt().is_none());
        drain_tasks().await;
        assert!(h.chain.sent_calls().is_empty());
    }

    #[tokio::test]
    async fn created_proposal_refreshes_list_and_clears_fields() {
        let h = harness();
        let (mut flow, mut cache, query) = setup(&h);
        let mut notifier = Notifier::new();
        let start = Instant::now();

        cache.watch(&query);
        cache.poll(start);
        cache.settle_one(start).await;
        assert!(cache.read(&query).proposals().is_empty());

        flow.set_title("Lower fees");
        flow.set_description("Cut the vault fee to 0.1%");
        let (title, description) = (flow.title().to_string(), flow.description().to_string());
        flow.create_proposal(&h.gateway, &mut notifier, &title, &description, PROPOSAL_DURATION_SECS)
            .unwrap();
        assert!(matches!(
            flow.create_proposal(&h.gateway, &mut notifier, &title, &description, PROPOSAL_DURATION_SECS),
            Err(ClientError::InFlight)
        ));

        let mut handle = flow.create_attempt().unwrap().handle.clone();
        handle.reached(TxState::Pending).await;
        let sent = h.chain.sent_calls();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].function, FN_CREATE_PROPOSAL);
        assert_eq!(
            sent[0].args,
            vec![
                CallArg::Str("Lower fees".to_string()),
                CallArg::Str("Cut the vault fee to 0.1%".to_string()),
                CallArg::Uint(604_800),
            ]
        );

        h.chain.settle_next();
        handle.settled().await;
        flow.sync(&mut notifier, &mut cache);
        flow.sync(&mut notifier, &mut cache);
        assert_eq!(flow.title(), "");
        assert_eq!(flow.description(), "");
        assert_eq!(successes(&mut notifier), vec!["Proposal created".to_string()]);

        // Typing a new draft is not wiped by later syncs
        flow.set_title("Next");
        flow.sync(&mut notifier, &mut cache);
        assert_eq!(flow.title(), "Next");

        assert_eq!(cache.poll(start), 1, "invalidated list is fetched again");
        cache.settle_one(start).await;
        let proposals = cache.read(&query).proposals().to_vec();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].title, "Lower fees");
    }

    #[tokio::test]
    async fn failed_create_keeps_fields_and_allows_retry() {
        let h = harness();
        let (mut flow, mut cache, _) = setup(&h);
        let mut notifier = Notifier::new();

        flow.set_title("Lower fees");
        flow.set_description("Cut the vault fee");
        flow.create_proposal(&h.gateway, &mut notifier, "Lower fees", "Cut the vault fee", PROPOSAL_DURATION_SECS)
            .unwrap();
        let first_key = flow.create_attempt().unwrap().key;
        let mut handle = flow.create_attempt().unwrap().handle.clone();
        handle.reached(TxState::Pending).await;
        notifier.drain();

        h.chain.revert_next("Title already used");
        assert_eq!(handle.settled().await, TxState::Failed);
        flow.sync(&mut notifier, &mut cache);
        flow.sync(&mut notifier, &mut cache);

        let messages = notifier.drain();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, MessageType::Error);
        assert!(messages[0].message.contains("Title already used"));
        assert_eq!(flow.title(), "Lower fees");
        assert_eq!(flow.description(), "Cut the vault fee");
        assert!(!flow.is_creating());

        flow.create_proposal(&h.gateway, &mut notifier, "Lower fees", "Cut the vault fee", PROPOSAL_DURATION_SECS)
            .unwrap();
        assert_ne!(flow.create_attempt().unwrap().key, first_key);
        assert!(flow.is_creating());
        drain_tasks().await;
        assert_eq!(h.chain.sent_calls().len(), 2);
    }

    #[tokio::test]
    async fn second_vote_on_same_proposal_is_rejected_while_pending() {
        let h = harness();
        let (mut flow, mut cache, _) = setup(&h);
        let mut notifier = Notifier::new();
        let id = h.chain.seed_proposal("Lower fees", "Cut the fee", 3600);

        flow.vote(&h.gateway, &mut notifier, id, VoteChoice::For).unwrap();
        assert!(!flow.can_vote(id));
        let err = flow
            .vote(&h.gateway, &mut notifier, id, VoteChoice::Against)
            .unwrap_err();
        assert_eq!(err, ClientError::InFlight);

        let mut handle = flow.vote_intent(id).unwrap().attempt.handle.clone();
        handle.reached(TxState::Pending).await;
        assert_eq!(h.chain.sent_calls().len(), 1);

        h.chain.settle_next();
        handle.settled().await;
        flow.sync(&mut notifier, &mut cache);
        flow.sync(&mut notifier, &mut cache);
        assert_eq!(flow.recorded_vote(id), Some(VoteChoice::For));
        assert_eq!(successes(&mut notifier), vec![format!("Voted For on proposal #{id}")]);

        // A recorded vote is final
        let err = flow.vote(&h.gateway, &mut notifier, id, VoteChoice::For).unwrap_err();
        assert_eq!(err.field(), Some(Field::Proposal));
        drain_tasks().await;
        assert_eq!(h.chain.sent_calls().len(), 1);
    }

    #[tokio::test]
    async fn votes_on_different_proposals_resolve_independently() {
        let h = harness();
        let (mut flow, mut cache, _) = setup(&h);
        let mut notifier = Notifier::new();
        let first = h.chain.seed_proposal("A", "first", 3600);
        let second = h.chain.seed_proposal("B", "second", 3600);

        flow.vote(&h.gateway, &mut notifier, first, VoteChoice::For).unwrap();
        flow.vote(&h.gateway, &mut notifier, second, VoteChoice::Against).unwrap();
        let mut a = flow.vote_intent(first).unwrap().attempt.handle.clone();
        let mut b = flow.vote_intent(second).unwrap().attempt.handle.clone();
        a.reached(TxState::Pending).await;
        b.reached(TxState::Pending).await;
        notifier.drain();

        h.chain.revert_next("Voting period has ended");
        a.settled().await;
        flow.sync(&mut notifier, &mut cache);
        assert!(flow.vote_intent(first).is_none(), "failed intent is cleared for retry");
        assert!(flow.can_vote(first));
        assert_eq!(flow.vote_intent(second).unwrap().attempt.state(), TxState::Pending);

        h.chain.settle_next();
        b.settled().await;
        flow.sync(&mut notifier, &mut cache);
        assert_eq!(flow.recorded_vote(second), Some(VoteChoice::Against));
        assert_eq!(flow.recorded_vote(first), None);

        let messages = notifier.drain();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_type, MessageType::Error);
        assert_eq!(messages[1].message_type, MessageType::Success);

        // Retry after failure is a fresh attempt
        flow.vote(&h.gateway, &mut notifier, first, VoteChoice::For).unwrap();
        assert!(flow.vote_intent(first).unwrap().attempt.is_live());
    }
}
