//! Runtime for executing conversations
//!
//! Each conversation runs as its own task owning its state; handles talk to
//! it over channels. Conversations share nothing mutable.

mod actions;
mod executor;

#[cfg(test)]
pub mod testing;

pub use actions::{ActionError, ActionRouter};
pub use executor::{Command, ConversationRuntime, RuntimeChannels};

use crate::agent::AgentBoundary;
use crate::conversation::{ConvState, ConversationStore, Event, TransitionError, Turn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tokio_util::sync::CancellationToken;

/// Runtime used by the server
pub type ProductionRuntime = ConversationRuntime<dyn AgentBoundary>;

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Init {
        turns: Vec<Turn>,
        state: ConvState,
    },
    Turn {
        index: usize,
        turn: Turn,
    },
    StateChange {
        state: ConvState,
    },
    AgentDone,
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Conversation is closed")]
    Closed,
}

/// Handle to interact with a running conversation
#[derive(Debug, Clone)]
pub struct ConversationHandle {
    id: String,
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    state_rx: watch::Receiver<ConvState>,
    store: ConversationStore,
    actions: ActionRouter,
    cancel: CancellationToken,
}

impl ConversationHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Submit user text. Fails with `AgentBusy` while a reply is pending.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SubmitError> {
        if self.is_closed() {
            return Err(SubmitError::Closed);
        }
        executor::send_event(&self.command_tx, Event::user_submit(text)).await
    }

    /// Trigger a widget action through the conversation's router
    pub async fn invoke_action(&self, tool_name: &str, args: Value) -> Result<(), ActionError> {
        self.actions.invoke(tool_name, args).await
    }

    #[cfg(test)]
    pub fn actions(&self) -> &ActionRouter {
        &self.actions
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn state(&self) -> ConvState {
        *self.state_rx.borrow()
    }

    #[cfg(test)]
    pub fn state_watch(&self) -> watch::Receiver<ConvState> {
        self.state_rx.clone()
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.store.snapshot()
    }

    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Manager for all conversation runtimes
pub struct RuntimeManager {
    agent: Arc<dyn AgentBoundary>,
    agent_timeout: Option<Duration>,
    runtimes: RwLock<HashMap<String, ConversationHandle>>,
}

impl RuntimeManager {
    pub fn new(agent: Arc<dyn AgentBoundary>, agent_timeout: Option<Duration>) -> Self {
        Self {
            agent,
            agent_timeout,
            runtimes: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new, empty conversation
    pub async fn create(&self) -> ConversationHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (state_tx, state_rx) = watch::channel(ConvState::Idle);
        let store = ConversationStore::new();
        let actions = ActionRouter::new();
        let cancel = CancellationToken::new();

        let runtime: ProductionRuntime = ConversationRuntime::new(
            id.clone(),
            store.clone(),
            self.agent.clone(),
            RuntimeChannels {
                command_tx: command_tx.clone(),
                command_rx,
                broadcast_tx: broadcast_tx.clone(),
                state_tx,
            },
            actions.clone(),
            cancel.clone(),
        )
        .with_agent_timeout(self.agent_timeout);

        let handle = ConversationHandle {
            id: id.clone(),
            command_tx,
            broadcast_tx,
            state_rx,
            store,
            actions,
            cancel,
        };
        let active = {
            let mut runtimes = self.runtimes.write().await;
            runtimes.insert(id.clone(), handle.clone());
            runtimes.len()
        };

        tokio::spawn(runtime.run());
        tracing::info!(conv_id = %id, active, "Created conversation");
        handle
    }

    pub async fn get(&self, id: &str) -> Option<ConversationHandle> {
        self.runtimes.read().await.get(id).cloned()
    }

    /// Stop a conversation's task and forget it. Returns false if unknown.
    pub async fn close(&self, id: &str) -> bool {
        let Some(handle) = self.runtimes.write().await.remove(id) else {
            return false;
        };
        handle.close();
        tracing::info!(conv_id = %id, "Closed conversation");
        true
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.runtimes.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Stop every conversation
    pub async fn shutdown(&self) {
        for (_, handle) in self.runtimes.write().await.drain() {
            handle.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{GatedAgentBoundary, MockAgentBoundary};
    use super::*;
    use crate::agent::{AgentError, AgentReply, Part};
    use crate::conversation::{Role, AGENT_FAILURE_TEXT, WIDGET_CONFIRMATION_TEXT};
    use crate::tools::widget::generate_widget;
    use crate::catalog::Catalog;
    use serde_json::json;

    async fn wait_idle(handle: &ConversationHandle) {
        let mut state = handle.state_watch();
        tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == ConvState::Idle))
            .await
            .expect("conversation did not return to idle")
            .unwrap();
    }

    async fn wait_for_bound(router: &ActionRouter) {
        for _ in 0..100 {
            if router.is_bound() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("router never bound");
    }

    #[tokio::test]
    async fn test_submit_and_reply() {
        let agent = Arc::new(MockAgentBoundary::new());
        agent.queue_reply(AgentReply::from_parts(vec![Part::text("Which category?")]));
        let manager = RuntimeManager::new(agent.clone(), None);
        let handle = manager.create().await;
        let mut events = handle.subscribe();

        handle.submit("I need internet").await.unwrap();
        wait_idle(&handle).await;

        let turns = handle.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Turn::user("I need internet"));
        assert_eq!(turns[1].role, Role::Agent);
        assert_eq!(turns[1].text(), "Which category?");

        // The agent saw the user turn
        let requests = agent.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].history, vec![Turn::user("I need internet")]);

        let mut kinds = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
                .await
                .expect("no agent_done event")
                .unwrap();
            let done = matches!(event, SseEvent::AgentDone);
            kinds.push(event);
            if done {
                break;
            }
        }
        assert!(matches!(kinds[0], SseEvent::Turn { index: 0, .. }));
        assert!(kinds.iter().any(|e| matches!(e, SseEvent::Turn { index: 1, .. })));
    }

    #[tokio::test]
    async fn test_busy_rejects_second_submit() {
        let agent = Arc::new(GatedAgentBoundary::new());
        agent.queue_reply(AgentReply::from_parts(vec![Part::text("done")]));
        let manager = RuntimeManager::new(agent.clone(), None);
        let handle = manager.create().await;

        handle.submit("first").await.unwrap();
        assert_eq!(handle.state(), ConvState::AwaitingAgent);

        let err = handle.submit("second").await.unwrap_err();
        assert_eq!(err, SubmitError::Rejected(TransitionError::AgentBusy));

        agent.release();
        wait_idle(&handle).await;

        // The rejected submission left no trace in the transcript
        let texts: Vec<_> = handle.turns().iter().map(|t| t.text().to_string()).collect();
        assert_eq!(texts, vec!["first", "done"]);
        assert_eq!(agent.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_appends_one_error_turn() {
        let agent = Arc::new(MockAgentBoundary::new());
        agent.queue_error(AgentError::network("connection refused"));
        agent.queue_reply(AgentReply::from_parts(vec![Part::text("back online")]));
        let manager = RuntimeManager::new(agent.clone(), None);
        let handle = manager.create().await;

        handle.submit("hello").await.unwrap();
        wait_idle(&handle).await;

        let turns = handle.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1], Turn::error(AGENT_FAILURE_TEXT));

        // Recovery is just the next submission
        handle.submit("hello again").await.unwrap();
        wait_idle(&handle).await;
        assert_eq!(handle.turns().len(), 4);

        // Error turns are part of the transcript sent to the agent
        let history = &agent.recorded_requests()[1].history;
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, Role::Error);
    }

    #[tokio::test]
    async fn test_widget_action_reenters_conversation() {
        let catalog = Catalog::mock();
        let offers = catalog.category("home").unwrap().offers.clone();
        let widget = serde_json::to_string(&generate_widget(&offers)).unwrap();

        let agent = Arc::new(MockAgentBoundary::new());
        agent.queue_reply(AgentReply::from_parts(vec![
            Part::function_call("generateOfferWidget", json!({ "offers": ["home_basic", "home_pro"] })),
            Part::text(widget),
        ]));
        agent.queue_reply(AgentReply::from_parts(vec![Part::text(
            "Here is your link: https://shop.example.com/checkout/home_pro-abcd1234",
        )]));
        let manager = RuntimeManager::new(agent.clone(), None);
        let handle = manager.create().await;
        wait_for_bound(handle.actions()).await;

        handle.submit("home").await.unwrap();
        wait_idle(&handle).await;
        let widget_turn = handle.turns()[1].clone();
        assert_eq!(widget_turn.text(), WIDGET_CONFIRMATION_TEXT);
        assert_eq!(
            widget_turn.widget.unwrap().metadata.offers,
            vec!["home_basic", "home_pro"]
        );

        handle
            .invoke_action("createPurchaseLink", json!({ "offer_id": "home_pro" }))
            .await
            .unwrap();
        wait_idle(&handle).await;

        let turns = handle.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2].role, Role::User);
        assert!(turns[2].text().contains("createPurchaseLink"));
        assert!(turns[2].text().contains("home_pro"));
        assert!(turns[3].text().starts_with("Here is your link"));
    }

    #[tokio::test]
    async fn test_action_while_busy_is_rejected() {
        let agent = Arc::new(GatedAgentBoundary::new());
        agent.queue_reply(AgentReply::from_parts(vec![Part::text("ok")]));
        let manager = RuntimeManager::new(agent.clone(), None);
        let handle = manager.create().await;
        wait_for_bound(handle.actions()).await;

        handle.submit("first").await.unwrap();
        let err = handle
            .invoke_action("createPurchaseLink", json!({ "offer_id": "home_pro" }))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ActionError::Submit(SubmitError::Rejected(TransitionError::AgentBusy))
        );

        agent.release();
        wait_idle(&handle).await;
    }

    #[tokio::test]
    async fn test_close_unbinds_actions() {
        let manager = RuntimeManager::new(Arc::new(MockAgentBoundary::new()), None);
        let handle = manager.create().await;
        wait_for_bound(handle.actions()).await;

        assert!(manager.close(handle.id()).await);
        assert!(!manager.close(handle.id()).await);
        assert!(manager.get(handle.id()).await.is_none());

        for _ in 0..100 {
            if !handle.actions().is_bound() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let err = handle
            .invoke_action("createPurchaseLink", json!({ "offer_id": "home_pro" }))
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::NotBound);
        assert_eq!(handle.submit("hi").await.unwrap_err(), SubmitError::Closed);
    }

    #[tokio::test]
    async fn test_agent_timeout_produces_error_turn() {
        let agent = Arc::new(GatedAgentBoundary::new());
        let manager = RuntimeManager::new(agent.clone(), Some(Duration::from_millis(50)));
        let handle = manager.create().await;

        handle.submit("anyone there?").await.unwrap();
        wait_idle(&handle).await;

        let turns = handle.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1], Turn::error(AGENT_FAILURE_TEXT));
    }

    #[tokio::test]
    async fn test_conversations_are_independent() {
        let agent = Arc::new(GatedAgentBoundary::new());
        agent.queue_reply(AgentReply::from_parts(vec![Part::text("a")]));
        agent.queue_reply(AgentReply::from_parts(vec![Part::text("b")]));
        let manager = RuntimeManager::new(agent.clone(), None);
        let first = manager.create().await;
        let second = manager.create().await;
        assert_ne!(first.id(), second.id());
        assert_eq!(manager.len().await, 2);

        first.submit("one").await.unwrap();
        // A busy conversation doesn't block another
        second.submit("two").await.unwrap();

        agent.release();
        agent.release();
        wait_idle(&first).await;
        wait_idle(&second).await;
        assert_eq!(first.turns().len(), 2);
        assert_eq!(second.turns().len(), 2);
        assert_eq!(first.turns()[0].text(), "one");
        assert_eq!(second.turns()[0].text(), "two");

        manager.shutdown().await;
        assert!(manager.is_empty().await);
    }
}
