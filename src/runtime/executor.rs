//! Conversation runtime executor

use super::{ActionRouter, SseEvent, SubmitError};
use crate::agent::{AgentBoundary, AgentError, AgentRequest};
use crate::conversation::{transition, ConvState, ConversationStore, Effect, Event, TransitionError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

type Ack = oneshot::Sender<Result<(), TransitionError>>;

/// An event for the runtime, optionally with a channel for the outcome of
/// its transition
#[derive(Debug)]
pub struct Command {
    pub event: Event,
    ack: Option<Ack>,
}

impl Command {
    /// Fire-and-forget command
    pub fn event(event: Event) -> Self {
        Self { event, ack: None }
    }

    pub fn acknowledge(self, result: Result<(), TransitionError>) {
        if let Some(ack) = self.ack {
            let _ = ack.send(result);
        }
    }
}

/// Send `event` and wait until the runtime has applied (or rejected) it
pub(crate) async fn send_event(tx: &mpsc::Sender<Command>, event: Event) -> Result<(), SubmitError> {
    let (ack_tx, ack_rx) = oneshot::channel();
    tx.send(Command {
        event,
        ack: Some(ack_tx),
    })
    .await
    .map_err(|_| SubmitError::Closed)?;
    ack_rx.await.map_err(|_| SubmitError::Closed)??;
    Ok(())
}

/// Channels a runtime is wired to
pub struct RuntimeChannels {
    pub command_tx: mpsc::Sender<Command>,
    pub command_rx: mpsc::Receiver<Command>,
    pub broadcast_tx: broadcast::Sender<SseEvent>,
    pub state_tx: watch::Sender<ConvState>,
}

/// Owns one conversation's state. All mutation goes through its command
/// channel, so a conversation has a single writer.
pub struct ConversationRuntime<A: AgentBoundary + ?Sized + 'static> {
    conversation_id: String,
    state: ConvState,
    store: ConversationStore,
    agent: Arc<A>,
    agent_timeout: Option<Duration>,
    command_rx: mpsc::Receiver<Command>,
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    state_tx: watch::Sender<ConvState>,
    actions: ActionRouter,
    cancel: CancellationToken,
}

impl<A: AgentBoundary + ?Sized + 'static> ConversationRuntime<A> {
    pub fn new(
        conversation_id: impl Into<String>,
        store: ConversationStore,
        agent: Arc<A>,
        channels: RuntimeChannels,
        actions: ActionRouter,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            state: ConvState::Idle,
            store,
            agent,
            agent_timeout: None,
            command_rx: channels.command_rx,
            command_tx: channels.command_tx,
            broadcast_tx: channels.broadcast_tx,
            state_tx: channels.state_tx,
            actions,
            cancel,
        }
    }

    /// Bound every agent call by `timeout`
    pub fn with_agent_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub async fn run(mut self) {
        tracing::info!(conv_id = %self.conversation_id, "Starting conversation runtime");
        let _binding = self.actions.bind(self.command_tx.clone());

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                Some(command) = self.command_rx.recv() => self.process_command(command),
                else => break,
            }
        }

        tracing::info!(conv_id = %self.conversation_id, "Conversation runtime stopped");
    }

    fn process_command(&mut self, command: Command) {
        let event_name = command.event.name();
        match transition(self.state, command.event.clone()) {
            Ok(result) => {
                tracing::debug!(
                    conv_id = %self.conversation_id,
                    event = event_name,
                    from = self.state.as_str(),
                    to = result.new_state.as_str(),
                    "Transition"
                );
                self.state = result.new_state;
                for effect in result.effects {
                    self.execute_effect(effect);
                }
                command.acknowledge(Ok(()));
            }
            Err(e) => {
                tracing::warn!(conv_id = %self.conversation_id, event = event_name, error = %e, "Rejected event");
                let _ = self.broadcast_tx.send(SseEvent::Error {
                    message: e.to_string(),
                });
                command.acknowledge(Err(e));
            }
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendTurn { turn } => {
                self.store.append(turn.clone());
                let index = self.store.len().saturating_sub(1);
                let _ = self.broadcast_tx.send(SseEvent::Turn { index, turn });
            }
            Effect::NotifyStateChange { state } => {
                self.state_tx.send_replace(state);
                let _ = self.broadcast_tx.send(SseEvent::StateChange { state });
            }
            Effect::NotifyAgentDone => {
                let _ = self.broadcast_tx.send(SseEvent::AgentDone);
            }
            Effect::RequestAgent => self.spawn_agent_call(),
        }
    }

    /// Run the agent call in the background; its outcome comes back as an
    /// event on the command channel.
    fn spawn_agent_call(&self) {
        let request = AgentRequest::new(self.store.snapshot());
        let agent = self.agent.clone();
        let command_tx = self.command_tx.clone();
        let timeout = self.agent_timeout;
        let cancel = self.cancel.child_token();
        let conv_id = self.conversation_id.clone();

        tokio::spawn(async move {
            tracing::info!(conv_id = %conv_id, turns = request.history.len(), "Calling agent");
            let start = std::time::Instant::now();

            let call = async {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, agent.call(&request))
                        .await
                        .unwrap_or_else(|_| {
                            Err(AgentError::timeout(format!(
                                "Agent did not reply within {}ms",
                                limit.as_millis()
                            )))
                        }),
                    None => agent.call(&request).await,
                }
            };

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(conv_id = %conv_id, "Agent call abandoned on shutdown");
                    return;
                }
                result = call => result,
            };

            let event = match result {
                Ok(reply) => {
                    tracing::info!(
                        conv_id = %conv_id,
                        duration_ms = %start.elapsed().as_millis(),
                        "Agent replied"
                    );
                    Event::AgentReplied { reply }
                }
                Err(error) => {
                    tracing::error!(
                        conv_id = %conv_id,
                        duration_ms = %start.elapsed().as_millis(),
                        kind = ?error.kind,
                        transient = error.kind.is_transient(),
                        error = %error,
                        "Agent call failed"
                    );
                    Event::AgentFailed { error }
                }
            };
            let _ = command_tx.send(Command::event(event)).await;
        });
    }
}
