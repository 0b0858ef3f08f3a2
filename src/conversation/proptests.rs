//! Property-based tests for the conversation state machine and store

use super::transition::{TransitionResult, MALFORMED_REPLY_TEXT};
use super::*;
use crate::agent::{AgentError, AgentReply, Part};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.?!]{0,60}"
}

fn arb_input_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_text().prop_map(Event::user_submit),
        "[a-z_]{1,12}".prop_map(|id| Event::widget_action(
            "createPurchaseLink",
            json!({ "offer_id": id })
        )),
    ]
}

fn arb_agent_error() -> impl Strategy<Value = AgentError> {
    prop_oneof![
        arb_text().prop_map(AgentError::network),
        arb_text().prop_map(AgentError::server_error),
        arb_text().prop_map(AgentError::rate_limit),
        arb_text().prop_map(AgentError::timeout),
        arb_text().prop_map(AgentError::malformed),
    ]
}

fn arb_outcome_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_text().prop_map(|t| Event::AgentReplied {
            reply: AgentReply::from_parts(vec![Part::text(t)]),
        }),
        Just(Event::AgentReplied {
            reply: AgentReply::Candidates { candidates: vec![] },
        }),
        arb_text().prop_map(|t| Event::AgentReplied {
            reply: AgentReply::error(t),
        }),
        arb_agent_error().prop_map(|error| Event::AgentFailed { error }),
    ]
}

fn appended_turns(result: &TransitionResult) -> Vec<Turn> {
    result
        .effects
        .iter()
        .filter_map(|e| match e {
            Effect::AppendTurn { turn } => Some(turn.clone()),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn busy_state_rejects_all_input(event in arb_input_event()) {
        let result = transition(ConvState::AwaitingAgent, event);
        prop_assert_eq!(result.unwrap_err(), TransitionError::AgentBusy);
    }

    #[test]
    fn idle_input_appends_user_turn_then_requests(event in arb_input_event()) {
        let result = transition(ConvState::Idle, event).unwrap();
        prop_assert_eq!(result.new_state, ConvState::AwaitingAgent);

        let append_at = result.effects.iter().position(|e| matches!(e, Effect::AppendTurn { .. }));
        let request_at = result.effects.iter().position(|e| *e == Effect::RequestAgent);
        prop_assert!(append_at.is_some() && request_at.is_some());
        prop_assert!(append_at < request_at);

        let turns = appended_turns(&result);
        prop_assert_eq!(turns.len(), 1);
        prop_assert_eq!(turns[0].role, Role::User);
    }

    #[test]
    fn every_outcome_appends_exactly_one_turn_and_idles(event in arb_outcome_event()) {
        let result = transition(ConvState::AwaitingAgent, event).unwrap();
        prop_assert_eq!(result.new_state, ConvState::Idle);
        prop_assert_eq!(appended_turns(&result).len(), 1);
        prop_assert!(!result.effects.contains(&Effect::RequestAgent));
    }

    #[test]
    fn failures_always_produce_error_role(error in arb_agent_error()) {
        let result = transition(ConvState::AwaitingAgent, Event::AgentFailed { error }).unwrap();
        let turns = appended_turns(&result);
        prop_assert_eq!(turns[0].role, Role::Error);
        prop_assert!(turns[0].text() == AGENT_FAILURE_TEXT || turns[0].text() == MALFORMED_REPLY_TEXT);
    }

    #[test]
    fn prose_never_becomes_a_widget(text in arb_text()) {
        prop_assert_eq!(ReplyBody::classify(&text), ReplyBody::Prose(text.clone()));
    }

    #[test]
    fn store_preserves_order(texts in prop::collection::vec(arb_text(), 0..40)) {
        let store = ConversationStore::new();
        for text in &texts {
            store.append(Turn::user(text.clone()));
        }
        let snapshot = store.snapshot();
        prop_assert_eq!(snapshot.len(), texts.len());
        for (turn, text) in snapshot.iter().zip(&texts) {
            prop_assert_eq!(turn.text(), text.as_str());
        }
    }
}
