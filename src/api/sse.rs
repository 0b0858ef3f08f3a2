//! Server-Sent Events support

use crate::runtime::SseEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init_event: SseEvent,
    broadcast_rx: tokio::sync::broadcast::Receiver<SseEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(sse_event_to_axum(init_event)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(sse_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn sse_event_to_axum(event: SseEvent) -> Event {
    let (event_type, data) = sse_event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn sse_event_payload(event: SseEvent) -> (&'static str, serde_json::Value) {
    match event {
        SseEvent::Init { turns, state } => (
            "init",
            json!({
                "type": "init",
                "turns": turns,
                "state": state,
                "agent_working": state.is_working()
            }),
        ),
        SseEvent::Turn { index, turn } => (
            "turn",
            json!({
                "type": "turn",
                "index": index,
                "turn": turn
            }),
        ),
        SseEvent::StateChange { state } => (
            "state_change",
            json!({
                "type": "state_change",
                "state": state
            }),
        ),
        SseEvent::AgentDone => (
            "agent_done",
            json!({
                "type": "agent_done"
            }),
        ),
        SseEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConvState, Turn};

    #[test]
    fn test_payload_shapes() {
        let (kind, data) = sse_event_payload(SseEvent::Init {
            turns: vec![Turn::user("hi")],
            state: ConvState::AwaitingAgent,
        });
        assert_eq!(kind, "init");
        assert_eq!(data["agent_working"], true);
        assert_eq!(data["state"]["type"], "awaiting_agent");
        assert_eq!(data["turns"][0]["content"]["text"], "hi");

        let (kind, data) = sse_event_payload(SseEvent::Turn {
            index: 3,
            turn: Turn::error("oops"),
        });
        assert_eq!(kind, "turn");
        assert_eq!(data["index"], 3);
        assert_eq!(data["turn"]["role"], "error");

        let (kind, _) = sse_event_payload(SseEvent::AgentDone);
        assert_eq!(kind, "agent_done");
    }
}
