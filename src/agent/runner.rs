//! In-process agent: model plus tool loop

use super::{
    AgentBoundary, AgentError, AgentReply, AgentRequest, ContentBlock, GroundingMetadata,
    MessageRole, ModelClient, ModelMessage, ModelRequest, Part, ToolOutputRecord,
};
use crate::conversation::{Role, Turn};
use crate::system_prompt::build_system_prompt;
use crate::tools::ToolDispatcher;
use async_trait::async_trait;
use std::sync::Arc;

const MAX_TOKENS: u32 = 2048;

/// Implements the agent boundary by driving a model through tool calls.
///
/// Every executed call is reported back as a `functionCall` part. A
/// successful widget tool ends the loop and its payload text becomes the
/// reply text, so the client receives the widget verbatim.
pub struct AgentRunner {
    model: Arc<dyn ModelClient>,
    dispatcher: ToolDispatcher,
    max_tool_rounds: u32,
}

impl AgentRunner {
    pub fn new(model: Arc<dyn ModelClient>, dispatcher: ToolDispatcher, max_tool_rounds: u32) -> Self {
        Self {
            model,
            dispatcher,
            max_tool_rounds,
        }
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    pub async fn run(&self, request: &AgentRequest) -> Result<AgentReply, AgentError> {
        let tools = self.dispatcher.registry().definitions();
        let system = build_system_prompt(&tools);

        let mut messages = history_to_messages(&request.history);
        if !request.tool_outputs.is_empty() {
            messages.push(tool_outputs_message(&request.tool_outputs));
        }
        if messages.is_empty() {
            return Err(AgentError::invalid_request("Conversation history is empty"));
        }

        let mut executed: Vec<Part> = Vec::new();
        let mut grounding = GroundingMetadata::default();

        for round in 0..=self.max_tool_rounds {
            let response = self
                .model
                .complete(&ModelRequest {
                    system: system.clone(),
                    messages: messages.clone(),
                    tools: tools.clone(),
                    max_tokens: Some(MAX_TOKENS),
                })
                .await?;

            if let Some(metadata) = &response.grounding {
                grounding
                    .grounding_chunks
                    .extend(metadata.grounding_chunks.iter().cloned());
            }

            let calls: Vec<_> = response
                .tool_uses()
                .into_iter()
                .map(|(name, input)| (name.to_string(), input.clone()))
                .collect();

            if calls.is_empty() {
                return Ok(build_reply(executed, response.text(), grounding));
            }
            if round == self.max_tool_rounds {
                break;
            }

            tracing::debug!(round, calls = calls.len(), "Model requested tools");
            messages.push(ModelMessage {
                role: MessageRole::Model,
                content: response.content.clone(),
            });

            let mut results = Vec::with_capacity(calls.len());
            for (name, input) in calls {
                let envelope = self.dispatcher.dispatch(&name, input.clone()).await;
                executed.push(Part::function_call(name.clone(), input));

                if self.dispatcher.produces_widget(&name) && !envelope.is_error {
                    tracing::debug!(tool = %name, "Widget produced, ending tool loop");
                    return Ok(build_reply(executed, envelope.joined_text(), grounding));
                }

                results.push(ContentBlock::ToolResult {
                    name,
                    content: envelope.joined_text(),
                    is_error: envelope.is_error,
                });
            }
            messages.push(ModelMessage {
                role: MessageRole::User,
                content: results,
            });
        }

        Err(AgentError::malformed(format!(
            "Model kept requesting tools after {} rounds",
            self.max_tool_rounds
        )))
    }
}

#[async_trait]
impl AgentBoundary for AgentRunner {
    async fn call(&self, request: &AgentRequest) -> Result<AgentReply, AgentError> {
        self.run(request).await
    }
}

/// Convert the transcript into model messages. Error turns are not shown to
/// the model; widget turns are summarized by the offers they displayed.
fn history_to_messages(history: &[Turn]) -> Vec<ModelMessage> {
    history
        .iter()
        .filter_map(|turn| match turn.role {
            Role::User => Some(ModelMessage::user(turn.text())),
            Role::Agent => {
                let text = match &turn.widget {
                    Some(widget) => format!(
                        "[Displayed offer widget: {}]",
                        widget.metadata.offers.join(", ")
                    ),
                    None => turn.text().to_string(),
                };
                (!text.is_empty()).then(|| ModelMessage::model(text))
            }
            Role::Error => None,
        })
        .collect()
}

/// Caller-run tool outputs become context text; there is no matching
/// function call in the model history to attach a response to.
fn tool_outputs_message(outputs: &[ToolOutputRecord]) -> ModelMessage {
    let content = outputs
        .iter()
        .map(|record| {
            let label = if record.output.is_error { "error" } else { "result" };
            ContentBlock::text(format!(
                "Tool {} {}: {}",
                record.tool_name,
                label,
                record.output.joined_text()
            ))
        })
        .collect();
    ModelMessage {
        role: MessageRole::User,
        content,
    }
}

fn build_reply(mut parts: Vec<Part>, text: String, grounding: GroundingMetadata) -> AgentReply {
    if !text.is_empty() {
        parts.push(Part::text(text));
    }
    if !grounding.is_empty() {
        parts.push(Part::grounding(grounding));
    }
    AgentReply::from_parts(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentErrorKind, ModelResponse};
    use crate::catalog::Catalog;
    use crate::conversation::{parse_reply, WIDGET_CONFIRMATION_TEXT};
    use crate::runtime::testing::ScriptedModel;
    use crate::tools::{ContentEnvelope, ToolRegistry};
    use serde_json::json;

    fn dispatcher() -> ToolDispatcher {
        let registry =
            ToolRegistry::standard(Arc::new(Catalog::mock()), "https://shop.example.com/checkout")
                .unwrap();
        ToolDispatcher::new(Arc::new(registry))
    }

    fn tool_call(name: &str, input: serde_json::Value) -> ModelResponse {
        ModelResponse {
            content: vec![ContentBlock::tool_use(name, input)],
            grounding: None,
        }
    }

    fn runner(model: &Arc<ScriptedModel>, max_rounds: u32) -> AgentRunner {
        AgentRunner::new(model.clone(), dispatcher(), max_rounds)
    }

    #[tokio::test]
    async fn test_plain_text_reply() {
        let model = Arc::new(ScriptedModel::new());
        model.queue_response(ModelResponse::text_only("Hi! What are you looking for?"));

        let reply = runner(&model, 4)
            .run(&AgentRequest::new(vec![Turn::user("hello")]))
            .await
            .unwrap();
        assert_eq!(
            reply,
            AgentReply::from_parts(vec![Part::text("Hi! What are you looking for?")])
        );

        let requests = model.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system.contains("getOffers"));
        assert_eq!(requests[0].tools.len(), 3);
    }

    #[tokio::test]
    async fn test_offers_to_widget_end_to_end() {
        let model = Arc::new(ScriptedModel::new());
        model.queue_response(tool_call("getOffers", json!({ "category": "home" })));
        model.queue_response(tool_call(
            "generateOfferWidget",
            json!({ "offers": ["home_basic", "home_pro"] }),
        ));

        let reply = runner(&model, 4)
            .run(&AgentRequest::new(vec![Turn::user("home")]))
            .await
            .unwrap();

        let turn = parse_reply(reply).unwrap();
        assert_eq!(turn.text(), WIDGET_CONFIRMATION_TEXT);
        let names: Vec<_> = turn.content.tool_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["getOffers", "generateOfferWidget"]);
        assert_eq!(
            turn.widget.unwrap().metadata.offers,
            vec!["home_basic", "home_pro"]
        );

        // The getOffers result was fed back before the second completion
        let requests = model.recorded_requests();
        assert_eq!(requests.len(), 2);
        let fed_back = requests[1].messages.last().unwrap();
        assert_eq!(fed_back.role, MessageRole::User);
        assert!(matches!(
            &fed_back.content[0],
            ContentBlock::ToolResult { name, is_error: false, .. } if name == "getOffers"
        ));
    }

    #[tokio::test]
    async fn test_tool_errors_are_fed_back_not_raised() {
        let model = Arc::new(ScriptedModel::new());
        model.queue_response(tool_call("noSuchTool", json!({})));
        model.queue_response(ModelResponse::text_only("Sorry about that."));

        let reply = runner(&model, 4)
            .run(&AgentRequest::new(vec![Turn::user("hi")]))
            .await
            .unwrap();
        let turn = parse_reply(reply).unwrap();
        assert_eq!(turn.text(), "Sorry about that.");

        let requests = model.recorded_requests();
        assert!(matches!(
            &requests[1].messages.last().unwrap().content[0],
            ContentBlock::ToolResult { is_error: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_round_limit_is_malformed() {
        let model = Arc::new(ScriptedModel::new());
        for _ in 0..3 {
            model.queue_response(tool_call("getOffers", json!({})));
        }

        let err = runner(&model, 2)
            .run(&AgentRequest::new(vec![Turn::user("loop")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AgentErrorKind::Malformed);
        assert_eq!(model.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = Arc::new(ScriptedModel::new());
        model.queue_error(AgentError::rate_limit("slow down"));

        let err = runner(&model, 4)
            .run(&AgentRequest::new(vec![Turn::user("hi")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AgentErrorKind::RateLimit);
    }

    #[tokio::test]
    async fn test_history_conversion() {
        let model = Arc::new(ScriptedModel::new());
        model.queue_response(ModelResponse::text_only("ok"));

        let mut widget_turn = Turn::agent(WIDGET_CONFIRMATION_TEXT);
        widget_turn.widget = Some(crate::tools::WidgetData {
            html: "<div></div>".to_string(),
            metadata: crate::tools::widget::WidgetMetadata {
                offers: vec!["home_basic".to_string()],
            },
        });
        let mut request = AgentRequest::new(vec![
            Turn::user("home"),
            widget_turn,
            Turn::error("Sorry, I couldn't reach the assistant. Please try again."),
            Turn::user("buy it"),
        ]);
        request.tool_outputs.push(ToolOutputRecord {
            tool_name: "createPurchaseLink".to_string(),
            output: ContentEnvelope::text("https://shop.example.com/checkout/x"),
        });

        runner(&model, 4).run(&request).await.unwrap();

        let messages = &model.recorded_requests()[0].messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].role, MessageRole::Model);
        assert_eq!(
            messages[1].content,
            vec![ContentBlock::text("[Displayed offer widget: home_basic]")]
        );
        assert_eq!(
            messages[3].content,
            vec![ContentBlock::text(
                "Tool createPurchaseLink result: https://shop.example.com/checkout/x"
            )]
        );
    }

    #[tokio::test]
    async fn test_empty_history_is_rejected() {
        let model = Arc::new(ScriptedModel::new());
        let err = runner(&model, 4)
            .run(&AgentRequest::new(vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AgentErrorKind::InvalidRequest);
        assert!(model.recorded_requests().is_empty());
    }
}
