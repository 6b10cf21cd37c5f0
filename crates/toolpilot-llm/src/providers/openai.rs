use crate::error::{LlmError, Result};
use crate::traits::LlmProvider;
use crate::types::{CompletionRequest, CompletionResponse, StopReason, ToolChoice};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use toolpilot_core::config::LlmConfig;
use toolpilot_core::message::{ContentBlock, ToolUse};
use toolpilot_core::{Message, Role, TokenUsage, ToolDefinition};
use tracing::debug;

const PROVIDER: &str = "openai";

/// Client for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1")
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let timeout = Duration::from_secs(300);
        Self {
            client: build_client(timeout),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: "gpt-4o".to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, &config.base_url)
            .with_model(&config.model)
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn convert_messages(&self, messages: &[Message], system: Option<&str>) -> Vec<OpenAiMessage> {
        let mut result = Vec::new();

        if let Some(sys) = system {
            result.push(OpenAiMessage::text("system", sys));
        }

        for msg in messages {
            match msg.role {
                Role::System => continue,
                Role::User => result.push(OpenAiMessage::text("user", msg.text_content())),
                Role::Assistant => {
                    let tool_calls: Vec<_> = msg
                        .tool_uses()
                        .into_iter()
                        .map(|tu| OpenAiToolCall {
                            id: tu.id.clone(),
                            r#type: "function".to_string(),
                            function: OpenAiFunctionCall {
                                name: tu.name.clone(),
                                arguments: tu.input.to_string(),
                            },
                        })
                        .collect();

                    let text = msg.text_content();
                    result.push(OpenAiMessage {
                        role: "assistant".to_string(),
                        content: if text.is_empty() { None } else { Some(text) },
                        tool_calls: if tool_calls.is_empty() {
                            None
                        } else {
                            Some(tool_calls)
                        },
                        tool_call_id: None,
                    });
                }
                Role::Tool => {
                    for tr in msg.tool_results() {
                        result.push(OpenAiMessage {
                            role: "tool".to_string(),
                            content: Some(tr.content.clone()),
                            tool_calls: None,
                            tool_call_id: Some(tr.tool_use_id.clone()),
                        });
                    }
                }
            }
        }

        result
    }

    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: Some(t.description.clone()),
                    parameters: serde_json::to_value(&t.parameters)
                        .unwrap_or(Value::Object(Default::default())),
                },
            })
            .collect()
    }

    fn convert_tool_choice(&self, choice: &ToolChoice) -> Value {
        match choice {
            ToolChoice::Auto => Value::String("auto".to_string()),
            ToolChoice::None => Value::String("none".to_string()),
            ToolChoice::Required => Value::String("required".to_string()),
            ToolChoice::Tool { name } => serde_json::json!({
                "type": "function",
                "function": { "name": name }
            }),
        }
    }

    fn build_body(&self, request: &CompletionRequest) -> Result<Value> {
        let messages = self.convert_messages(&request.messages, request.system.as_deref());
        let model = if request.model.is_empty() {
            self.default_model.as_str()
        } else {
            request.model.as_str()
        };

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = temp.into();
        }
        if let Some(tools) = &request.tools {
            body["tools"] = serde_json::to_value(self.convert_tools(tools))?;
        }
        if let Some(choice) = &request.tool_choice {
            body["tool_choice"] = self.convert_tool_choice(choice);
        }

        Ok(body)
    }

    fn parse_response(&self, response: OpenAiResponse) -> Result<CompletionResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::invalid_response("No choices in response"))?;

        let mut content_blocks = Vec::new();

        if let Some(text) = choice.message.content.filter(|t| !t.is_empty()) {
            content_blocks.push(ContentBlock::text(text));
        }

        for tc in choice.message.tool_calls.unwrap_or_default() {
            let input = parse_arguments(&tc.function.arguments);
            content_blocks.push(ContentBlock::tool_use(ToolUse::new(
                tc.id,
                tc.function.name,
                input,
            )));
        }

        let usage = response
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let stop_reason = choice
            .finish_reason
            .as_deref()
            .map(StopReason::from_finish_reason)
            .unwrap_or(StopReason::EndTurn);

        let message = Message::new(Role::Assistant, content_blocks).with_usage(&usage);

        Ok(CompletionResponse::new(response.id, response.model, message)
            .with_usage(usage)
            .with_stop_reason(stop_reason))
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout.as_millis() as u64)
        } else {
            LlmError::network(err.to_string())
        }
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Tool arguments arrive as a JSON string. Blank or malformed arguments become `{}`
/// so that schema validation reports what is missing.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or(Value::Object(Default::default()))
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_body(&request)?;

        debug!(
            model = %body["model"],
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "Sending completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => LlmError::rate_limited(PROVIDER, None),
                401 | 403 => LlmError::AuthenticationFailed(format!("{}: {}", status, text)),
                400 if text.contains("context") && text.contains("length") => {
                    LlmError::ContextLengthExceeded(text)
                }
                _ => LlmError::api(PROVIDER, format!("{}: {}", status, text)),
            });
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::invalid_response(e.to_string()))?;
        let parsed = self.parse_response(openai_response)?;

        debug!(
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            tool_calls = parsed.message.tool_uses().len(),
            "Completion received"
        );

        Ok(parsed)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl OpenAiMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    r#type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolpilot_core::message::ToolResult;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiProvider::new("test-key").with_model("gpt-4");

        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), "gpt-4");
    }

    #[test]
    fn test_from_config() {
        let config = LlmConfig {
            base_url: "http://localhost:8080/v1/".into(),
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        let provider = OpenAiProvider::from_config(&config, "k");

        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
        assert_eq!(provider.default_model(), "qwen3-max");
        assert_eq!(provider.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_message_conversion() {
        let provider = OpenAiProvider::new("test-key");

        let assistant = Message::new(
            Role::Assistant,
            vec![ContentBlock::tool_use(ToolUse::new(
                "call_1",
                "list_files",
                serde_json::json!({}),
            ))],
        );
        let messages = vec![
            Message::system("ignored in favour of the request system prompt"),
            Message::user("Hello"),
            assistant,
            Message::tool(vec![
                ToolResult::success("call_1", "list_files", "a.py (file)"),
                ToolResult::error("call_2", "read_python_script", "missing"),
            ]),
        ];

        let converted = provider.convert_messages(&messages, Some("You are helpful"));

        let roles: Vec<_> = converted.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool", "tool"]);
        assert!(converted[2].content.is_none());
        assert_eq!(converted[2].tool_calls.as_ref().unwrap()[0].function.arguments, "{}");
        assert_eq!(converted[4].tool_call_id.as_deref(), Some("call_2"));
    }

    #[test]
    fn test_body_includes_tools_and_model() {
        let provider = OpenAiProvider::new("k").with_model("qwen3-max");
        let request = CompletionRequest::new("", vec![Message::user("hi")])
            .with_tools(vec![ToolDefinition::new("get_current_directory", "cwd")])
            .with_temperature(0.0);

        let body = provider.build_body(&request).unwrap();
        assert_eq!(body["model"], "qwen3-max");
        assert_eq!(body["tools"][0]["function"]["name"], "get_current_directory");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let raw = serde_json::json!({
            "id": "chatcmpl-1",
            "model": "qwen3-max",
            "choices": [{
                "message": {
                    "content": "",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "install_python_package", "arguments": "{\"package_name\":\"requests\"}"}
                    }, {
                        "id": "call_2",
                        "type": "function",
                        "function": {"name": "list_files", "arguments": ""}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52}
        });
        let parsed: OpenAiResponse = serde_json::from_value(raw).unwrap();
        let response = OpenAiProvider::new("k").parse_response(parsed).unwrap();

        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(response.usage, TokenUsage::new(40, 12));
        assert_eq!(response.message.usage(), Some(TokenUsage::new(40, 12)));

        let calls = response.message.tool_uses();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].input["package_name"], "requests");
        assert_eq!(calls[1].input, serde_json::json!({}));
        assert_eq!(response.text_content(), "");
    }

    #[test]
    fn test_parse_response_without_choices() {
        let parsed: OpenAiResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        let err = OpenAiProvider::new("k").parse_response(parsed).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
