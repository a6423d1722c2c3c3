//! The function-calling dispatch loop.
//!
//! One [`AgentLoop::run`] call drives a complete exchange: the model sees
//! the tool definitions, the loop executes whatever it calls, results are
//! appended as tool messages, and the cycle repeats until the model answers
//! in plain text. If the turn budget runs out mid-conversation, a final
//! tool-free request forces a closing answer instead of returning a dangling
//! tool call.

use crate::context::ContextManager;
use crate::tools::core::ToolSet;
use crate::{ChatClient, ChatRequest, Message, MessageRole};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Configuration for one dispatch loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Model for every call in the loop.
    pub model: String,
    /// Maximum tool-use turns before forcing a final answer.
    pub max_turns: u32,
    /// Per-response token limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl LoopConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_turns: 5,
            max_tokens: 1024,
            temperature: 0.7,
        }
    }

    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = turns;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Outcome of a completed loop.
#[derive(Debug)]
pub struct LoopResult {
    /// Final text answer from the model.
    pub content: String,
    /// Turns consumed (API round-trips with tools offered).
    pub turns_used: u32,
    /// Full message transcript, final answer included.
    pub messages: Vec<Message>,
    /// Total tokens reported by the API across all calls.
    pub total_tokens: u64,
}

/// The reusable function-calling loop.
///
/// # Example
///
/// ```ignore
/// let tools = ToolSet::new().with(Calculator).with(Clock);
/// let config = LoopConfig::new("gpt-4-turbo").with_max_turns(5);
///
/// let result = AgentLoop::new(&client, &tools, config)
///     .run(vec![Message::user("What is (123+456)*789?")])
///     .await?;
/// println!("{}", result.content);
/// ```
pub struct AgentLoop<'a> {
    client: &'a ChatClient,
    tools: &'a ToolSet,
    config: LoopConfig,
    context: Option<Arc<Mutex<ContextManager>>>,
}

impl<'a> AgentLoop<'a> {
    pub fn new(client: &'a ChatClient, tools: &'a ToolSet, config: LoopConfig) -> Self {
        Self {
            client,
            tools,
            config,
            context: None,
        }
    }

    /// Mirror every message the loop produces into a shared
    /// [`ContextManager`], so a `manage_context` tool in the set operates
    /// on the live conversation.
    pub fn with_context(mut self, context: Arc<Mutex<ContextManager>>) -> Self {
        self.context = Some(context);
        self
    }

    fn record(&self, role: MessageRole, content: &str) {
        if let Some(ref ctx) = self.context {
            let mut ctx = ctx.lock().unwrap_or_else(|e| e.into_inner());
            ctx.append(role, content);
        }
    }

    /// Run the loop to completion over the given starting messages.
    pub async fn run(&self, messages: Vec<Message>) -> Result<LoopResult, String> {
        let mut current = messages;
        for msg in &current {
            if let Some(ref content) = msg.content {
                self.record(msg.role, content);
            }
        }

        let tool_defs = self.tools.definitions();
        let mut total_tokens: u64 = 0;

        for turn in 1..=self.config.max_turns {
            info!("agent turn {turn}/{}", self.config.max_turns);

            let request = ChatRequest {
                model: self.config.model.clone(),
                messages: current.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                tools: Some(tool_defs.clone()),
                tool_choice: Some("auto".into()),
                ..Default::default()
            };
            let completion = self.client.chat(&request).await?;
            if let Some(usage) = completion
                .usage
                .as_ref()
                .and_then(|u| u.total_tokens)
            {
                total_tokens += u64::from(usage);
            }

            if completion.tool_calls.is_empty() {
                let content = completion.content.unwrap_or_default();
                self.record(MessageRole::Assistant, &content);
                current.push(Message::assistant_text(content.clone()));
                return Ok(LoopResult {
                    content,
                    turns_used: turn,
                    messages: current,
                    total_tokens,
                });
            }

            if let Some(ref content) = completion.content {
                self.record(MessageRole::Assistant, content);
            }
            current.push(Message::assistant_tool_calls(
                completion.content.clone(),
                completion.tool_calls.clone(),
            ));

            for call in &completion.tool_calls {
                let result = self
                    .tools
                    .execute(&call.function.name, &call.function.arguments)
                    .await;
                info!("tool call finished: {}", call.function.name);
                self.record(MessageRole::Tool, &result);
                current.push(Message::tool_result(&call.id, result));
            }
        }

        // Turn budget exhausted: one tool-free call for a closing answer.
        warn!(
            "turn budget of {} exhausted; requesting a final answer",
            self.config.max_turns
        );
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: current.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            ..Default::default()
        };
        let completion = self.client.chat(&request).await?;
        if let Some(usage) = completion.usage.as_ref().and_then(|u| u.total_tokens) {
            total_tokens += u64::from(usage);
        }

        let content = completion.content.unwrap_or_default();
        self.record(MessageRole::Assistant, &content);
        current.push(Message::assistant_text(content.clone()));
        Ok(LoopResult {
            content,
            turns_used: self.config.max_turns,
            messages: current,
            total_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = LoopConfig::new("gpt-4-turbo");
        assert_eq!(config.max_turns, 5);
        assert_eq!(config.max_tokens, 1024);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn config_builders() {
        let config = LoopConfig::new("m")
            .with_max_turns(10)
            .with_max_tokens(4096)
            .with_temperature(0.2);
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.max_tokens, 4096);
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
    }
}
