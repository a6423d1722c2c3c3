//! The `manage_context` tool: exposes the [`ContextManager`] to the LLM.
//!
//! A single tool with an `action` discriminator covering the five context
//! operations — monitor, compress, stats, clear, recent — plus an optional
//! `n` for `recent`. The tool holds no state of its own beyond a shared
//! handle to the manager; the enclosing loop appends messages to the same
//! manager, and the model can then inspect or shrink its own context.

use crate::context::ContextManager;
use crate::tools::core::{Tool, ToolFuture};
use crate::tools::spec::ToolSpec;
use crate::ToolDef;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::error;

/// Default message count for the `recent` action.
const DEFAULT_RECENT: i64 = 5;

/// Context operation selected by the model.
#[derive(Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextAction {
    Monitor,
    Compress,
    Stats,
    Clear,
    Recent,
}

/// Typed arguments for the `manage_context` tool.
#[derive(Deserialize, JsonSchema)]
pub struct ContextArgs {
    /// The context operation to perform.
    pub action: ContextAction,
    /// How many recent messages to return (only with action 'recent').
    #[serde(default)]
    pub n: Option<i64>,
}

/// Tool adapter over a shared [`ContextManager`].
///
/// # Example
///
/// ```ignore
/// let tool = ContextTool::new();
/// let ctx = tool.handle();
///
/// ctx.lock().unwrap().append(MessageRole::User, "hello");
/// let tools = ToolSet::new().with(tool);
/// // ... the LLM can now call manage_context(action="monitor") etc.
/// ```
pub struct ContextTool {
    manager: Arc<Mutex<ContextManager>>,
}

impl ContextTool {
    /// A tool over a freshly created manager with default configuration.
    pub fn new() -> Self {
        Self::with_manager(ContextManager::with_defaults())
    }

    /// Wrap an already-configured manager.
    pub fn with_manager(manager: ContextManager) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
        }
    }

    /// Share an existing handle (e.g. the one the agent loop records into).
    pub fn shared(manager: Arc<Mutex<ContextManager>>) -> Self {
        Self { manager }
    }

    /// Clone the shared handle so callers can append to the same log.
    pub fn handle(&self) -> Arc<Mutex<ContextManager>> {
        Arc::clone(&self.manager)
    }

    fn run(&self, args: ContextArgs) -> serde_json::Value {
        let mut ctx = self.manager.lock().unwrap_or_else(|e| e.into_inner());

        match args.action {
            ContextAction::Monitor => {
                let report = ctx.monitor();
                let message = format!(
                    "context holds {}/{} estimated tokens ({:.1}%, {})",
                    report.total_tokens,
                    report.max_tokens,
                    report.usage_ratio * 100.0,
                    report.status,
                );
                envelope(&report, message)
            }
            ContextAction::Compress => {
                if ctx.should_compress() {
                    let report = ctx.compact();
                    let message = format!(
                        "compacted context: dropped {} messages, freed ~{} tokens",
                        report.removed, report.tokens_freed,
                    );
                    envelope(&report, message)
                } else {
                    serde_json::json!({
                        "success": true,
                        "data": { "compacted": false },
                        "message": "context is below the compaction threshold; nothing to do",
                    })
                }
            }
            ContextAction::Stats => {
                let stats = ctx.stats();
                let message = format!(
                    "{} messages, ~{} estimated tokens ({:.1}% of budget)",
                    stats.message_count,
                    stats.total_tokens,
                    stats.usage_ratio * 100.0,
                );
                envelope(&stats, message)
            }
            ContextAction::Clear => {
                let cleared = ctx.len();
                ctx.clear();
                serde_json::json!({
                    "success": true,
                    "data": { "cleared_messages": cleared },
                    "message": format!("cleared {cleared} messages"),
                })
            }
            ContextAction::Recent => {
                // Out-of-range n is clamped, never rejected.
                let n = args.n.unwrap_or(DEFAULT_RECENT).max(0) as usize;
                let messages: Vec<serde_json::Value> = ctx
                    .recent(n)
                    .iter()
                    .map(|m| {
                        serde_json::json!({
                            "role": m.role.to_string(),
                            "content": m.content,
                            "task_id": m.task_id,
                            "timestamp": m.timestamp.to_rfc3339(),
                        })
                    })
                    .collect();
                let count = messages.len();
                serde_json::json!({
                    "success": true,
                    "data": { "messages": messages, "count": count },
                    "message": format!("returning the {count} most recent messages"),
                })
            }
        }
    }
}

impl Default for ContextTool {
    fn default() -> Self {
        Self::new()
    }
}

fn envelope<T: serde::Serialize>(data: &T, message: String) -> serde_json::Value {
    match serde_json::to_value(data) {
        Ok(data) => serde_json::json!({
            "success": true,
            "data": data,
            "message": message,
        }),
        Err(e) => {
            error!("failed to serialize context report: {e}");
            serde_json::json!({ "success": false, "error": format!("internal error: {e}") })
        }
    }
}

impl Tool for ContextTool {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder("manage_context")
            .purpose("Manage the conversation context: monitor token usage, compact the log, inspect statistics")
            .when_to_use(
                "When the conversation is getting long and you need to check or reduce \
                 estimated token usage, or review what the log contains",
            )
            .when_not_to_use("To recall the content of a specific earlier answer — just read the conversation")
            .parameters_for::<ContextArgs>()
            .example(
                "manage_context(action='monitor')",
                "token usage, ceiling, and an ok/warning/critical status",
            )
            .example(
                "manage_context(action='recent', n=3)",
                "the last 3 messages in order",
            )
            .output_format("JSON: {success, data, message} or {success: false, error}")
            .to_tool_def()
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let parsed: ContextArgs = match serde_json::from_str(&arguments) {
                Ok(a) => a,
                Err(e) => {
                    return serde_json::json!({
                        "success": false,
                        "error": format!(
                            "invalid arguments: {e}. Actions: monitor, compress, stats, clear, recent."
                        ),
                    })
                    .to_string();
                }
            };
            self.run(parsed).to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageRole;
    use crate::context::ContextConfig;

    async fn call(tool: &ContextTool, args: &str) -> serde_json::Value {
        let raw = tool.execute(args).await;
        serde_json::from_str(&raw).expect("tool result is JSON")
    }

    fn seeded_tool() -> ContextTool {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "compute (123+456)*789");
        ctx.append_tagged(MessageRole::Assistant, "computing...", "calc_001");
        ctx.append_tagged(MessageRole::Tool, "result: 456831", "calc_001");
        ContextTool::with_manager(ctx)
    }

    #[tokio::test]
    async fn monitor_reports_usage() {
        let tool = seeded_tool();
        let result = call(&tool, r#"{"action": "monitor"}"#).await;
        assert_eq!(result["success"], true);
        assert_eq!(result["data"]["max_tokens"], 4000);
        assert_eq!(result["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn stats_include_breakdowns() {
        let tool = seeded_tool();
        let result = call(&tool, r#"{"action": "stats"}"#).await;
        assert_eq!(result["data"]["message_count"], 3);
        assert_eq!(result["data"]["role_breakdown"]["user"], 1);
        assert_eq!(result["data"]["task_breakdown"]["calc_001"], 2);
    }

    #[tokio::test]
    async fn compress_below_threshold_declines() {
        let tool = seeded_tool();
        let result = call(&tool, r#"{"action": "compress"}"#).await;
        assert_eq!(result["success"], true);
        assert_eq!(result["data"]["compacted"], false);
    }

    #[tokio::test]
    async fn compress_over_threshold_compacts() {
        let config = ContextConfig::new().with_max_tokens(100).with_retain_recent(2);
        let mut ctx = ContextManager::new(config).expect("valid config");
        ctx.append(MessageRole::User, "a".repeat(100));
        for _ in 0..4 {
            ctx.append(MessageRole::Assistant, "b".repeat(100));
        }
        let tool = ContextTool::with_manager(ctx);

        let result = call(&tool, r#"{"action": "compress"}"#).await;
        assert_eq!(result["success"], true);
        assert_eq!(result["data"]["removed"], 2);
        assert_eq!(result["data"]["retained"], 3);
    }

    #[tokio::test]
    async fn recent_defaults_to_five_and_clamps_negative() {
        let tool = seeded_tool();

        let result = call(&tool, r#"{"action": "recent"}"#).await;
        assert_eq!(result["data"]["count"], 3); // fewer than 5 exist

        let result = call(&tool, r#"{"action": "recent", "n": -2}"#).await;
        assert_eq!(result["data"]["count"], 0);

        let result = call(&tool, r#"{"action": "recent", "n": 1}"#).await;
        assert_eq!(result["data"]["count"], 1);
        assert_eq!(result["data"]["messages"][0]["role"], "tool");
    }

    #[tokio::test]
    async fn clear_empties_the_log() {
        let tool = seeded_tool();
        let result = call(&tool, r#"{"action": "clear"}"#).await;
        assert_eq!(result["data"]["cleared_messages"], 3);

        let result = call(&tool, r#"{"action": "monitor"}"#).await;
        assert_eq!(result["data"]["total_tokens"], 0);
    }

    #[tokio::test]
    async fn unknown_action_is_an_error_envelope() {
        let tool = ContextTool::new();
        let result = call(&tool, r#"{"action": "defragment"}"#).await;
        assert_eq!(result["success"], false);
        assert!(result["error"].as_str().unwrap().contains("invalid arguments"));
    }

    #[tokio::test]
    async fn shared_handle_sees_loop_appends() {
        let tool = ContextTool::new();
        let handle = tool.handle();
        handle
            .lock()
            .unwrap()
            .append(MessageRole::User, "from the loop");

        let result = call(&tool, r#"{"action": "recent", "n": 1}"#).await;
        assert_eq!(result["data"]["messages"][0]["content"], "from the loop");
    }
}
