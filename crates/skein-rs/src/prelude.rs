//! Convenience re-exports for common `skein-rs` types.
//!
//! Meant to be glob-imported when building demos:
//!
//! ```ignore
//! use skein_rs::prelude::*;
//! ```
//!
//! Pulls in the chat client and wire types, the context manager and its
//! reports, the tool trait + set with the built-in tools, the agent loop,
//! sub-agents, and settings. Specialized pieces (retry internals, the raw
//! evaluator, timezone helpers) stay in their modules.

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ChatClient, ChatRequest, Message, MessageRole, ToolDef, json_schema_for};

// ── Context management ──────────────────────────────────────────────
pub use crate::context::{
    CompactionReport, ContextConfig, ContextError, ContextManager, ContextStats, ContextStatus,
    UsageReport,
};

// ── Tools ───────────────────────────────────────────────────────────
pub use crate::tools::{
    Calculator, Clock, ContextTool, DisabledTool, Email, FnTool, Tool, ToolFuture, ToolSet,
    ToolSpec, Weather, parse_tool_args,
};

// ── Agent runtime ───────────────────────────────────────────────────
pub use crate::agent::{AgentLoop, LoopConfig, LoopResult, SubAgent, first_task};

// ── Configuration ───────────────────────────────────────────────────
pub use crate::api::{RateLimiter, RetryConfig};
pub use crate::config::Settings;
