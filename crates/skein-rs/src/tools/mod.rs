//! Tool abstractions for LLM function-calling.
//!
//! Every capability the model can invoke is a [`Tool`] implementor: a JSON
//! definition (name, description, parameter schema) plus an async `execute`
//! over the raw argument string. Tools are collected into a [`ToolSet`]
//! which handles dispatch, optional schema validation, truncation, and
//! call logging.
//!
//! Results follow one envelope convention: a JSON object with `success`,
//! then `data` + `message` on success or `error` on failure, so the model
//! always sees the same shape regardless of which tool ran.
//!
//! # Submodules
//!
//! - [`core`] — [`Tool`] trait, [`ToolSet`], [`FnTool`], [`DisabledTool`],
//!   parsing/validation/truncation helpers.
//! - [`spec`] — [`ToolSpec`](spec::ToolSpec) builder for structured tool
//!   descriptions with when-to-use / when-not-to-use guidance.
//! - [`context`] — the `manage_context` adapter over a shared
//!   [`ContextManager`](crate::context::ContextManager).
//! - [`calculator`], [`clock`], [`weather`], [`email`] — the built-in demo
//!   tools.

pub mod calculator;
pub mod clock;
pub mod context;
pub mod core;
pub mod email;
pub mod spec;
pub mod weather;

// Re-export commonly used items at the module level.
pub use calculator::Calculator;
pub use clock::Clock;
pub use context::{ContextAction, ContextTool};
pub use core::{
    DEFAULT_MAX_RESULT_BYTES, DisabledTool, FnTool, Tool, ToolFuture, ToolSet, parse_tool_args,
    truncate_result, validate_tool_arguments,
};
pub use email::Email;
pub use spec::ToolSpec;
pub use weather::Weather;
