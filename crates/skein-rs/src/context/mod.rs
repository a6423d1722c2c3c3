//! Conversation context management: token accounting and compaction.
//!
//! The context window is the scarcest resource in any LLM loop. The
//! [`ContextManager`] owns the ordered message log for one conversation,
//! estimates its token cost from character counts, reports usage tiers
//! (ok / warning / critical), and compacts the log on request with a fixed
//! retention policy: every user message survives, plus the most recent N
//! non-user messages. Compaction filters, it never reorders.
//!
//! Compaction is always caller-driven — appending never triggers it. The
//! typical loop is: append, check [`ContextManager::should_compress`], and
//! invoke [`ContextManager::compact`] when it says so. The
//! [`ContextTool`](crate::tools::ContextTool) adapter exposes the same
//! operations to an LLM as a callable tool.

pub mod manager;

// Re-export commonly used items at the module level.
pub use manager::{
    CompactionReport, ContextConfig, ContextError, ContextManager, ContextStats, ContextStatus,
    TrackedMessage, UsageReport,
};
