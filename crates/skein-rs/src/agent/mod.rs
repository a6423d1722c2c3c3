//! Agent building blocks: the function-calling loop and sub-agent
//! delegation.
//!
//! [`AgentLoop`] is the dispatch loop demos build on: send messages with
//! tool definitions, execute whatever the model calls, append results, and
//! repeat until it answers in plain text or the turn budget runs out.
//! [`SubAgent`] is the delegation primitive: a named worker with its own
//! system prompt that handles one task per call, so a main agent can hand
//! off planning or implementation and only read back compact results.

pub mod runner;
pub mod sub_agent;

// Re-export commonly used items at the module level.
pub use runner::{AgentLoop, LoopConfig, LoopResult};
pub use sub_agent::{
    DECOMPOSER_PROMPT, IMPLEMENTER_PROMPT, PLANNER_PROMPT, SubAgent, first_task,
};
