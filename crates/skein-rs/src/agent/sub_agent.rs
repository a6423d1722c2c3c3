//! Sub-agent delegation: named one-shot workers over a shared client.
//!
//! The main agent only splits the work and reads compact results; the
//! actual thinking happens inside each sub-agent's own prompt. A
//! [`SubAgent`] is deliberately minimal — a name, a system prompt, and a
//! model — because the demos it powers are single-pass prompt/response
//! flows, not nested tool loops.

use crate::ChatClient;
use tracing::info;

/// System prompt for the task-decomposition worker.
pub const DECOMPOSER_PROMPT: &str = "\
You are a task decomposition assistant for developers with no prior \
experience. Break the goal into 3-7 steps, as simply as possible.
Requirements:
1. First restate the goal you understood in one sentence.
2. Then output 'Steps:' followed by the steps in order, one per line, \
formatted as `number. step name — one-sentence explanation`.
3. Finally output 'Next:' with 1-2 subtasks ready to hand to an agent.";

/// System prompt for the planning sub-agent.
pub const PLANNER_PROMPT: &str = "\
You are a project planning sub-agent. Break the high-level goal into 3-7 \
small tasks, listed in order. Output only the task list, one step per line.";

/// System prompt for the implementation sub-agent.
pub const IMPLEMENTER_PROMPT: &str = "\
You are an implementation sub-agent. For the single task you are given, \
produce a very concrete execution plan as a checklist of 3-5 actions.";

/// A named one-shot worker with its own system prompt.
///
/// # Example
///
/// ```ignore
/// let planner = SubAgent::planner(&client, "gpt-4-turbo");
/// let plan = planner.run("build a personal blog in a week").await?;
///
/// if let Some(task) = first_task(&plan) {
///     let detail = SubAgent::implementer(&client, "gpt-4-turbo").run(task).await?;
///     println!("{detail}");
/// }
/// ```
pub struct SubAgent<'a> {
    name: String,
    system_prompt: String,
    model: String,
    client: &'a ChatClient,
}

impl<'a> SubAgent<'a> {
    pub fn new(
        client: &'a ChatClient,
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            model: model.into(),
            client,
        }
    }

    /// The canned task-decomposition worker.
    pub fn decomposer(client: &'a ChatClient, model: impl Into<String>) -> Self {
        Self::new(client, "decomposer", DECOMPOSER_PROMPT, model)
    }

    /// The canned planning worker.
    pub fn planner(client: &'a ChatClient, model: impl Into<String>) -> Self {
        Self::new(client, "planner", PLANNER_PROMPT, model)
    }

    /// The canned implementation worker.
    pub fn implementer(client: &'a ChatClient, model: impl Into<String>) -> Self {
        Self::new(client, "implementer", IMPLEMENTER_PROMPT, model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle one task: a single system-prompted completion.
    pub async fn run(&self, task: &str) -> Result<String, String> {
        info!("sub-agent '{}' starting on: {task}", self.name);
        let output = self
            .client
            .chat_simple(&self.model, Some(&self.system_prompt), task)
            .await?;
        info!(
            "sub-agent '{}' finished ({} chars)",
            self.name,
            output.len()
        );
        Ok(output)
    }
}

/// Pull the first task line out of a planner's output.
pub fn first_task(plan: &str) -> Option<&str> {
    plan.lines().map(str::trim).find(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_task_skips_blank_lines() {
        let plan = "\n  \n1. set up the repository\n2. write the parser\n";
        assert_eq!(first_task(plan), Some("1. set up the repository"));
    }

    #[test]
    fn first_task_empty_plan() {
        assert_eq!(first_task(""), None);
        assert_eq!(first_task("   \n  "), None);
    }

    #[test]
    fn canned_workers_are_named() {
        let client = ChatClient::new("test-key").expect("client builds");
        assert_eq!(SubAgent::decomposer(&client, "m").name(), "decomposer");
        assert_eq!(SubAgent::planner(&client, "m").name(), "planner");
        assert_eq!(SubAgent::implementer(&client, "m").name(), "implementer");
    }
}
