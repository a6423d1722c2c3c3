//! Task decomposition demo — hand a fuzzy goal to the decomposer worker.
//!
//! The code does no planning of its own; the LLM owns the breakdown and
//! the program only orchestrates.
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run --example task_decomposer
//! ```

use skein_rs::prelude::*;

#[tokio::main]
async fn main() -> Result<(), String> {
    skein_rs::logging::init("info");

    let settings = Settings::from_env();
    let client = settings.client()?;

    let goal = "Build a personal blog that can publish articles, within one week.";
    println!("goal: {goal}\n");

    let decomposer = SubAgent::decomposer(&client, &settings.model);
    let plan = decomposer.run(goal).await?;

    println!("{plan}");
    Ok(())
}
