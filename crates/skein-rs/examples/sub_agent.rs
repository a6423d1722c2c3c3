//! Sub-agent delegation demo — a planner feeds an implementer.
//!
//! The main function only splits the roles: the planner sub-agent breaks
//! the goal into tasks, and the implementer sub-agent turns the first task
//! into a concrete checklist.
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run --example sub_agent
//! ```

use skein_rs::prelude::*;

#[tokio::main]
async fn main() -> Result<(), String> {
    skein_rs::logging::init("info");

    let settings = Settings::from_env();
    let client = settings.client()?;

    let goal = "Build a personal tech blog with basic visitor statistics, within one week.";
    println!("main agent: received goal\n  {goal}");

    println!("\nsub-agent 1: planner working...");
    let planner = SubAgent::planner(&client, &settings.model);
    let plan = planner.run(goal).await?;
    println!("{plan}");

    let Some(task) = first_task(&plan) else {
        eprintln!("could not extract a first task from the plan");
        return Ok(());
    };

    println!("\nsub-agent 2: implementer detailing the first task...");
    let implementer = SubAgent::implementer(&client, &settings.model);
    let detail = implementer.run(task).await?;
    println!("{detail}");

    Ok(())
}
