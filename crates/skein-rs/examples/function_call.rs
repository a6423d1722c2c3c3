//! Function-calling demo — the model picks and drives the built-in tools.
//!
//! Runs four scenarios: a weather lookup, an exact calculation, a
//! multi-tool request, and a plain chat without tools.
//!
//! # Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run --example function_call
//! ```

use skein_rs::prelude::*;

#[tokio::main]
async fn main() -> Result<(), String> {
    skein_rs::logging::init("info");

    let settings = Settings::from_env();
    let client = settings.client()?;

    let tools = ToolSet::new()
        .with(Calculator)
        .with(Clock)
        .with(Weather)
        .with_arg_validation(true);

    let config = LoopConfig::new(&settings.model).with_max_turns(5);

    let scenarios = [
        ("weather lookup", "What's the weather like in beijing today?"),
        ("exact math", "Compute (123+456)*789 for me."),
        (
            "multi-tool",
            "What time is it in Tokyo? If it's afternoon there, check the weather in shanghai too.",
        ),
    ];

    for (label, prompt) in scenarios {
        println!("\n-- {label} --");
        println!("user: {prompt}");

        let result = AgentLoop::new(&client, &tools, config.clone())
            .run(vec![Message::user(prompt)])
            .await?;

        println!("assistant: {}", result.content);
        println!("({} turn(s), {} API tokens)", result.turns_used, result.total_tokens);
    }

    // Plain chat, no tools involved.
    println!("\n-- plain chat --");
    let reply = client
        .chat_simple(&settings.model, None, "Introduce yourself in one sentence.")
        .await?;
    println!("assistant: {reply}");

    Ok(())
}
