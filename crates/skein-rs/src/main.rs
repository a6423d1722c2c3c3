//! Send a chat-completion request and print the response, optionally
//! running the function-calling loop with the built-in demo tools.
//!
//! Reads configuration from the environment: `OPENAI_API_KEY` (required),
//! `OPENAI_BASE_URL`, `DEFAULT_MODEL`, `RATE_LIMIT_PER_MINUTE`,
//! `MAX_RETRIES`, `LOG_LEVEL`.
//!
//! # Examples
//!
//! ```sh
//! # Basic request
//! skein --user "Summarize what a context window is"
//!
//! # With system prompt and model selection
//! skein --system "You are terse." --user "Why compact a conversation log?" \
//!   --model gpt-4-turbo
//!
//! # Pipe content from stdin
//! cat notes.md | skein --system "Review these notes." --stdin
//!
//! # Tool-use loop with the built-in tools
//! skein --user "What's the weather in beijing, and what is (123+456)*789?" \
//!   --with-tools --max-turns 5 --context-stats
//! ```

use clap::Parser;
use skein_rs::config::Settings;
use skein_rs::prelude::*;
use std::io::{self, Read};
use std::process;

/// Send a chat-completion request, or run the built-in tool loop.
#[derive(Parser)]
#[command(name = "skein")]
struct Cli {
    // ── Message content ────────────────────────────────────────
    /// System prompt to set the assistant's behavior
    #[arg(long)]
    system: Option<String>,

    /// User message to send
    #[arg(long)]
    user: Option<String>,

    /// Read user content from stdin
    #[arg(long)]
    stdin: bool,

    // ── Model and sampling ─────────────────────────────────────
    /// Model to use (defaults to DEFAULT_MODEL from the environment)
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature (0.0 = deterministic)
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    /// Maximum tokens in each response
    #[arg(long, default_value_t = 1024)]
    max_tokens: u32,

    // ── Tool use ───────────────────────────────────────────────
    /// Register the built-in tools and loop until a text answer
    #[arg(long)]
    with_tools: bool,

    /// Maximum tool-use turns (with --with-tools)
    #[arg(long, default_value_t = 5)]
    max_turns: u32,

    /// Enable the send_email tool (registered but refusing otherwise)
    #[arg(long)]
    allow_email: bool,

    // ── Output ─────────────────────────────────────────────────
    /// Print managed-context statistics after a tool run
    #[arg(long)]
    context_stats: bool,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,
}

fn read_stdin_content() -> Result<String, String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .map_err(|e| format!("failed to read stdin: {e}"))?;
    Ok(buf)
}

fn build_user_content(cli: &Cli) -> Result<String, String> {
    let stdin_text = if cli.stdin {
        Some(read_stdin_content()?)
    } else {
        None
    };

    match (&cli.user, stdin_text) {
        (Some(msg), Some(piped)) => Ok(format!("{msg}\n\n{piped}")),
        (Some(msg), None) => Ok(msg.clone()),
        (None, Some(piped)) => Ok(piped),
        (None, None) => Err("provide --user, --stdin, or both".to_string()),
    }
}

/// The built-in demo tool set: calculator, clock, weather, gated email,
/// and the managed-context tool.
fn build_tools(allow_email: bool, context_tool: ContextTool) -> ToolSet {
    ToolSet::new()
        .with(Calculator)
        .with(Clock)
        .with(Weather)
        .with_if(allow_email, Email::new())
        .with_if(
            !allow_email,
            DisabledTool::from_tool(&Email::new(), "Email sending is off. Run with --allow-email."),
        )
        .with(context_tool)
}

async fn send_request(cli: &Cli, settings: &Settings) -> Result<String, String> {
    let user_content = build_user_content(cli)?;
    let client = settings.client()?;
    let model = cli.model.clone().unwrap_or_else(|| settings.model.clone());

    let mut messages = Vec::new();
    if let Some(sys) = &cli.system {
        messages.push(Message::system(sys));
    }
    messages.push(Message::user(&user_content));

    // ── Single-shot mode ────────────────────────────────────────
    if !cli.with_tools {
        let request = ChatRequest {
            model,
            messages,
            max_tokens: cli.max_tokens,
            temperature: cli.temperature,
            ..Default::default()
        };
        let completion = client.chat(&request).await?;
        return Ok(completion.content.unwrap_or_default());
    }

    // ── Tool-use loop ───────────────────────────────────────────
    let context_tool = ContextTool::new();
    let context = context_tool.handle();
    let tools = build_tools(cli.allow_email, context_tool);

    let config = LoopConfig::new(model)
        .with_max_turns(cli.max_turns)
        .with_max_tokens(cli.max_tokens)
        .with_temperature(cli.temperature);

    let result = AgentLoop::new(&client, &tools, config)
        .with_context(context.clone())
        .run(messages)
        .await?;

    let mut output = result.content;
    eprintln!(
        "  [loop] {} turn(s), {} API tokens",
        result.turns_used, result.total_tokens
    );

    if cli.context_stats {
        let ctx = context.lock().unwrap_or_else(|e| e.into_inner());
        let stats = serde_json::to_string_pretty(&ctx.stats())
            .map_err(|e| format!("failed to format context stats: {e}"))?;
        output.push_str("\n\n[context stats]\n");
        output.push_str(&stats);
    }

    Ok(output)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let settings = Settings::from_env();

    let level = if cli.verbose {
        "debug"
    } else {
        settings.log_level.as_str()
    };
    skein_rs::logging::init(level);

    match send_request(&cli, &settings).await {
        Ok(response) => println!("{response}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
