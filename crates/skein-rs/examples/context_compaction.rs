//! Context management walkthrough — runs entirely offline.
//!
//! Feeds a scripted conversation through a [`ContextManager`], shows the
//! usage statistics, triggers compaction, and then drives the same manager
//! through the `manage_context` tool interface the way an LLM would.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example context_compaction
//! ```

use skein_rs::prelude::*;

#[tokio::main]
async fn main() -> Result<(), String> {
    skein_rs::logging::init("info");

    // A small ceiling so the scripted conversation actually crosses the
    // compaction threshold.
    let config = ContextConfig::new()
        .with_max_tokens(100)
        .with_compression_threshold(0.7);
    let manager = ContextManager::new(config).map_err(|e| e.to_string())?;
    let tool = ContextTool::with_manager(manager);
    let ctx = tool.handle();

    // ── 1. Scripted conversation ────────────────────────────────
    println!("-- feeding conversation --");
    let script: &[(&str, &str, Option<&str>)] = &[
        ("user", "analyze the project code structure", None),
        ("assistant", "analyzing the project now...", Some("task_001")),
        ("tool", "found 3 main modules: auth, api, utils", Some("task_001")),
        ("assistant", "analysis done; I suggest refactoring module by module", None),
        ("user", "explain the first module in detail", None),
        ("assistant", "the first module is the authentication system...", None),
        ("user", "refactor that module for me", None),
        ("assistant", "starting the refactor...", Some("task_002")),
        ("tool", "refactor finished, tests passing", Some("task_002")),
        ("assistant", "refactor complete; main improvement is JWT support", None),
    ];

    {
        let mut ctx = ctx.lock().map_err(|_| "context lock poisoned")?;
        for (role, content, task) in script {
            match task {
                Some(task) => {
                    let role = role.parse().map_err(|e: ContextError| e.to_string())?;
                    ctx.append_tagged(role, *content, *task);
                }
                None => {
                    ctx.append_raw(role, content).map_err(|e| e.to_string())?;
                }
            }
            println!("  [{role}] {content}");
        }

        // ── 2. Statistics and threshold check ───────────────────
        let stats = ctx.stats();
        println!("\n-- context stats --");
        println!("  messages:   {}", stats.message_count);
        println!("  tokens:     ~{}/{}", stats.total_tokens, stats.max_tokens);
        println!("  usage:      {:.1}%", stats.usage_ratio * 100.0);
        println!("  roles:      {:?}", stats.role_breakdown);
        println!("  tasks:      {:?}", stats.task_breakdown);

        if ctx.should_compress() {
            let report = ctx.compact();
            println!("\n-- compaction --");
            println!("  before:  ~{} tokens", report.tokens_before);
            println!("  after:   ~{} tokens", report.tokens_after);
            println!(
                "  dropped: {} messages (~{} tokens freed)",
                report.removed, report.tokens_freed
            );
        }
    }

    // ── 3. The same manager through the tool interface ──────────
    println!("\n-- tool interface --");
    for args in [
        r#"{"action": "monitor"}"#,
        r#"{"action": "recent", "n": 3}"#,
        r#"{"action": "stats"}"#,
    ] {
        let result = tool.execute(args).await;
        let parsed: serde_json::Value =
            serde_json::from_str(&result).map_err(|e| e.to_string())?;
        println!("  {args}");
        println!("    -> {}", parsed["message"]);
    }

    Ok(())
}
