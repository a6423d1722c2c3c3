//! The [`Tool`] trait and [`ToolSet`] dispatcher.
//!
//! A tool provides a static definition (name, description, JSON Schema
//! parameters) and an async `execute` over the raw JSON argument string.
//! Errors are returned as result strings, never panics — whatever a tool
//! produces goes back to the LLM as a tool message either way.

use crate::ToolDef;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, trace};

/// Maximum size (in bytes) for tool output before truncation.
pub const DEFAULT_MAX_RESULT_BYTES: usize = 30_000;

/// Boxed future returned by [`Tool::execute`].
///
/// Type alias to keep trait signatures and implementations readable.
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = String> + Send + 'a>>;

// ── Tool trait ─────────────────────────────────────────────────────

/// A tool that an LLM can invoke via function-calling.
///
/// Uses a boxed future for `execute` so the trait stays dyn-compatible.
pub trait Tool: Send + Sync {
    /// The tool definition sent to the LLM API.
    fn definition(&self) -> ToolDef;

    /// Execute the tool with the given raw JSON arguments string.
    ///
    /// Failures should come back as `{"success": false, "error": ...}`
    /// result strings so the model can read and self-correct.
    fn execute(&self, arguments: &str) -> ToolFuture<'_>;

    /// The tool's name (convenience — delegates to definition).
    fn name(&self) -> String {
        self.definition().function.name.clone()
    }
}

// ── ToolSet ────────────────────────────────────────────────────────

/// A collection of tools dispatched by name.
///
/// Handles registration, definition export for the LLM API, and dispatch
/// with optional JSON Schema argument validation, timing, and truncation.
///
/// # Example
///
/// ```ignore
/// let tools = ToolSet::new()
///     .with(Calculator)
///     .with(Clock)
///     .with_if(allow_email, Email::new())
///     .with_arg_validation(true);
///
/// let defs = tools.definitions();
/// let result = tools.execute("calculate", r#"{"expression": "2+2"}"#).await;
/// ```
pub struct ToolSet {
    tools: HashMap<String, Box<dyn Tool>>,
    max_result_bytes: usize,
    /// Whether to validate arguments against the declared schema first.
    validate_args: bool,
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("max_result_bytes", &self.max_result_bytes)
            .finish()
    }
}

impl ToolSet {
    /// Create an empty tool set.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            max_result_bytes: DEFAULT_MAX_RESULT_BYTES,
            validate_args: false,
        }
    }

    /// Set the maximum result size in bytes before truncation.
    pub fn with_max_result_bytes(mut self, max: usize) -> Self {
        self.max_result_bytes = max;
        self
    }

    /// Enable JSON Schema argument validation before tool execution.
    pub fn with_arg_validation(mut self, enabled: bool) -> Self {
        self.validate_args = enabled;
        self
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    /// Register a tool (builder pattern).
    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    /// Conditionally register a tool, keeping the builder chain intact:
    ///
    /// ```ignore
    /// let tools = ToolSet::new()
    ///     .with(Calculator)
    ///     .with_if(allow_email, Email::new());
    /// ```
    pub fn with_if(self, condition: bool, tool: impl Tool + 'static) -> Self {
        if condition { self.with(tool) } else { self }
    }

    /// Return all tool definitions for the LLM API.
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool call by name, with optional validation, timing, and
    /// truncation. Returns an error string if the tool name is unknown.
    pub async fn execute(&self, name: &str, arguments: &str) -> String {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => return format!("Error: unknown tool '{name}'"),
        };

        if self.validate_args
            && let Some(error) = validate_tool_arguments(tool.as_ref(), arguments)
        {
            return error;
        }

        log_tool_call(name, arguments);
        let start = std::time::Instant::now();

        let result = tool.execute(arguments).await;

        let elapsed = start.elapsed();
        debug!(
            "Tool {name} completed in {:.0}ms ({} bytes)",
            elapsed.as_secs_f64() * 1000.0,
            result.len()
        );

        truncate_result(result, self.max_result_bytes)
    }
}

impl Default for ToolSet {
    fn default() -> Self {
        Self::new()
    }
}

// ── DisabledTool ───────────────────────────────────────────────────

/// A tool that always returns an error message when executed.
///
/// Registers a gated-off variant of a tool that the LLM can still see in
/// its tool list (same name, description, and schema) but cannot invoke.
pub struct DisabledTool {
    def: ToolDef,
    reason: String,
}

impl DisabledTool {
    /// Create a disabled tool with the given definition and error reason.
    ///
    /// When executed, returns `"Error: {reason}"`.
    pub fn new(def: ToolDef, reason: impl Into<String>) -> Self {
        Self {
            def,
            reason: reason.into(),
        }
    }

    /// Create a disabled variant of an existing tool, keeping its
    /// definition visible while execution returns the given reason.
    pub fn from_tool(tool: &dyn Tool, reason: impl Into<String>) -> Self {
        Self {
            def: tool.definition(),
            reason: reason.into(),
        }
    }
}

impl Tool for DisabledTool {
    fn definition(&self) -> ToolDef {
        self.def.clone()
    }

    fn execute(&self, _arguments: &str) -> ToolFuture<'_> {
        let msg = format!("Error: {}", self.reason);
        Box::pin(async move { msg })
    }
}

// ── FnTool ─────────────────────────────────────────────────────────

/// Type-erased async handler for [`FnTool`].
type ErasedToolHandler =
    Box<dyn Fn(String) -> Pin<Box<dyn Future<Output = String> + Send>> + Send + Sync>;

/// A closure-based tool that auto-parses arguments and delegates to a
/// handler.
///
/// Use for stateless tools whose logic is a pure async function; tools
/// with shared state (a client, a managed context) implement [`Tool`]
/// directly.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct GreetArgs {
///     name: String,
/// }
///
/// let tool = FnTool::new(
///     ToolDef::new("greet", "Greet someone by name", json_schema_for::<GreetArgs>()),
///     |args: GreetArgs| async move { format!("hello, {}", args.name) },
/// );
/// ```
pub struct FnTool {
    def: ToolDef,
    handler: ErasedToolHandler,
}

impl FnTool {
    /// Create a new closure-based tool. The handler receives parsed
    /// arguments of type `A`; parse errors are formatted for the LLM.
    pub fn new<A, F, Fut>(def: ToolDef, handler: F) -> Self
    where
        A: serde::de::DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        let erased = move |raw: String| -> Pin<Box<dyn Future<Output = String> + Send>> {
            let args: A = match serde_json::from_str(&raw) {
                Ok(a) => a,
                Err(e) => {
                    return Box::pin(async move {
                        format!(
                            "Error: invalid tool arguments: {e}. \
                             Please provide valid JSON matching the tool's parameter schema."
                        )
                    });
                }
            };
            Box::pin(handler(args))
        };

        Self {
            def,
            handler: Box::new(erased),
        }
    }
}

impl Tool for FnTool {
    fn definition(&self) -> ToolDef {
        self.def.clone()
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        Box::pin((self.handler)(arguments.to_string()))
    }
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.def.function.name)
            .finish()
    }
}

// ── Helpers ────────────────────────────────────────────────────────

/// Validate tool arguments against the tool's declared JSON Schema.
///
/// Returns `None` if valid, or `Some(error_string)` formatted for the LLM
/// to self-correct.
pub fn validate_tool_arguments(tool: &dyn Tool, arguments: &str) -> Option<String> {
    let args_value: serde_json::Value = match serde_json::from_str(arguments) {
        Ok(v) => v,
        Err(e) => {
            return Some(format!(
                "Error: invalid JSON arguments for tool '{}': {e}. \
                 Please provide valid JSON matching the tool's parameter schema.",
                tool.name()
            ));
        }
    };

    let schema = tool.definition().function.parameters;
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(_) => return None, // If schema itself is invalid, skip validation.
    };

    let errors: Vec<String> = validator
        .iter_errors(&args_value)
        .map(|e| format!("  - {}: {e}", e.instance_path()))
        .collect();

    if errors.is_empty() {
        None
    } else {
        Some(format!(
            "Error: argument validation failed for tool '{}':\n{}\n\
             Please fix the arguments and try again.",
            tool.name(),
            errors.join("\n")
        ))
    }
}

/// Log a tool call at INFO level with a truncated preview of arguments.
pub fn log_tool_call(name: &str, arguments: &str) {
    let args_preview: String = arguments.chars().take(120).collect();
    info!(
        "[tool] {}({args_preview}{})",
        name,
        if arguments.len() > 120 { "..." } else { "" }
    );
    trace!("[tool] {name} arguments: {arguments}");
}

/// Truncate a string to at most `max` bytes, appending a notice if trimmed.
pub fn truncate_result(s: String, max: usize) -> String {
    if s.len() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...\n[truncated: {} bytes total]", s.len())
    } else {
        s
    }
}

/// Parse raw JSON arguments into a typed struct.
///
/// Returns a formatted error string suitable for returning directly from
/// [`Tool::execute`] — the LLM will see the error and self-correct.
pub fn parse_tool_args<T: serde::de::DeserializeOwned>(arguments: &str) -> Result<T, String> {
    serde_json::from_str(arguments).map_err(|e| {
        serde_json::json!({
            "success": false,
            "error": format!(
                "invalid tool arguments: {e}. Provide valid JSON matching the parameter schema."
            ),
        })
        .to_string()
    })
}
