//! Structured tool descriptions.
//!
//! `ToolSpec` replaces free-form description strings with structured
//! metadata: purpose, when to use, when NOT to use, examples, and output
//! format. The when-not-to-use line is the highest-value field — it keeps
//! the LLM from confusing semantically similar tools.

use crate::ToolDef;

/// A structured tool specification with usage guidance.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Tool name (must be unique within a ToolSet).
    pub name: String,
    /// One-sentence imperative purpose: "Evaluate an arithmetic expression".
    pub purpose: String,
    /// When this tool should be used.
    pub when_to_use: String,
    /// When this tool should NOT be used.
    pub when_not_to_use: String,
    /// Parameter schema.
    pub parameters: serde_json::Value,
    /// Usage examples as (input, expected behavior) pairs.
    pub examples: Vec<UsageExample>,
    /// Description of the output format.
    pub output_format: String,
}

/// A usage example for a tool.
#[derive(Debug, Clone)]
pub struct UsageExample {
    pub input: String,
    pub output: String,
}

impl ToolSpec {
    /// Create a new ToolSpec builder.
    pub fn builder(name: impl Into<String>) -> ToolSpecBuilder {
        ToolSpecBuilder {
            name: name.into(),
            purpose: None,
            when_to_use: None,
            when_not_to_use: None,
            parameters: None,
            examples: Vec::new(),
            output_format: None,
        }
    }

    /// Render the structured fields into a rich description string.
    pub fn to_description(&self) -> String {
        let mut desc = format!("{}.", self.purpose);
        desc.push_str(&format!("\nWhen to use: {}", self.when_to_use));
        desc.push_str(&format!("\nWhen NOT to use: {}", self.when_not_to_use));

        if !self.examples.is_empty() {
            desc.push_str("\nExamples:");
            for ex in &self.examples {
                desc.push_str(&format!("\n  - {} -> {}", ex.input, ex.output));
            }
        }

        if !self.output_format.is_empty() {
            desc.push_str(&format!("\nOutput format: {}", self.output_format));
        }

        desc
    }

    /// Convert to the standard [`ToolDef`] used by the API.
    pub fn to_tool_def(&self) -> ToolDef {
        ToolDef::new(
            self.name.clone(),
            self.to_description(),
            self.parameters.clone(),
        )
    }
}

/// Builder for a [`ToolSpec`]. Panics on `build()` if a required field is
/// missing — completeness is enforced at registration time.
pub struct ToolSpecBuilder {
    name: String,
    purpose: Option<String>,
    when_to_use: Option<String>,
    when_not_to_use: Option<String>,
    parameters: Option<serde_json::Value>,
    examples: Vec<UsageExample>,
    output_format: Option<String>,
}

impl ToolSpecBuilder {
    pub fn purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    pub fn when_to_use(mut self, when: impl Into<String>) -> Self {
        self.when_to_use = Some(when.into());
        self
    }

    pub fn when_not_to_use(mut self, when_not: impl Into<String>) -> Self {
        self.when_not_to_use = Some(when_not.into());
        self
    }

    pub fn parameters(mut self, params: serde_json::Value) -> Self {
        self.parameters = Some(params);
        self
    }

    /// Derive the parameter schema from a `schemars::JsonSchema` type, so
    /// the schema and the deserialization logic can never diverge.
    pub fn parameters_for<T: schemars::JsonSchema>(self) -> Self {
        self.parameters(crate::json_schema_for::<T>())
    }

    pub fn example(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.examples.push(UsageExample {
            input: input.into(),
            output: output.into(),
        });
        self
    }

    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    /// Shortcut: build the spec and immediately convert to [`ToolDef`].
    pub fn to_tool_def(self) -> ToolDef {
        self.build().to_tool_def()
    }

    /// Build the `ToolSpec`. Panics if required fields are missing.
    pub fn build(self) -> ToolSpec {
        ToolSpec {
            name: self.name,
            purpose: self.purpose.expect("ToolSpec requires 'purpose'"),
            when_to_use: self.when_to_use.expect("ToolSpec requires 'when_to_use'"),
            when_not_to_use: self
                .when_not_to_use
                .expect("ToolSpec requires 'when_not_to_use'"),
            parameters: self.parameters.expect("ToolSpec requires 'parameters'"),
            examples: self.examples,
            output_format: self.output_format.unwrap_or_else(|| "JSON object".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tool_spec() {
        let spec = ToolSpec::builder("calculate")
            .purpose("Evaluate an arithmetic expression")
            .when_to_use("When the user needs an exact numeric result")
            .when_not_to_use("For date math — use get_current_time instead")
            .parameters(serde_json::json!({
                "type": "object",
                "properties": { "expression": { "type": "string" } },
                "required": ["expression"]
            }))
            .example("calculate(expression='2+2')", "4")
            .build();

        assert_eq!(spec.name, "calculate");
        let desc = spec.to_description();
        assert!(desc.contains("When NOT to use:"));
        assert!(desc.contains("get_current_time"));
    }

    #[test]
    fn to_tool_def_conversion() {
        let def = ToolSpec::builder("probe")
            .purpose("A probe tool")
            .when_to_use("When probing")
            .when_not_to_use("Otherwise")
            .parameters(serde_json::json!({"type": "object", "properties": {}}))
            .to_tool_def();

        assert_eq!(def.function.name, "probe");
        assert!(def.function.description.contains("A probe tool"));
    }

    #[test]
    #[should_panic(expected = "ToolSpec requires 'purpose'")]
    fn builder_panics_on_missing_purpose() {
        ToolSpec::builder("incomplete")
            .when_to_use("test")
            .when_not_to_use("test")
            .parameters(serde_json::json!({}))
            .build();
    }
}
