//! The `send_email` tool: validated mock delivery.
//!
//! Validates recipient addresses, caps subject and body length, and blocks
//! obviously sensitive content before "sending" (a mock that returns a
//! delivery id). Sending is a side-effecting operation, so the CLI
//! registers this tool behind a [`DisabledTool`](crate::tools::DisabledTool)
//! gate unless explicitly enabled.

use crate::ToolDef;
use crate::tools::core::{Tool, ToolFuture};
use crate::tools::spec::ToolSpec;
use chrono::Utc;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{info, warn};

const MAX_SUBJECT_LEN: usize = 100;
const MAX_BODY_LEN: usize = 50_000;

/// Keywords that block delivery outright.
const SENSITIVE_KEYWORDS: &[&str] = &["password", "credit card", "social security", "cvv"];

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .unwrap_or_else(|e| unreachable!("static email pattern is valid: {e}"))
    })
}

/// Typed arguments for the `send_email` tool.
#[derive(Deserialize, JsonSchema)]
pub struct EmailArgs {
    /// Recipient address.
    pub to: String,
    /// Subject line, at most 100 characters.
    pub subject: String,
    /// Message body.
    pub body: String,
    /// Optional CC address.
    #[serde(default)]
    pub cc: Option<String>,
}

/// Mock email delivery tool.
pub struct Email;

impl Email {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for Email {
    fn definition(&self) -> ToolDef {
        ToolSpec::builder("send_email")
            .purpose("Send an email notification, reminder, or report")
            .when_to_use("When the user explicitly asks to email someone a message or summary")
            .when_not_to_use("To show the user text directly — just answer in the conversation")
            .parameters_for::<EmailArgs>()
            .example(
                "send_email(to='team@example.com', subject='Daily report', body='...')",
                "delivery id and timestamp",
            )
            .output_format(
                "JSON: {success, data: {email_id, sent_at, to, subject}} \
                 or {success: false, error}",
            )
            .to_tool_def()
    }

    fn execute(&self, arguments: &str) -> ToolFuture<'_> {
        let arguments = arguments.to_string();
        Box::pin(async move {
            let args: EmailArgs = match crate::tools::core::parse_tool_args(&arguments) {
                Ok(a) => a,
                Err(e) => return e,
            };

            if let Err(e) = validate(&args) {
                warn!("email blocked: {e}");
                return serde_json::json!({ "success": false, "error": e }).to_string();
            }

            // Mock delivery; a real deployment swaps in SMTP or a provider API.
            let email_id = uuid::Uuid::new_v4().to_string();
            info!("email sent to {} (subject: {})", args.to, args.subject);

            serde_json::json!({
                "success": true,
                "data": {
                    "email_id": email_id,
                    "sent_at": Utc::now().to_rfc3339(),
                    "to": args.to,
                    "subject": args.subject,
                },
            })
            .to_string()
        })
    }
}

fn validate(args: &EmailArgs) -> Result<(), String> {
    if !email_pattern().is_match(&args.to) {
        return Err(format!("invalid recipient address: {}", args.to));
    }
    if let Some(ref cc) = args.cc
        && !email_pattern().is_match(cc)
    {
        return Err(format!("invalid cc address: {cc}"));
    }
    if args.subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(format!("subject exceeds {MAX_SUBJECT_LEN} characters"));
    }
    if args.body.chars().count() > MAX_BODY_LEN {
        return Err(format!("body exceeds {MAX_BODY_LEN} characters"));
    }
    let lowered = args.body.to_lowercase();
    if SENSITIVE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return Err("body contains sensitive content; delivery refused".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(to: &str, subject: &str, body: &str) -> EmailArgs {
        EmailArgs {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            cc: None,
        }
    }

    #[test]
    fn accepts_well_formed_mail() {
        assert!(validate(&args("test@example.com", "hello", "a quick note")).is_ok());
    }

    #[test]
    fn rejects_bad_addresses() {
        assert!(validate(&args("not-an-address", "s", "b")).is_err());
        assert!(validate(&args("missing@tld", "s", "b")).is_err());

        let mut with_cc = args("ok@example.com", "s", "b");
        with_cc.cc = Some("also bad".into());
        assert!(validate(&with_cc).is_err());
    }

    #[test]
    fn rejects_oversized_fields() {
        assert!(validate(&args("a@b.com", &"s".repeat(101), "b")).is_err());
        assert!(validate(&args("a@b.com", "s", &"b".repeat(50_001))).is_err());
    }

    #[test]
    fn blocks_sensitive_content() {
        let err = validate(&args("a@b.com", "s", "here is my Password: hunter2")).unwrap_err();
        assert!(err.contains("sensitive"));
    }

    #[tokio::test]
    async fn successful_send_returns_delivery_id() {
        let result = Email::new()
            .execute(r#"{"to": "test@example.com", "subject": "hi", "body": "test"}"#)
            .await;
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["success"], true);
        assert!(!parsed["data"]["email_id"].as_str().unwrap().is_empty());
        assert_eq!(parsed["data"]["to"], "test@example.com");
    }

    #[tokio::test]
    async fn invalid_recipient_is_an_error_envelope() {
        let result = Email::new()
            .execute(r#"{"to": "nope", "subject": "hi", "body": "test"}"#)
            .await;
        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["success"], false);
    }
}
