//! The context manager: an ordered conversation log with token accounting,
//! usage tiers, and policy-driven compaction.
//!
//! Token costs are a crude length-based estimate (`ceil(chars × factor)`,
//! ~3.3 characters per token by default) standing in for a real tokenizer.
//! Replacing it with a real tokenizer would shift every threshold in this
//! module, so the estimate is part of the contract, not an implementation
//! detail.

use crate::{Message, MessageRole};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Default context ceiling in estimated tokens.
pub const DEFAULT_MAX_TOKENS: usize = 4000;

/// Default fraction of `max_tokens` at which compaction becomes due.
pub const DEFAULT_COMPRESSION_THRESHOLD: f64 = 0.8;

/// Default estimated tokens per character (~3.3 characters per token).
pub const DEFAULT_TOKEN_FACTOR: f64 = 0.3;

/// Default number of most-recent non-user messages retained by compaction.
pub const DEFAULT_RETAIN_RECENT: usize = 5;

/// Usage fraction at which [`ContextStatus::Warning`] begins.
const WARNING_RATIO: f64 = 0.7;

// ── Errors ─────────────────────────────────────────────────────────

/// Failures surfaced by the context manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A role string outside {system, user, assistant, tool}.
    InvalidRole(String),
    /// A configuration rejected at construction time.
    InvalidConfig(String),
}

impl std::fmt::Display for ContextError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextError::InvalidRole(role) => {
                write!(
                    f,
                    "invalid role '{role}': expected one of system, user, assistant, tool"
                )
            }
            ContextError::InvalidConfig(reason) => write!(f, "invalid context config: {reason}"),
        }
    }
}

impl std::error::Error for ContextError {}

impl std::str::FromStr for MessageRole {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "tool" => Ok(MessageRole::Tool),
            other => Err(ContextError::InvalidRole(other.to_string())),
        }
    }
}

// ── Configuration ──────────────────────────────────────────────────

/// Constructor-time configuration for a [`ContextManager`].
///
/// Validated by [`ContextManager::new`]: the threshold must lie in
/// `(0, 1]`, and both `max_tokens` and `token_factor` must be positive.
/// Nothing here is mutable after construction.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Context ceiling in estimated tokens.
    pub max_tokens: usize,
    /// Fraction of `max_tokens` at which compaction becomes due.
    pub compression_threshold: f64,
    /// Estimated tokens per character.
    pub token_factor: f64,
    /// Most-recent non-user messages retained by compaction.
    pub retain_recent: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            token_factor: DEFAULT_TOKEN_FACTOR,
            retain_recent: DEFAULT_RETAIN_RECENT,
        }
    }
}

impl ContextConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the context ceiling (in estimated tokens).
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    /// Override the compaction threshold fraction.
    pub fn with_compression_threshold(mut self, threshold: f64) -> Self {
        self.compression_threshold = threshold;
        self
    }

    /// Override the tokens-per-character estimation factor.
    pub fn with_token_factor(mut self, factor: f64) -> Self {
        self.token_factor = factor;
        self
    }

    /// Override how many recent non-user messages compaction retains.
    pub fn with_retain_recent(mut self, count: usize) -> Self {
        self.retain_recent = count;
        self
    }

    fn validate(&self) -> Result<(), ContextError> {
        if self.max_tokens == 0 {
            return Err(ContextError::InvalidConfig(
                "max_tokens must be positive".into(),
            ));
        }
        if !(self.compression_threshold > 0.0 && self.compression_threshold <= 1.0) {
            return Err(ContextError::InvalidConfig(format!(
                "compression_threshold must be in (0, 1], got {}",
                self.compression_threshold
            )));
        }
        if self.token_factor <= 0.0 {
            return Err(ContextError::InvalidConfig(
                "token_factor must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ── Log entries and reports ────────────────────────────────────────

/// A single turn in the tracked conversation log.
#[derive(Debug, Clone)]
pub struct TrackedMessage {
    pub role: MessageRole,
    pub content: String,
    /// Optional tag linking the message to the task that produced it.
    pub task_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    seq: u64,
}

impl TrackedMessage {
    /// Insertion sequence number. Strictly increasing across the life of
    /// the manager; the only ordering compaction relies on.
    pub fn sequence(&self) -> u64 {
        self.seq
    }
}

/// Usage tier derived from the usage ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    Ok,
    Warning,
    Critical,
}

impl std::fmt::Display for ContextStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextStatus::Ok => write!(f, "ok"),
            ContextStatus::Warning => write!(f, "warning"),
            ContextStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Snapshot of context usage at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub total_tokens: usize,
    pub max_tokens: usize,
    pub usage_ratio: f64,
    pub status: ContextStatus,
}

impl UsageReport {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "context: ~{} tokens ({:.0}% of {}, {})",
            self.total_tokens,
            self.usage_ratio * 100.0,
            self.max_tokens,
            self.status,
        )
    }
}

/// Outcome of a [`ContextManager::compact`] call.
#[derive(Debug, Clone, Serialize)]
pub struct CompactionReport {
    pub removed: usize,
    pub retained: usize,
    pub tokens_before: usize,
    pub tokens_after: usize,
    pub tokens_freed: usize,
    /// Compactions performed over the life of the manager, this one included.
    pub compactions: u32,
}

/// Aggregate statistics over the current log.
#[derive(Debug, Clone, Serialize)]
pub struct ContextStats {
    pub message_count: usize,
    pub total_tokens: usize,
    pub max_tokens: usize,
    pub usage_ratio: f64,
    pub role_breakdown: BTreeMap<String, usize>,
    pub task_breakdown: BTreeMap<String, usize>,
    pub compactions: u32,
}

// ── Manager ────────────────────────────────────────────────────────

/// Owns the ordered message log for one conversation and decides when and
/// how to shrink it.
///
/// One instance per conversation; created empty, mutated only by
/// [`append`](Self::append), [`compact`](Self::compact), and
/// [`clear`](Self::clear), and gone with the process. Token totals are
/// recomputed from the log on demand — there is no separately tracked
/// counter to drift.
///
/// # Example
///
/// ```
/// use skein_rs::context::{ContextConfig, ContextManager};
/// use skein_rs::MessageRole;
///
/// let config = ContextConfig::new().with_max_tokens(1000);
/// let mut ctx = ContextManager::new(config).unwrap();
///
/// ctx.append(MessageRole::User, "analyze the project layout");
/// ctx.append(MessageRole::Assistant, "three modules: auth, api, utils");
///
/// let report = ctx.monitor();
/// if ctx.should_compress() {
///     let outcome = ctx.compact();
///     println!("freed {} tokens", outcome.tokens_freed);
/// }
/// println!("{}", report.to_log_string());
/// ```
#[derive(Debug)]
pub struct ContextManager {
    config: ContextConfig,
    entries: Vec<TrackedMessage>,
    next_seq: u64,
    compactions: u32,
}

impl ContextManager {
    /// Create a manager with a validated configuration.
    pub fn new(config: ContextConfig) -> Result<Self, ContextError> {
        config.validate()?;
        Ok(Self {
            config,
            entries: Vec::new(),
            next_seq: 0,
            compactions: 0,
        })
    }

    /// Create a manager with the default configuration (4000-token ceiling,
    /// 0.8 threshold, 0.3 token factor, retain 5).
    pub fn with_defaults() -> Self {
        Self {
            config: ContextConfig::default(),
            entries: Vec::new(),
            next_seq: 0,
            compactions: 0,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Estimate the token cost of a piece of content: `ceil(chars × factor)`.
    pub fn estimate_tokens(&self, content: &str) -> usize {
        (content.chars().count() as f64 * self.config.token_factor).ceil() as usize
    }

    /// Append a message to the end of the log.
    pub fn append(&mut self, role: MessageRole, content: impl Into<String>) -> &TrackedMessage {
        self.push(role, content.into(), None)
    }

    /// Append a message tagged with the task that produced it.
    pub fn append_tagged(
        &mut self,
        role: MessageRole,
        content: impl Into<String>,
        task_id: impl Into<String>,
    ) -> &TrackedMessage {
        self.push(role, content.into(), Some(task_id.into()))
    }

    /// Append from untyped input (e.g. a wire payload). Fails on a role
    /// outside the closed set, leaving the log untouched.
    pub fn append_raw(
        &mut self,
        role: &str,
        content: &str,
    ) -> Result<&TrackedMessage, ContextError> {
        let role: MessageRole = role.parse()?;
        Ok(self.push(role, content.to_string(), None))
    }

    fn push(
        &mut self,
        role: MessageRole,
        content: String,
        task_id: Option<String>,
    ) -> &TrackedMessage {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(TrackedMessage {
            role,
            content,
            task_id,
            timestamp: Utc::now(),
            seq,
        });
        debug!(
            "appended {} message (seq {}), total ~{} tokens",
            role,
            seq,
            self.total_tokens()
        );
        let idx = self.entries.len() - 1;
        &self.entries[idx]
    }

    /// The current log, oldest first.
    pub fn messages(&self) -> &[TrackedMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of per-message estimates over the whole log, recomputed fresh.
    pub fn total_tokens(&self) -> usize {
        self.entries
            .iter()
            .map(|m| self.estimate_tokens(&m.content))
            .sum()
    }

    /// Estimated tokens divided by the configured ceiling.
    pub fn usage_ratio(&self) -> f64 {
        self.total_tokens() as f64 / self.config.max_tokens as f64
    }

    /// Usage snapshot with tier: ok below 70%, warning from 70% up to the
    /// compaction threshold, critical at or beyond it.
    pub fn monitor(&self) -> UsageReport {
        let total_tokens = self.total_tokens();
        let usage_ratio = total_tokens as f64 / self.config.max_tokens as f64;
        let status = if usage_ratio >= self.config.compression_threshold {
            ContextStatus::Critical
        } else if usage_ratio >= WARNING_RATIO {
            ContextStatus::Warning
        } else {
            ContextStatus::Ok
        };
        UsageReport {
            total_tokens,
            max_tokens: self.config.max_tokens,
            usage_ratio,
            status,
        }
    }

    /// Whether the log has reached the compaction threshold. The boundary
    /// counts: a ratio exactly equal to the threshold returns true.
    /// Appending never compacts implicitly — callers decide when to act.
    pub fn should_compress(&self) -> bool {
        let due = self.usage_ratio() >= self.config.compression_threshold;
        if due {
            info!(
                "compaction due: ~{} of {} estimated tokens",
                self.total_tokens(),
                self.config.max_tokens
            );
        }
        due
    }

    /// Compact the log: keep every user message, and of the rest only the
    /// most recent `retain_recent` (by insertion order). Relative order is
    /// preserved — this filters, it never reorders. Calling it again with
    /// no intervening append removes nothing.
    pub fn compact(&mut self) -> CompactionReport {
        let tokens_before = self.total_tokens();
        let before_len = self.entries.len();

        let non_user_total = self
            .entries
            .iter()
            .filter(|m| m.role != MessageRole::User)
            .count();
        let drop_oldest = non_user_total.saturating_sub(self.config.retain_recent);

        let mut non_user_seen = 0usize;
        self.entries.retain(|m| {
            if m.role == MessageRole::User {
                true
            } else {
                non_user_seen += 1;
                non_user_seen > drop_oldest
            }
        });

        let tokens_after = self.total_tokens();
        self.compactions += 1;

        let report = CompactionReport {
            removed: before_len - self.entries.len(),
            retained: self.entries.len(),
            tokens_before,
            tokens_after,
            tokens_freed: tokens_before - tokens_after,
            compactions: self.compactions,
        };
        info!(
            "compacted context: {} -> {} messages, ~{} -> ~{} tokens",
            before_len, report.retained, tokens_before, tokens_after
        );
        report
    }

    /// Aggregate statistics: counts, totals, and per-role / per-task
    /// breakdowns.
    pub fn stats(&self) -> ContextStats {
        let mut role_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        let mut task_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for msg in &self.entries {
            *role_breakdown.entry(msg.role.to_string()).or_default() += 1;
            if let Some(ref task) = msg.task_id {
                *task_breakdown.entry(task.clone()).or_default() += 1;
            }
        }
        ContextStats {
            message_count: self.entries.len(),
            total_tokens: self.total_tokens(),
            max_tokens: self.config.max_tokens,
            usage_ratio: self.usage_ratio(),
            role_breakdown,
            task_breakdown,
            compactions: self.compactions,
        }
    }

    /// The last `n` messages in original order. Asking for more than the
    /// log holds returns the whole log.
    pub fn recent(&self, n: usize) -> &[TrackedMessage] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Empty the log. Irreversible within the session; the compaction
    /// counter survives.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        info!("cleared context ({count} messages)");
    }

    /// Render the log as wire messages for a chat request.
    pub fn as_chat_messages(&self) -> Vec<Message> {
        self.entries
            .iter()
            .map(|m| Message {
                role: m.role,
                content: Some(m.content.clone()),
                tool_calls: None,
                tool_call_id: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(config: ContextConfig) -> ContextManager {
        ContextManager::new(config).expect("valid test config")
    }

    #[test]
    fn append_estimates_with_ceiling() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "hi");
        // 2 chars * 0.3 = 0.6, rounded up.
        assert_eq!(ctx.total_tokens(), 1);
    }

    #[test]
    fn total_matches_independent_recompute() {
        let mut ctx = ContextManager::with_defaults();
        let contents = ["analyze the project", "", "three modules found", "ok"];
        for (i, content) in contents.iter().enumerate() {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            ctx.append(role, *content);
        }

        let expected: usize = contents
            .iter()
            .map(|c| (c.chars().count() as f64 * 0.3).ceil() as usize)
            .sum();
        assert_eq!(ctx.total_tokens(), expected);
        // Idempotent: asking again changes nothing.
        assert_eq!(ctx.total_tokens(), expected);
    }

    #[test]
    fn should_compress_boundary_counts() {
        // 10000 chars -> 3000 tokens, 666 chars -> 200 tokens: exactly
        // 3200 of 4000 = the 0.8 threshold.
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "x".repeat(10000));
        ctx.append(MessageRole::Assistant, "y".repeat(666));
        assert_eq!(ctx.total_tokens(), 3200);
        assert!(ctx.should_compress());
        assert_eq!(ctx.monitor().status, ContextStatus::Critical);
    }

    #[test]
    fn below_threshold_not_due() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "x".repeat(10000));
        ctx.append(MessageRole::Assistant, "y".repeat(663)); // 199 tokens -> 3199
        assert_eq!(ctx.total_tokens(), 3199);
        assert!(!ctx.should_compress());
    }

    #[test]
    fn status_tiers() {
        let config = ContextConfig::new().with_max_tokens(100);
        let mut ctx = manager(config);
        ctx.append(MessageRole::Assistant, "a".repeat(100)); // 30 tokens
        assert_eq!(ctx.monitor().status, ContextStatus::Ok);

        ctx.append(MessageRole::Assistant, "b".repeat(134)); // +41 -> 71
        assert_eq!(ctx.monitor().status, ContextStatus::Warning);

        ctx.append(MessageRole::Assistant, "c".repeat(30)); // +9 -> 80
        assert_eq!(ctx.monitor().status, ContextStatus::Critical);
    }

    #[test]
    fn compact_keeps_users_and_recent_non_users() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "hi");
        for k in 1..=8 {
            ctx.append(MessageRole::Assistant, format!("response number {k}"));
        }

        let report = ctx.compact();
        assert_eq!(report.removed, 3);
        assert_eq!(report.retained, 6);
        assert!(report.tokens_freed > 0);
        assert_eq!(report.tokens_before - report.tokens_after, report.tokens_freed);

        // The user message plus assistant responses 4..=8, in order.
        let contents: Vec<&str> = ctx.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "hi",
                "response number 4",
                "response number 5",
                "response number 6",
                "response number 7",
                "response number 8",
            ]
        );
    }

    #[test]
    fn compact_preserves_interleaved_order() {
        let config = ContextConfig::new().with_retain_recent(2);
        let mut ctx = manager(config);
        ctx.append(MessageRole::Assistant, "a1");
        ctx.append(MessageRole::User, "u1");
        ctx.append(MessageRole::Tool, "t1");
        ctx.append(MessageRole::User, "u2");
        ctx.append(MessageRole::Assistant, "a2");

        ctx.compact();
        let contents: Vec<&str> = ctx.messages().iter().map(|m| m.content.as_str()).collect();
        // a1 is the oldest of 3 non-user messages and gets dropped; the
        // survivors keep their original relative order.
        assert_eq!(contents, vec!["u1", "t1", "u2", "a2"]);

        let seqs: Vec<u64> = ctx.messages().iter().map(|m| m.sequence()).collect();
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted);
    }

    #[test]
    fn compact_twice_is_noop() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "hi");
        for k in 1..=8 {
            ctx.append(MessageRole::Assistant, format!("response number {k}"));
        }

        let first = ctx.compact();
        assert_eq!(first.removed, 3);

        let second = ctx.compact();
        assert_eq!(second.removed, 0);
        assert_eq!(second.tokens_freed, 0);
        assert_eq!(second.retained, first.retained);
        assert_eq!(second.compactions, 2);
    }

    #[test]
    fn compact_with_few_non_users_removes_nothing() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "question");
        ctx.append(MessageRole::Assistant, "answer");
        ctx.append(MessageRole::Tool, "result");

        let report = ctx.compact();
        assert_eq!(report.removed, 0);
        assert_eq!(report.retained, 3);
    }

    #[test]
    fn recent_clamps_to_log_length() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "one");
        ctx.append(MessageRole::Assistant, "two");

        assert_eq!(ctx.recent(10).len(), 2);
        assert_eq!(ctx.recent(0).len(), 0);

        let last = ctx.recent(1);
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].content, "two");
    }

    #[test]
    fn clear_resets_accounting() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "x".repeat(1000));
        ctx.clear();

        let report = ctx.monitor();
        assert_eq!(report.total_tokens, 0);
        assert_eq!(report.usage_ratio, 0.0);
        assert_eq!(report.status, ContextStatus::Ok);
        assert!(ctx.is_empty());
    }

    #[test]
    fn append_raw_rejects_unknown_role() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "hello");

        let err = ctx.append_raw("narrator", "once upon a time").unwrap_err();
        assert!(matches!(err, ContextError::InvalidRole(ref r) if r == "narrator"));
        // State unchanged.
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn append_raw_accepts_wire_roles() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append_raw("tool", "lookup finished").expect("valid role");
        assert_eq!(ctx.messages()[0].role, MessageRole::Tool);
    }

    #[test]
    fn config_validation() {
        assert!(ContextManager::new(ContextConfig::new().with_max_tokens(0)).is_err());
        assert!(
            ContextManager::new(ContextConfig::new().with_compression_threshold(0.0)).is_err()
        );
        assert!(
            ContextManager::new(ContextConfig::new().with_compression_threshold(1.5)).is_err()
        );
        assert!(ContextManager::new(ContextConfig::new().with_token_factor(-0.1)).is_err());
        // 1.0 is the inclusive upper bound.
        assert!(ContextManager::new(ContextConfig::new().with_compression_threshold(1.0)).is_ok());
    }

    #[test]
    fn stats_breakdowns() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::User, "compute (123+456)*789");
        ctx.append_tagged(MessageRole::Assistant, "computing...", "calc_001");
        ctx.append_tagged(MessageRole::Tool, "result: 456831", "calc_001");
        ctx.append(MessageRole::Assistant, "the result is 456831");

        let stats = ctx.stats();
        assert_eq!(stats.message_count, 4);
        assert_eq!(stats.role_breakdown["user"], 1);
        assert_eq!(stats.role_breakdown["assistant"], 2);
        assert_eq!(stats.role_breakdown["tool"], 1);
        assert_eq!(stats.task_breakdown["calc_001"], 2);
        assert_eq!(stats.compactions, 0);
    }

    #[test]
    fn as_chat_messages_preserves_order_and_roles() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::System, "be brief");
        ctx.append(MessageRole::User, "hello");
        ctx.append(MessageRole::Assistant, "hi there");

        let wire = ctx.as_chat_messages();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0].role, MessageRole::System);
        assert_eq!(wire[2].content.as_deref(), Some("hi there"));
    }

    #[test]
    fn empty_content_is_permitted() {
        let mut ctx = ContextManager::with_defaults();
        ctx.append(MessageRole::Tool, "");
        assert_eq!(ctx.total_tokens(), 0);
        assert_eq!(ctx.len(), 1);
    }
}
