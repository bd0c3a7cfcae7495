//! Configuration validation engine.
//!
//! Validates configuration files against the known schema, detects
//! unknown/misspelled fields, and reports values the delivery and dump
//! components would refuse at construction time.

use std::{collections::HashMap, path::Path};

use crate::{
    env_subst::substitute_env,
    schema::{ChatTextConfig, MAX_BUFFER_FLUSH_THRESHOLD, MIN_TARGET_LENGTH, TWITCH_MAX_MESSAGE_LEN},
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "range",
    /// "credentials", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "delivery.max_message_count"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// Scalar or list value; stop recursion.
    Leaf,
}

/// Build the full schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    Struct(HashMap::from([
        (
            "twitch",
            Struct(HashMap::from([
                ("nick", Leaf),
                ("token", Leaf),
                ("channels", Leaf),
                ("command_prefix", Leaf),
                ("url", Leaf),
                ("rate_limit_messages", Leaf),
                ("rate_limit_window_secs", Leaf),
            ])),
        ),
        (
            "delivery",
            Struct(HashMap::from([
                ("max_message_length", Leaf),
                ("per_message_target_length", Leaf),
                ("max_message_count", Leaf),
                ("retry_backoff_secs", Leaf),
            ])),
        ),
        (
            "dump",
            Struct(HashMap::from([
                ("buffer_flush_threshold", Leaf),
                ("supplemental_line_chance", Leaf),
                ("supplemental_lines_file", Leaf),
            ])),
        ),
    ]))
}

// ── Public API ──────────────────────────────────────────────────────────────

/// Validate the config file at `path`, or the discovered one.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = if let Some(p) = path {
        Some(p.to_path_buf())
    } else {
        crate::loader::find_config_file()
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = substitute_env(&content);
            let ext = actual_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("toml");
            let mut result = validate_str(&content, ext);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML document.
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    validate_str(toml_str, "toml")
}

fn validate_str(raw: &str, ext: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    // 1. Syntax: parse into a format-neutral tree
    let value = match parse_value(raw, ext) {
        Ok(v) => v,
        Err(message) => {
            diagnostics.push(Diagnostic::new(Severity::Error, "syntax", "", message));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    // 2. Unknown fields: walk the tree against KnownKeys
    check_unknown_fields(&value, &build_schema_map(), "", &mut diagnostics);

    // 3. Type check, then semantic checks on the parsed config
    match serde_json::from_value::<ChatTextConfig>(value) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn parse_value(raw: &str, ext: &str) -> Result<serde_json::Value, String> {
    match ext {
        "toml" => {
            let v: toml::Value =
                toml::from_str(raw).map_err(|e| format!("TOML syntax error: {e}"))?;
            serde_json::to_value(v).map_err(|e| format!("TOML syntax error: {e}"))
        },
        "yaml" | "yml" => {
            let v: serde_yaml::Value =
                serde_yaml::from_str(raw).map_err(|e| format!("YAML syntax error: {e}"))?;
            serde_json::to_value(v).map_err(|e| format!("YAML syntax error: {e}"))
        },
        "json" => serde_json::from_str(raw).map_err(|e| format!("JSON syntax error: {e}")),
        other => Err(format!("unsupported config format: .{other}")),
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let msg = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "unknown-field",
            path,
            msg.trim(),
        ));
    }
}

fn check_semantics(config: &ChatTextConfig, diagnostics: &mut Vec<Diagnostic>) {
    let twitch = &config.twitch;
    if twitch.require_nick().is_err() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "credentials",
            "twitch.nick",
            "bot login is empty; `run` will refuse to start",
        ));
    }
    if twitch.require_irc_token().is_err() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "credentials",
            "twitch.token",
            "IRC token is empty; `run` will refuse to start",
        ));
    }
    if twitch.require_channels().is_err() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "credentials",
            "twitch.channels",
            "no channels configured; `run` will refuse to start",
        ));
    }
    if twitch.command_prefix.trim().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "twitch.command_prefix",
            "command prefix must not be empty",
        ));
    }
    if !(twitch.url.starts_with("wss://") || twitch.url.starts_with("ws://")) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "twitch.url",
            format!("\"{}\" is not a ws:// or wss:// URL", twitch.url),
        ));
    }
    if twitch.rate_limit_messages == 0 || twitch.rate_limit_window_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "twitch.rate_limit_messages",
            format!(
                "rate limit of {} message(s) per {} s would never let a message through",
                twitch.rate_limit_messages, twitch.rate_limit_window_secs
            ),
        ));
    }

    let delivery = &config.delivery;
    if delivery.max_message_length > TWITCH_MAX_MESSAGE_LEN {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "range",
            "delivery.max_message_length",
            format!(
                "{} exceeds the Twitch limit of {TWITCH_MAX_MESSAGE_LEN} characters",
                delivery.max_message_length
            ),
        ));
    }
    if delivery.per_message_target_length < MIN_TARGET_LENGTH {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "delivery.per_message_target_length",
            format!(
                "{} is too small (minimum is {MIN_TARGET_LENGTH})",
                delivery.per_message_target_length
            ),
        ));
    }
    if delivery.per_message_target_length >= delivery.max_message_length {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "delivery.per_message_target_length",
            format!(
                "{} must be smaller than max_message_length ({})",
                delivery.per_message_target_length, delivery.max_message_length
            ),
        ));
    }
    if delivery.max_message_count == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "delivery.max_message_count",
            "must be at least 1",
        ));
    }
    if delivery.retry_backoff_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "range",
            "delivery.retry_backoff_secs",
            "retry happens immediately; chat rate limits usually need a pause",
        ));
    }

    let dump = &config.dump;
    if dump.buffer_flush_threshold == 0 || dump.buffer_flush_threshold > MAX_BUFFER_FLUSH_THRESHOLD {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "dump.buffer_flush_threshold",
            format!(
                "{} is out of bounds (1..={MAX_BUFFER_FLUSH_THRESHOLD})",
                dump.buffer_flush_threshold
            ),
        ));
    }
    if !(0.0..=1.0).contains(&dump.supplemental_line_chance) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "range",
            "dump.supplemental_line_chance",
            format!(
                "{} is not a probability in [0, 1]",
                dump.supplemental_line_chance
            ),
        ));
    }
    if dump.supplemental_line_chance > 0.0 && !dump.supplemental_lines_file.exists() {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "file-ref",
            "dump.supplemental_lines_file",
            format!(
                "{} does not exist yet; no supplemental lines will be added until it does",
                dump.supplemental_lines_file.display()
            ),
        ));
    }
}

// ── Suggestions ─────────────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}
