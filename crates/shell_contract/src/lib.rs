//! Shared shell session contracts used by the line parser, the command engine, and hosts.
//!
//! This crate is intentionally runtime-agnostic. It defines parameter kinds, raw and coerced
//! argument values, parsed input lines, remote history payloads, and the error taxonomy
//! without depending on an executor, a display surface, or any host I/O.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named-argument keys that request help instead of running a command.
pub const HELP_KEYS: [&str; 2] = ["h", "help"];

/// Execution identifier for one dispatched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub u64);

/// Primitive kind a parameter coerces its raw value into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamKind {
    /// Untyped switch; presence alone yields `true`.
    Flag,
    /// Free-form text.
    Text,
    /// Signed 64-bit integer.
    Integer,
    /// Boolean literal such as `true`, `no`, or `1`.
    Boolean,
}

impl ParamKind {
    /// Label used in help output and validation messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw value the parser recorded for one named argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum RawArg {
    /// The key appeared without a value (`--verbose`).
    Present,
    /// The key carried a textual value (`--page 2`, `-p=2`).
    Value(String),
}

impl RawArg {
    /// Returns the textual value, if one was supplied.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Present => None,
            Self::Value(value) => Some(value),
        }
    }

    /// Text shown for this value in diagnostics.
    pub fn display(&self) -> &str {
        match self {
            Self::Present => "true",
            Self::Value(value) => value,
        }
    }
}

/// Argument value after schema coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Boolean value (also produced by flags).
    Boolean(bool),
}

impl ArgValue {
    /// Returns the text payload for [`ArgValue::Text`].
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the integer payload for [`ArgValue::Integer`].
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the boolean payload for [`ArgValue::Boolean`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Boolean(value) => write!(f, "{value}"),
        }
    }
}

/// Arguments handed to a command handler, keyed by parameter name.
///
/// Only parameters that actually received a value are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedArgs(BTreeMap<String, ArgValue>);

impl ResolvedArgs {
    /// Creates an empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a coerced value under `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.0.insert(name.into(), value);
    }

    /// Returns the value stored for `name`.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    /// Returns whether `name` received a value.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns the text value stored for `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_text)
    }

    /// Returns the integer value stored for `name`.
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_integer)
    }

    /// Returns whether the flag or boolean `name` is set to `true`.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(ArgValue::as_bool).unwrap_or(false)
    }

    /// Number of resolved arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no argument was resolved.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>> FromIterator<(K, ArgValue)> for ResolvedArgs {
    fn from_iter<I: IntoIterator<Item = (K, ArgValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, value)| (name.into(), value)).collect())
    }
}

/// One input line split into command name, positional arguments, and named arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLine {
    /// Command name; empty when the line was blank.
    pub command: String,
    /// Positional argument tokens in input order.
    pub positional: Vec<String>,
    /// Named arguments keyed without their leading dashes.
    pub named: BTreeMap<String, RawArg>,
}

impl ParsedLine {
    /// Whether the line named no command.
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }

    /// Whether the line carries `-h` or `--help`.
    pub fn wants_help(&self) -> bool {
        wants_help(&self.named)
    }
}

/// Whether a named-argument map requests help.
pub fn wants_help(named: &BTreeMap<String, RawArg>) -> bool {
    HELP_KEYS.iter().any(|key| named.contains_key(*key))
}

/// Entry returned by a remote history provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Previously submitted command text.
    pub command: String,
    /// Cursor index the provider actually served, counted back from the most recent entry.
    #[serde(alias = "i")]
    pub index: usize,
}

/// Structured shell error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShellErrorCode {
    /// A command or parameter schema was malformed at setup time.
    Construction,
    /// A required argument was not supplied.
    MissingArgument,
    /// An argument could not be coerced to its declared kind.
    InvalidArgument,
    /// No command matched the input.
    NotFound,
    /// A command handler failed while running.
    Handler,
    /// A remote history or command-log provider failed.
    Provider,
}

/// Error emitted by command construction, validation, handlers, or providers.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ShellError {
    /// Error category.
    pub code: ShellErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl ShellError {
    /// Creates a new shell error.
    pub fn new(code: ShellErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Setup-time schema failure.
    pub fn construction(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::Construction, message)
    }

    /// Required named parameter was absent.
    pub fn missing_argument(name: &str) -> Self {
        Self::new(
            ShellErrorCode::MissingArgument,
            format!("Missing required parameter: {name}"),
        )
    }

    /// Required positional parameter was absent.
    pub fn missing_positional(name: &str) -> Self {
        Self::new(
            ShellErrorCode::MissingArgument,
            format!("Missing required positional parameter: {name}"),
        )
    }

    /// Value could not be coerced to `kind`.
    pub fn invalid_argument(name: &str, kind: ParamKind, raw: &str) -> Self {
        Self::new(
            ShellErrorCode::InvalidArgument,
            format!("Invalid value for parameter '{name}': expected {kind}, got {raw}"),
        )
    }

    /// Value in a positional slot could not be coerced to `kind`.
    pub fn invalid_positional(name: &str, kind: ParamKind, raw: &str) -> Self {
        Self::new(
            ShellErrorCode::InvalidArgument,
            format!("Invalid value for positional parameter '{name}': expected {kind}, got {raw}"),
        )
    }

    /// Failure raised inside a command handler.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::Handler, message)
    }

    /// Failure raised by a history or command-log provider.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ShellErrorCode::Provider, message)
    }

    /// Whether this error came from argument validation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code,
            ShellErrorCode::MissingArgument | ShellErrorCode::InvalidArgument
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn history_entry_accepts_short_index_key() {
        let entry: HistoryEntry =
            serde_json::from_str(r#"{"command":"list -l en","i":4}"#).expect("decode");
        assert_eq!(
            entry,
            HistoryEntry {
                command: "list -l en".to_string(),
                index: 4,
            }
        );
    }

    #[test]
    fn resolved_args_typed_accessors() {
        let args: ResolvedArgs = [
            ("language", ArgValue::Text("en".to_string())),
            ("page", ArgValue::Integer(2)),
            ("verbose", ArgValue::Boolean(true)),
        ]
        .into_iter()
        .collect();

        assert_eq!(args.text("language"), Some("en"));
        assert_eq!(args.integer("page"), Some(2));
        assert!(args.flag("verbose"));
        assert!(!args.flag("language"));
        assert_eq!(args.text("missing"), None);
    }

    #[test]
    fn invalid_argument_message_names_parameter_and_kind() {
        let error = ShellError::invalid_argument("page", ParamKind::Integer, "two");
        assert_eq!(error.code, ShellErrorCode::InvalidArgument);
        assert_eq!(
            error.to_string(),
            "Invalid value for parameter 'page': expected integer, got two"
        );
        assert!(error.is_validation());
    }

    #[test]
    fn help_keys_are_detected() {
        let mut line = ParsedLine {
            command: "list".to_string(),
            ..ParsedLine::default()
        };
        assert!(!line.wants_help());
        line.named.insert("h".to_string(), RawArg::Present);
        assert!(line.wants_help());
    }
}
