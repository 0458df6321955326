//! Line parser for the session command grammar.
//!
//! The grammar is deliberately small: the line is split on whitespace, the first token names the
//! command, and every following token is either a named argument (`--key=value`, `--key value`,
//! `--key`, and the single-dash short forms) or a positional argument. No quoting or escaping is
//! recognized.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use shell_contract::{ParsedLine, RawArg};

/// Parses one input line into command name, positional arguments, and named arguments.
///
/// Blank input yields a [`ParsedLine`] with an empty command name.
pub fn parse_line(line: &str) -> ParsedLine {
    let mut tokens = tokenize(line).into_iter().peekable();
    let mut parsed = ParsedLine {
        command: tokens.next().unwrap_or_default().to_string(),
        ..ParsedLine::default()
    };

    while let Some(token) = tokens.next() {
        let Some(option) = split_option(token) else {
            parsed.positional.push(token.to_string());
            continue;
        };

        let value = match option {
            OptionToken::Assigned { value, .. } => RawArg::Value(value.to_string()),
            OptionToken::Bare { .. } => match tokens.next_if(|next| !next.starts_with('-')) {
                Some(next) => RawArg::Value(next.to_string()),
                None => RawArg::Present,
            },
        };
        parsed.named.insert(option.key().to_string(), value);
    }

    parsed
}

/// Splits `line` into whitespace-separated tokens.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionToken<'a> {
    Assigned { key: &'a str, value: &'a str },
    Bare { key: &'a str },
}

impl<'a> OptionToken<'a> {
    fn key(self) -> &'a str {
        match self {
            Self::Assigned { key, .. } | Self::Bare { key } => key,
        }
    }
}

fn split_option(token: &str) -> Option<OptionToken<'_>> {
    let rest = token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))?;
    if rest.is_empty() {
        return None;
    }

    Some(match rest.split_once('=') {
        Some((key, value)) => OptionToken::Assigned { key, value },
        None => OptionToken::Bare { key: rest },
    })
}
