//! Console host for the shell engine: configuration, persistent history, the `ping` command,
//! and the `words` vocabulary context.

use std::{cell::RefCell, rc::Rc};

use shell_engine::{builtins::default_context, link_contexts, Context, DisplaySink, Session, ShellError};

pub mod config;
pub mod error;
pub mod history;
pub mod host;
pub mod ping;
pub mod words;

use config::TerminalConfig;
use history::JsonlHistory;
use words::{words_context, WordBook};

/// Builds the root context: built-ins, `ping`, and the linked `words` context.
///
/// # Errors
///
/// Fails only if a command schema is malformed.
pub fn build_root(config: &TerminalConfig) -> Result<Context, ShellError> {
    let root = default_context();
    root.attach_command(ping::ping_command(config.ping.clone())?);

    let words = words_context(Rc::new(RefCell::new(WordBook::default())))?;
    link_contexts(
        &root,
        &words,
        "words",
        "Start the words terminal.",
        "Words terminal started.",
    )?;
    Ok(root)
}

/// Builds a session over [`build_root`], wiring `history` as provider and command log.
pub fn build_session(
    config: &TerminalConfig,
    sink: Rc<dyn DisplaySink>,
    history: Option<Rc<JsonlHistory>>,
) -> Result<Session, ShellError> {
    let mut builder = Session::builder(build_root(config)?, sink).config(config.session.clone());
    if let Some(history) = history {
        builder = builder
            .history_provider(history.clone())
            .command_log(history);
    }
    Ok(builder.build())
}
