//! Single-session interactive shell engine with stacked command contexts.
//!
//! A [`Session`] owns the edit buffer, submission history, and a [`ContextStack`]. Submitted
//! lines are parsed by `shell_parser`, validated against the matching [`Command`]'s
//! [`Parameter`] schema, and handed to an async handler together with a [`CommandContext`].
//! Output goes to a host-provided [`DisplaySink`].

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

use std::rc::Rc;

use futures::future::LocalBoxFuture;

pub mod builtins;
mod cancel;
mod command;
mod config;
mod context;
mod execution;
mod input;
mod provider;
mod session;
mod sink;
mod stack;

pub use cancel::CancelToken;
pub use command::{CallOutcome, Command, Parameter};
pub use config::SessionConfig;
pub use context::{Context, DispatchOutcome};
pub use execution::CommandContext;
pub use input::{HistoryDirection, HistoryStep, InputState};
pub use provider::{CommandLog, HistoryProvider};
pub use session::{Session, SessionBuilder, SubmitOutcome, BUSY_MESSAGE};
pub use shell_contract::{
    ArgValue, ExecutionId, HistoryEntry, ParamKind, RawArg, ResolvedArgs, ShellError,
    ShellErrorCode,
};
pub use sink::{BufferSink, DisplaySink, SinkEvent};
pub use stack::{link_contexts, ContextStack};

/// Async command handler.
pub type CommandHandler =
    Rc<dyn Fn(CommandContext, ResolvedArgs) -> LocalBoxFuture<'static, Result<(), ShellError>>>;
