use std::path::{Path, PathBuf};

use thiserror::Error;

/// Failures of the terminal host outside of command execution.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse history record at {path}:{line}: {source}")]
    HistoryLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode history record: {0}")]
    HistoryEncode(#[source] serde_json::Error),

    #[error("failed to assemble shell: {0}")]
    Shell(#[from] shell_engine::ShellError),

    #[error("failed to read terminal input: {0}")]
    Input(#[source] std::io::Error),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl TerminalError {
    pub(crate) fn io(operation: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Convenience result type for the terminal host.
pub type TerminalResult<T> = Result<T, TerminalError>;
