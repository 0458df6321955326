use std::{
    cell::RefCell,
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use futures::{future, future::LocalBoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use shell_engine::{CommandLog, HistoryEntry, HistoryProvider, ShellError};

use crate::error::{TerminalError, TerminalResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct HistoryRecord {
    command: String,
    timestamp: u64,
}

/// Command history persisted as one JSON object per line.
///
/// Serves as both the session's [`HistoryProvider`] and its [`CommandLog`], so lines recorded in
/// earlier runs are reachable by stepping back past the current run's submissions.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    commands: RefCell<Vec<String>>,
    file: RefCell<File>,
}

impl JsonlHistory {
    /// Opens or creates the history file at `path`.
    pub fn open(path: &Path) -> TerminalResult<Self> {
        let path = path.to_path_buf();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| TerminalError::io("creating history directory", parent, source))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .map_err(|source| TerminalError::io("opening history file", &path, source))?;

        let mut commands = Vec::new();
        for (line_index, line) in BufReader::new(&file).lines().enumerate() {
            let line = line.map_err(|source| TerminalError::io("reading history file", &path, source))?;
            if line.trim().is_empty() {
                continue;
            }
            let record: HistoryRecord =
                serde_json::from_str(&line).map_err(|source| TerminalError::HistoryLine {
                    path: path.clone(),
                    line: line_index + 1,
                    source,
                })?;
            commands.push(record.command);
        }
        log::debug!("loaded {} history entries from {}", commands.len(), path.display());

        Ok(Self {
            path,
            commands: RefCell::new(commands),
            file: RefCell::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored commands.
    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }

    /// Appends `command` to the file and the in-memory index.
    pub fn append(&self, command: &str) -> TerminalResult<()> {
        let record = HistoryRecord {
            command: command.to_string(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_secs())
                .unwrap_or_default(),
        };
        let mut line = serde_json::to_string(&record).map_err(TerminalError::HistoryEncode)?;
        line.push('\n');
        self.file
            .borrow_mut()
            .write_all(line.as_bytes())
            .map_err(|source| TerminalError::io("appending to history file", &self.path, source))?;
        self.commands.borrow_mut().push(record.command);
        Ok(())
    }

    /// Entry `index` steps back from the most recent command, clamped to the oldest one.
    pub fn entry(&self, index: usize) -> Option<HistoryEntry> {
        let commands = self.commands.borrow();
        let last = commands.len().checked_sub(1)?;
        let index = index.min(last);
        Some(HistoryEntry {
            command: commands[last - index].clone(),
            index,
        })
    }
}

impl HistoryProvider for JsonlHistory {
    fn fetch(&self, index: usize) -> LocalBoxFuture<'_, Result<HistoryEntry, ShellError>> {
        let entry = self
            .entry(index)
            .ok_or_else(|| ShellError::provider("No command history found."));
        future::ready(entry).boxed_local()
    }
}

impl CommandLog for JsonlHistory {
    fn record(&self, command: &str) -> Result<(), ShellError> {
        self.append(command)
            .map_err(|err| ShellError::provider(err.to_string()))
    }
}
