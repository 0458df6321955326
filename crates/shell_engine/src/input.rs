use shell_contract::HistoryEntry;

/// Direction of one history navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryDirection {
    /// Towards older submissions (up arrow).
    Older,
    /// Towards newer submissions (down arrow).
    Newer,
}

impl HistoryDirection {
    fn delta(self) -> isize {
        match self {
            Self::Older => 1,
            Self::Newer => -1,
        }
    }
}

/// Result of a history navigation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryStep {
    /// Navigation ended and the saved buffer was restored.
    Restored,
    /// A locally remembered submission was recalled at this cursor index.
    Local(usize),
    /// The remote provider served the entry at this cursor index.
    Remote(usize),
    /// The step needs an entry beyond local memory and none could be fetched.
    Unavailable,
    /// A command is running or another step is still fetching; navigation is disabled.
    Ignored,
    /// The input changed while the entry was being fetched, so the entry was dropped.
    Superseded,
}

/// Edit buffer, caret, and submission history of one session.
///
/// The caret is a character index and always satisfies `0 <= caret <= chars(buffer)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    buffer: String,
    caret: usize,
    history: Vec<String>,
    cursor: Option<usize>,
    saved: String,
}

impl InputState {
    /// Uncommitted input.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Caret position in characters.
    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Submitted lines, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// History cursor counted back from the most recent submission; `None` when not navigating.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Buffer snapshot restored when navigation ends.
    pub fn saved_buffer(&self) -> &str {
        &self.saved
    }

    /// Replaces the buffer after a user edit.
    pub fn edit(&mut self, buffer: impl Into<String>, caret: usize) {
        self.buffer = buffer.into();
        self.set_caret(caret);
        if self.cursor.is_none() {
            self.saved = self.buffer.clone();
        }
    }

    /// Moves the caret, clamped to the buffer.
    pub fn set_caret(&mut self, caret: usize) {
        self.caret = caret.min(self.buffer.chars().count());
    }

    /// Leaves navigation and empties the buffer.
    pub fn clear(&mut self) {
        self.cursor = None;
        self.replace_buffer(String::new());
        self.saved.clear();
    }

    /// Leaves navigation and restores the saved buffer.
    pub fn leave_history(&mut self) {
        self.cursor = None;
        self.replace_buffer(self.saved.clone());
    }

    /// Commits the trimmed buffer, resetting the edit state.
    ///
    /// Non-empty lines are appended to the history; `limit` caps the retained entries.
    pub fn take_submission(&mut self, limit: Option<usize>) -> String {
        let line = self.buffer.trim().to_string();
        if !line.is_empty() {
            self.history.push(line.clone());
            if let Some(limit) = limit {
                let overflow = self.history.len().saturating_sub(limit);
                self.history.drain(..overflow);
            }
        }
        self.buffer.clear();
        self.saved.clear();
        self.caret = 0;
        self.cursor = None;
        line
    }

    /// Applies a navigation step using only local history.
    ///
    /// Returns `Err(index)` without touching any state when the step reaches past local memory.
    pub fn step_local(&mut self, direction: HistoryDirection) -> Result<HistoryStep, usize> {
        let current = self.cursor.map_or(-1, |cursor| cursor as isize);
        let next = current + direction.delta();
        if next <= -1 {
            self.leave_history();
            return Ok(HistoryStep::Restored);
        }

        let index = next as usize;
        if index >= self.history.len() {
            return Err(index);
        }
        self.cursor = Some(index);
        let entry = self.history[self.history.len() - 1 - index].clone();
        self.replace_buffer(entry);
        Ok(HistoryStep::Local(index))
    }

    /// Applies an entry served by the remote history provider.
    pub fn apply_remote(&mut self, entry: HistoryEntry) -> usize {
        self.cursor = Some(entry.index);
        self.replace_buffer(entry.command);
        entry.index
    }

    fn replace_buffer(&mut self, buffer: String) {
        self.caret = buffer.chars().count();
        self.buffer = buffer;
    }
}
