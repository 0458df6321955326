use std::{cell::RefCell, rc::Rc};

/// Append-only output surface a session streams text into.
///
/// Text arrives as raw segments in emission order; line splitting and wrapping belong to the
/// implementation.
pub trait DisplaySink {
    /// Appends one text segment.
    fn write(&self, text: &str);

    /// Clears everything shown so far.
    fn clear(&self) {}
}

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// Text appended through [`DisplaySink::write`].
    Text(String),
    /// Screen cleared through [`DisplaySink::clear`].
    Clear,
}

/// In-memory sink that records every call; clones share the same transcript.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    events: Rc<RefCell<Vec<SinkEvent>>>,
}

impl BufferSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded call, oldest first.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.borrow().clone()
    }

    /// Text written since the most recent clear.
    pub fn contents(&self) -> String {
        let events = self.events.borrow();
        let start = events
            .iter()
            .rposition(|event| *event == SinkEvent::Clear)
            .map_or(0, |index| index + 1);
        events[start..]
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Text(text) => Some(text.as_str()),
                SinkEvent::Clear => None,
            })
            .collect()
    }

    /// Returns the text written since the last call to `take` or clear, then forgets it.
    pub fn take(&self) -> String {
        let text = self.contents();
        self.events.borrow_mut().clear();
        text
    }
}

impl DisplaySink for BufferSink {
    fn write(&self, text: &str) {
        if !text.is_empty() {
            self.events.borrow_mut().push(SinkEvent::Text(text.to_string()));
        }
    }

    fn clear(&self) {
        self.events.borrow_mut().push(SinkEvent::Clear);
    }
}
