use std::{
    cell::{Cell, RefCell, RefMut},
    rc::Rc,
};

use futures::{
    future::{self, Either},
    pin_mut,
};
use shell_contract::ExecutionId;

use crate::{
    cancel::{cancel_pair, CancelTrigger},
    CommandContext, CommandLog, Context, ContextStack, DispatchOutcome, DisplaySink,
    HistoryDirection, HistoryProvider, HistoryStep, InputState, SessionConfig,
};

/// Written when a line is submitted while another command runs.
pub const BUSY_MESSAGE: &str = "Another command is still running.\n";

/// How [`Session::submit`] handled the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Another execution was running or winding down; nothing was dispatched.
    Rejected,
    /// The session is closed; nothing was dispatched.
    Closed,
    /// The line was dispatched and ran to the end.
    Dispatched(DispatchOutcome),
    /// The line was dispatched and the user interrupted it. A command that ignored the
    /// interrupt for longer than [`SessionConfig::cancel_grace`] reports
    /// [`DispatchOutcome::Abandoned`].
    Cancelled(DispatchOutcome),
}

struct ActiveExecution {
    id: ExecutionId,
    trigger: CancelTrigger,
}

pub(crate) struct SessionShared {
    pub(crate) config: SessionConfig,
    pub(crate) sink: Rc<dyn DisplaySink>,
    pub(crate) stack: RefCell<ContextStack>,
    pub(crate) waiting: Cell<bool>,
    pub(crate) closed: Cell<bool>,
    input: RefCell<InputState>,
    input_generation: Cell<u64>,
    fetching: Cell<bool>,
    active: RefCell<Option<ActiveExecution>>,
    next_execution: Cell<u64>,
    history_provider: Option<Rc<dyn HistoryProvider>>,
    command_log: Option<Rc<dyn CommandLog>>,
}

impl SessionShared {
    fn write_prompt(&self) {
        if self.closed.get() {
            return;
        }
        let prompt = self.stack.borrow().current().prompt().to_string();
        self.sink.write(&prompt);
    }

    /// Mutable input, counted as a change for pending history fetches.
    fn input_mut(&self) -> RefMut<'_, InputState> {
        self.input_generation.set(self.input_generation.get() + 1);
        self.input.borrow_mut()
    }

    fn next_execution_id(&self) -> ExecutionId {
        let id = self.next_execution.get() + 1;
        self.next_execution.set(id);
        ExecutionId(id)
    }
}

/// Releases the execution slot even when the submit future is dropped mid-command.
struct ExecutionSlot<'a> {
    shared: &'a SessionShared,
}

impl Drop for ExecutionSlot<'_> {
    fn drop(&mut self) {
        self.shared.active.borrow_mut().take();
        self.shared.waiting.set(false);
    }
}

struct FetchSlot<'a> {
    shared: &'a SessionShared,
}

impl Drop for FetchSlot<'_> {
    fn drop(&mut self) {
        self.shared.fetching.set(false);
    }
}

/// Configures optional collaborators of a [`Session`].
pub struct SessionBuilder {
    root: Context,
    sink: Rc<dyn DisplaySink>,
    config: SessionConfig,
    history_provider: Option<Rc<dyn HistoryProvider>>,
    command_log: Option<Rc<dyn CommandLog>>,
}

impl SessionBuilder {
    /// Replaces the default configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Source for entries older than local history.
    pub fn history_provider(mut self, provider: Rc<dyn HistoryProvider>) -> Self {
        self.history_provider = Some(provider);
        self
    }

    /// Receives every non-empty submitted line.
    pub fn command_log(mut self, log: Rc<dyn CommandLog>) -> Self {
        self.command_log = Some(log);
        self
    }

    /// Builds the session with `root` as its bottom context.
    pub fn build(self) -> Session {
        Session {
            shared: Rc::new(SessionShared {
                config: self.config,
                sink: self.sink,
                stack: RefCell::new(ContextStack::new(self.root)),
                waiting: Cell::new(false),
                closed: Cell::new(false),
                input: RefCell::new(InputState::default()),
                input_generation: Cell::new(0),
                fetching: Cell::new(false),
                active: RefCell::new(None),
                next_execution: Cell::new(0),
                history_provider: self.history_provider,
                command_log: self.command_log,
            }),
        }
    }
}

/// Interactive shell session: input buffer, history, context stack, and execution gate.
///
/// All state lives on one thread. Clones are handles to the same session, so a host can hold
/// one handle in its input loop while another drives [`Session::submit`].
#[derive(Clone)]
pub struct Session {
    shared: Rc<SessionShared>,
}

impl Session {
    /// Creates a session with default configuration and no history collaborators.
    pub fn new(root: Context, sink: Rc<dyn DisplaySink>) -> Self {
        Self::builder(root, sink).build()
    }

    /// Starts configuring a session.
    pub fn builder(root: Context, sink: Rc<dyn DisplaySink>) -> SessionBuilder {
        SessionBuilder {
            root,
            sink,
            config: SessionConfig::default(),
            history_provider: None,
            command_log: None,
        }
    }

    /// Writes the greeting, if configured, followed by the first prompt.
    pub fn start(&self) {
        if let Some(greeting) = &self.shared.config.greeting {
            self.shared.sink.write(greeting);
            self.shared.sink.write("\n");
        }
        self.shared.write_prompt();
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Replaces the edit buffer and caret.
    pub fn edit(&self, buffer: impl Into<String>, caret: usize) {
        self.shared.input_mut().edit(buffer, caret);
    }

    /// Moves the caret, clamped to the buffer.
    pub fn set_caret(&self, caret: usize) {
        self.shared.input_mut().set_caret(caret);
    }

    /// Empties the buffer and leaves history navigation.
    pub fn clear_input(&self) {
        self.shared.input_mut().clear();
    }

    /// Leaves history navigation, restoring the buffer saved before it started.
    pub fn leave_history(&self) {
        self.shared.input_mut().leave_history();
    }

    /// Snapshot of the input state.
    pub fn input(&self) -> InputState {
        self.shared.input.borrow().clone()
    }

    /// Uncommitted input.
    pub fn buffer(&self) -> String {
        self.shared.input.borrow().buffer().to_string()
    }

    /// Caret position in characters.
    pub fn caret(&self) -> usize {
        self.shared.input.borrow().caret()
    }

    /// Submitted lines, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.shared.input.borrow().history().to_vec()
    }

    /// History navigation cursor; `None` when not navigating.
    pub fn history_cursor(&self) -> Option<usize> {
        self.shared.input.borrow().cursor()
    }

    /// Whether a command is running and has not been interrupted.
    pub fn is_waiting(&self) -> bool {
        self.shared.waiting.get()
    }

    /// Whether an execution still occupies the session, including one winding down after
    /// an interrupt. A command that ignores the interrupt is dropped once
    /// [`SessionConfig::cancel_grace`] has passed, which frees the session again.
    pub fn is_busy(&self) -> bool {
        self.shared.waiting.get() || self.shared.active.borrow().is_some()
    }

    /// Whether the session was closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.get()
    }

    /// Closes the session. Later submissions are refused and no further prompts are written.
    pub fn close(&self) {
        self.shared.closed.set(true);
    }

    /// Prompt of the current context.
    pub fn current_prompt(&self) -> String {
        self.shared.stack.borrow().current().prompt().to_string()
    }

    /// Context that receives input.
    pub fn current_context(&self) -> Context {
        self.shared.stack.borrow().current().clone()
    }

    /// Number of stacked contexts, including the root.
    pub fn depth(&self) -> usize {
        self.shared.stack.borrow().depth()
    }

    /// Command context outside of any execution, for embedding and tests.
    pub fn command_context(&self) -> CommandContext {
        let (_trigger, token) = cancel_pair();
        CommandContext::new(self.shared.clone(), self.shared.next_execution_id(), token)
    }

    /// Commits the buffer and dispatches it on the current context.
    ///
    /// The prompt of the (possibly changed) current context is written once the command has
    /// finished, unless the session was closed meanwhile. After an interrupt the command has
    /// [`SessionConfig::cancel_grace`] to wind down before it is dropped unfinished.
    pub async fn submit(&self) -> SubmitOutcome {
        let shared = &self.shared;
        if shared.closed.get() {
            log::debug!("ignoring submit on closed session");
            return SubmitOutcome::Closed;
        }
        if self.is_busy() {
            shared.sink.write(BUSY_MESSAGE);
            return SubmitOutcome::Rejected;
        }

        let line = shared.input_mut().take_submission(shared.config.history_limit);
        shared.sink.write(&format!("{line}\n"));
        if !line.is_empty() {
            if let Some(command_log) = &shared.command_log {
                if let Err(error) = command_log.record(&line) {
                    log::debug!("failed to record `{line}`: {error}");
                }
            }
        }

        let id = shared.next_execution_id();
        let (trigger, token) = cancel_pair();
        *shared.active.borrow_mut() = Some(ActiveExecution { id, trigger });
        shared.waiting.set(true);
        let slot = ExecutionSlot {
            shared: shared.as_ref(),
        };

        let context = shared.stack.borrow().current().clone();
        log::debug!("execution {} dispatching on `{}`", id.0, context.name());
        let outcome = {
            let dispatch =
                context.dispatch(CommandContext::new(shared.clone(), id, token.clone()), &line);
            let overdue = async {
                token.cancelled().await;
                tokio::time::sleep(shared.config.cancel_grace()).await;
            };
            pin_mut!(dispatch, overdue);
            match future::select(dispatch, overdue).await {
                Either::Left((outcome, _)) => outcome,
                Either::Right(((), _)) => {
                    log::warn!(
                        "execution {} ignored cancellation for {:?}; dropping it",
                        id.0,
                        shared.config.cancel_grace()
                    );
                    DispatchOutcome::Abandoned {
                        command: shell_parser::parse_line(&line).command,
                    }
                }
            }
        };

        drop(slot);
        shared.write_prompt();
        if token.is_cancelled() {
            SubmitOutcome::Cancelled(outcome)
        } else {
            SubmitOutcome::Dispatched(outcome)
        }
    }

    /// Moves one step through history.
    ///
    /// Steps past local memory ask the history provider; a failed fetch leaves the buffer and
    /// cursor unchanged. Only one fetch runs at a time, and a fetched entry is dropped when the
    /// input changed while it was in flight.
    pub async fn step_history(&self, direction: HistoryDirection) -> HistoryStep {
        let shared = self.shared.as_ref();
        if shared.waiting.get() || shared.fetching.get() {
            return HistoryStep::Ignored;
        }
        let index = match shared.input_mut().step_local(direction) {
            Ok(step) => return step,
            Err(index) => index,
        };
        let Some(provider) = shared.history_provider.clone() else {
            return HistoryStep::Unavailable;
        };

        let generation = shared.input_generation.get();
        shared.fetching.set(true);
        let _slot = FetchSlot { shared };
        let fetched = provider.fetch(index).await;
        if shared.input_generation.get() != generation {
            log::debug!("dropping history entry {index}: input changed while fetching");
            return HistoryStep::Superseded;
        }
        match fetched {
            Ok(entry) => HistoryStep::Remote(shared.input_mut().apply_remote(entry)),
            Err(error) => {
                log::debug!("history provider failed for index {index}: {error}");
                HistoryStep::Unavailable
            }
        }
    }

    /// Aborts the current input line and signals the running command, if any.
    pub fn interrupt(&self) {
        let shared = &self.shared;
        let line = shared.input_mut().take_submission(shared.config.history_limit);
        shared
            .sink
            .write(&format!("{line}{}\n", shared.config.interrupt_marker));

        let cancelled = shared.active.borrow_mut().as_mut().map(|active| {
            active.trigger.cancel();
            active.id
        });
        match cancelled {
            Some(id) => {
                log::debug!("execution {} cancelled", id.0);
                shared.waiting.set(false);
            }
            None => shared.write_prompt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{BufferSink, Command};

    fn session_with(commands: Vec<Command>) -> (Session, BufferSink) {
        let sink = BufferSink::new();
        let root = Context::with_commands("root", "$ ", commands);
        (Session::new(root, Rc::new(sink.clone())), sink)
    }

    #[test]
    fn start_writes_greeting_and_prompt() {
        let sink = BufferSink::new();
        let session = Session::builder(Context::new("root", "$ "), Rc::new(sink.clone()))
            .config(SessionConfig {
                greeting: Some("Welcome".to_string()),
                ..SessionConfig::default()
            })
            .build();
        session.start();
        assert_eq!(sink.contents(), "Welcome\n$ ");
    }

    #[test]
    fn submit_echoes_dispatches_and_prompts() {
        let echo = Command::from_fn("echo", "echo", Vec::new(), |context, _| async move {
            context.out("echoed");
            context.br();
            Ok(())
        })
        .expect("command");
        let (session, sink) = session_with(vec![echo]);
        session.edit("  echo  ", 2);
        let outcome = block_on(session.submit());
        assert_eq!(
            outcome,
            SubmitOutcome::Dispatched(DispatchOutcome::Completed {
                command: "echo".to_string()
            })
        );
        assert_eq!(sink.contents(), "echo\nechoed\n$ ");
        assert_eq!(session.history(), vec!["echo".to_string()]);
        assert_eq!(session.buffer(), "");
        assert!(!session.is_busy());
    }

    #[test]
    fn blank_submit_only_echoes_and_prompts() {
        let (session, sink) = session_with(Vec::new());
        let outcome = block_on(session.submit());
        assert_eq!(outcome, SubmitOutcome::Dispatched(DispatchOutcome::Empty));
        assert_eq!(sink.contents(), "\n$ ");
        assert!(session.history().is_empty());
    }

    #[test]
    fn idle_interrupt_echoes_marker_and_prompt() {
        let (session, sink) = session_with(Vec::new());
        session.edit("half typed ", 4);
        session.interrupt();
        assert_eq!(sink.contents(), "half typed^C\n$ ");
        assert_eq!(session.history(), vec!["half typed".to_string()]);
        assert_eq!(session.buffer(), "");
    }

    #[test]
    fn closed_session_refuses_submit_and_prompt() {
        let (session, sink) = session_with(Vec::new());
        session.close();
        session.edit("help", 4);
        assert_eq!(block_on(session.submit()), SubmitOutcome::Closed);
        session.interrupt();
        assert_eq!(sink.contents(), "help^C\n");
    }

    #[test]
    fn history_without_provider_is_unavailable_past_local_entries() {
        let (session, _sink) = session_with(Vec::new());
        session.edit("help", 4);
        block_on(session.submit());
        assert_eq!(
            block_on(session.step_history(HistoryDirection::Older)),
            HistoryStep::Local(0)
        );
        assert_eq!(
            block_on(session.step_history(HistoryDirection::Older)),
            HistoryStep::Unavailable
        );
        assert_eq!(session.buffer(), "help");
        assert_eq!(session.history_cursor(), Some(0));
    }
}
