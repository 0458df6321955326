use std::rc::Rc;

use shell_contract::ExecutionId;

use crate::{session::SessionShared, CancelToken, Context, SessionConfig};

/// Capabilities handed to a running command.
///
/// Gives access to the session's display sink, its context stack, and the cancellation token of
/// the current execution. Clones refer to the same execution.
#[derive(Clone)]
pub struct CommandContext {
    session: Rc<SessionShared>,
    execution_id: ExecutionId,
    cancel: CancelToken,
    dispatching: Option<Context>,
}

impl CommandContext {
    pub(crate) fn new(session: Rc<SessionShared>, execution_id: ExecutionId, cancel: CancelToken) -> Self {
        Self {
            session,
            execution_id,
            cancel,
            dispatching: None,
        }
    }

    /// Returns a copy bound to the context that is dispatching the command.
    pub(crate) fn within(&self, context: Context) -> Self {
        Self {
            dispatching: Some(context),
            ..self.clone()
        }
    }

    /// Identifier of the execution this context belongs to.
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    /// Writes `text` to the display sink.
    pub fn out(&self, text: &str) {
        self.session.sink.write(text);
    }

    /// Writes a line break.
    pub fn br(&self) {
        self.out("\n");
    }

    /// Clears the display.
    pub fn clear_screen(&self) {
        self.session.sink.clear();
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.session.config
    }

    /// Whether the user interrupted this execution.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the user interrupts this execution.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Cancellation token of this execution.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Pushes `context` onto the session's stack; later input goes to it.
    pub fn push_context(&self, context: Context) {
        log::info!("entering context `{}`", context.name());
        self.session.stack.borrow_mut().push(context);
    }

    /// Pops the current context and reports the result to the sink.
    ///
    /// Returns the popped context, or `None` when only the root remains.
    pub fn pop_context(&self) -> Option<Context> {
        let popped = self.session.stack.borrow_mut().pop();
        match &popped {
            Some(context) => {
                log::info!("leaving context `{}`", context.name());
                self.out(&format!("Context popped: {}\n", context.name()));
            }
            None => self.out("No context to pop.\n"),
        }
        popped
    }

    /// Context currently on top of the session's stack.
    pub fn current_context(&self) -> Context {
        self.session.stack.borrow().current().clone()
    }

    /// Context that dispatched the running command, if any.
    pub fn dispatching_context(&self) -> Option<&Context> {
        self.dispatching.as_ref()
    }

    /// Closes the session; no prompt is written after the current command.
    pub fn close_session(&self) {
        log::info!("session closed by command");
        self.session.closed.set(true);
    }

    /// Whether the session still considers a command to be running.
    pub fn is_waiting(&self) -> bool {
        self.session.waiting.get()
    }
}
