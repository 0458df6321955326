use shell_contract::ShellError;

use crate::{Command, Context};

/// Last-in-first-out stack of contexts; the root frame is never popped.
#[derive(Debug, Clone)]
pub struct ContextStack {
    frames: Vec<Context>,
}

impl ContextStack {
    /// Creates a stack holding only `root`.
    pub fn new(root: Context) -> Self {
        Self { frames: vec![root] }
    }

    /// Makes `context` current.
    pub fn push(&mut self, context: Context) {
        self.frames.push(context);
    }

    /// Removes and returns the current context, or `None` when only the root remains.
    pub fn pop(&mut self) -> Option<Context> {
        if self.frames.len() == 1 {
            return None;
        }
        self.frames.pop()
    }

    /// Context that receives input.
    pub fn current(&self) -> &Context {
        // `frames` starts with the root and `pop` never removes it.
        &self.frames[self.frames.len() - 1]
    }

    /// Bottom-most context.
    pub fn root(&self) -> &Context {
        &self.frames[0]
    }

    /// Number of frames, including the root.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames from root to current.
    pub fn contexts(&self) -> &[Context] {
        &self.frames
    }
}

/// Makes `child` reachable from `parent`.
///
/// Registers `command_name` in `parent`, which pushes `child` and writes `welcome`, and an `exit`
/// command in `child`, which pops back and writes the session's farewell message.
///
/// # Errors
///
/// Returns a construction error when `command_name` is not a valid command name.
pub fn link_contexts(
    parent: &Context,
    child: &Context,
    command_name: &str,
    description: &str,
    welcome: &str,
) -> Result<(), ShellError> {
    let target = child.clone();
    let welcome = welcome.to_string();
    let enter = Command::from_fn(command_name, description, Vec::new(), move |context, _| {
        let target = target.clone();
        let welcome = welcome.clone();
        async move {
            context.push_context(target);
            context.out(&welcome);
            context.br();
            Ok(())
        }
    })?;
    let exit = Command::from_fn("exit", "Exit the current terminal", Vec::new(), |context, _| async move {
        context.pop_context();
        context.out(&context.config().farewell_message);
        context.br();
        Ok(())
    })?;

    parent.attach_command(enter);
    child.attach_command(exit);
    Ok(())
}
