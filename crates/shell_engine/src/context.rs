use std::{cell::RefCell, collections::BTreeMap, fmt, rc::Rc};

use shell_contract::ShellError;

use crate::{CallOutcome, Command, CommandContext};

/// How one input line was handled by [`Context::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The line was blank.
    Empty,
    /// No command with this name is registered in the context.
    NotFound {
        /// Requested command name.
        command: String,
    },
    /// Help text was printed instead of running the command.
    Help {
        /// Matched command name.
        command: String,
    },
    /// The command ran to completion.
    Completed {
        /// Matched command name.
        command: String,
    },
    /// The command ignored an interrupt past the grace period and was dropped unfinished.
    Abandoned {
        /// Matched command name.
        command: String,
    },
    /// Validation or the handler failed; the error was reported to the sink.
    Failed {
        /// Matched command name.
        command: String,
        /// Reported error.
        error: ShellError,
    },
}

struct ContextInner {
    name: String,
    prompt: String,
    commands: RefCell<BTreeMap<String, Command>>,
}

/// Named command registry with its own prompt; the unit pushed onto a session's context stack.
///
/// Clones share the same registry, so commands attached later are visible to every holder.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.inner.name)
            .field("prompt", &self.inner.prompt)
            .field("commands", &self.command_names())
            .finish()
    }
}

impl Context {
    /// Creates a context that only knows the built-in `help` command.
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        let mut commands = BTreeMap::new();
        let help = help_command();
        commands.insert(help.name().to_string(), help);
        Self {
            inner: Rc::new(ContextInner {
                name: name.into(),
                prompt: prompt.into(),
                commands: RefCell::new(commands),
            }),
        }
    }

    /// Creates a context and attaches `commands` in order.
    pub fn with_commands(
        name: impl Into<String>,
        prompt: impl Into<String>,
        commands: impl IntoIterator<Item = Command>,
    ) -> Self {
        let context = Self::new(name, prompt);
        for command in commands {
            context.attach_command(command);
        }
        context
    }

    /// Context name used in log lines and stack messages.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Prompt written before each input line.
    pub fn prompt(&self) -> &str {
        &self.inner.prompt
    }

    /// Whether both handles refer to the same registry.
    pub fn same_as(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Registers `command`, replacing any command with the same name.
    pub fn attach_command(&self, command: Command) {
        let name = command.name().to_string();
        if self.inner.commands.borrow_mut().insert(name.clone(), command).is_some() {
            log::warn!(
                "command `{name}` is already attached to context `{}`; overwriting it",
                self.inner.name
            );
        }
    }

    /// Removes the command named `name`. The built-in `help` command cannot be removed.
    pub fn detach_command(&self, name: &str) -> Option<Command> {
        if name == HELP_COMMAND {
            log::warn!("refusing to detach `help` from context `{}`", self.inner.name);
            return None;
        }
        self.inner.commands.borrow_mut().remove(name)
    }

    /// Returns the command registered under `name`.
    pub fn command(&self, name: &str) -> Option<Command> {
        self.inner.commands.borrow().get(name).cloned()
    }

    /// Registered command names in sorted order.
    pub fn command_names(&self) -> Vec<String> {
        self.inner.commands.borrow().keys().cloned().collect()
    }

    /// Help for every registered command, one block per command, sorted by name.
    pub fn help_statement(&self) -> String {
        self.inner
            .commands
            .borrow()
            .values()
            .map(Command::help_statement)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parses `line`, resolves the command, and runs it.
    ///
    /// Unknown commands and every validation or handler failure are reported to the session's
    /// display sink; nothing propagates to the caller.
    pub async fn dispatch(&self, context: CommandContext, line: &str) -> DispatchOutcome {
        let parsed = shell_parser::parse_line(line);
        if parsed.is_empty() {
            return DispatchOutcome::Empty;
        }
        log::debug!(
            "context `{}` handling `{}` positional={:?} named={:?}",
            self.inner.name,
            parsed.command,
            parsed.positional,
            parsed.named
        );

        let Some(command) = self.command(&parsed.command) else {
            context.out(&context.config().not_found_message);
            context.br();
            return DispatchOutcome::NotFound {
                command: parsed.command,
            };
        };

        let context = context.within(self.clone());
        match command
            .call(context.clone(), parsed.positional, parsed.named)
            .await
        {
            Ok(CallOutcome::Help(text)) => {
                context.out(&text);
                context.br();
                DispatchOutcome::Help {
                    command: parsed.command,
                }
            }
            Ok(CallOutcome::Completed) => DispatchOutcome::Completed {
                command: parsed.command,
            },
            Err(error) => {
                log::debug!("command `{}` failed: {error}", parsed.command);
                context.out(&format!(
                    "Error executing command '{}': {error}\n",
                    parsed.command
                ));
                DispatchOutcome::Failed {
                    command: parsed.command,
                    error,
                }
            }
        }
    }
}

const HELP_COMMAND: &str = "help";

fn help_command() -> Command {
    Command::builtin(
        HELP_COMMAND,
        "List all available commands.",
        Vec::new(),
        |context, _| async move {
            if let Some(dispatching) = context.dispatching_context() {
                context.out(&dispatching.help_statement());
            }
            context.br();
            Ok(())
        },
    )
}
