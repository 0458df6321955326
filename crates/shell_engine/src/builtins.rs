//! Root context with the stock commands every terminal starts with.

use crate::{Command, CommandContext, Context};

/// Prompt of the root context.
pub const ROOT_PROMPT: &str = "user@terminal:~$ ";

const LOADING: &str = "Loading";
const LOADING_MAX_LEN: usize = 10;

/// Builds the root context with `clear`, `msg`, `wait`, and `exit` attached.
pub fn default_context() -> Context {
    Context::with_commands(
        "terminal",
        ROOT_PROMPT,
        [clear_command(), msg_command(), wait_command(), exit_command()],
    )
}

fn clear_command() -> Command {
    Command::builtin("clear", "Clears the terminal output.", Vec::new(), |context, _| async move {
        context.clear_screen();
        Ok(())
    })
}

fn msg_command() -> Command {
    Command::builtin("msg", "Outputs the welcome message.", Vec::new(), |context, _| async move {
        context.out(&context.config().welcome_message);
        context.br();
        Ok(())
    })
}

fn wait_command() -> Command {
    Command::builtin(
        "wait",
        "Simulates a loading process with dots.",
        Vec::new(),
        |context, _| async move {
            wait_until_cancelled(&context).await;
            context.out("Done waiting.\n");
            Ok(())
        },
    )
}

async fn wait_until_cancelled(context: &CommandContext) {
    let mut frame = LOADING.to_string();
    context.out(&frame);

    let mut ticks = tokio::time::interval(context.config().wait_tick());
    // The first tick of an interval completes immediately.
    ticks.tick().await;
    loop {
        tokio::select! {
            biased;
            _ = context.cancelled() => break,
            _ = ticks.tick() => {
                frame.push('.');
                if frame.len() > LOADING_MAX_LEN {
                    frame = LOADING.to_string();
                }
                context.out(&format!("\r{frame}"));
            }
        }
    }
}

fn exit_command() -> Command {
    Command::builtin("exit", "Closes the terminal.", Vec::new(), |context, _| async move {
        context.out("Closing the terminal...\n");
        context.close_session();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use futures::executor::block_on;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{BufferSink, Session, SinkEvent};

    fn session() -> (Session, BufferSink) {
        let sink = BufferSink::new();
        (Session::new(default_context(), Rc::new(sink.clone())), sink)
    }

    #[test]
    fn root_context_lists_builtins() {
        assert_eq!(
            default_context().command_names(),
            vec!["clear", "exit", "help", "msg", "wait"]
        );
    }

    #[test]
    fn msg_writes_welcome_message() {
        let (session, sink) = session();
        session.edit("msg", 3);
        block_on(session.submit());
        assert_eq!(sink.contents(), format!("msg\nHello, World!\n{ROOT_PROMPT}"));
    }

    #[test]
    fn clear_goes_through_sink() {
        let (session, sink) = session();
        session.edit("clear", 5);
        block_on(session.submit());
        assert_eq!(sink.events()[1], SinkEvent::Clear);
        assert_eq!(sink.contents(), ROOT_PROMPT);
    }

    #[test]
    fn exit_closes_without_prompt() {
        let (session, sink) = session();
        session.edit("exit", 4);
        block_on(session.submit());
        assert!(session.is_closed());
        assert_eq!(sink.contents(), "exit\nClosing the terminal...\n");
    }
}
