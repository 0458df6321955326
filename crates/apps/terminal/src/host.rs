//! Line-oriented host that drives a [`Session`] from stdin-like input.

use std::{
    io::{self, Write},
    rc::Rc,
};

use futures::{future::LocalBoxFuture, FutureExt};
use shell_engine::{DisplaySink, HistoryDirection, HistoryStep, Session, SubmitOutcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{TerminalError, TerminalResult};

/// Writes session output straight to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl DisplaySink for StdoutSink {
    fn write(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(err) = stdout.write_all(text.as_bytes()).and_then(|()| stdout.flush()) {
            log::debug!("failed to write to stdout: {err}");
        }
    }

    fn clear(&self) {
        self.write("\x1b[2J\x1b[H");
    }
}

/// One line of host input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostInput {
    /// `^C`: interrupt the running command or abandon the buffer.
    Interrupt,
    /// `:up` / `:down`: step through history.
    History(HistoryDirection),
    /// Anything else is submitted as a command line.
    Line(String),
}

impl HostInput {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "^C" => Self::Interrupt,
            ":up" => Self::History(HistoryDirection::Older),
            ":down" => Self::History(HistoryDirection::Newer),
            _ => Self::Line(line.to_string()),
        }
    }
}

enum HostEvent {
    Finished(SubmitOutcome),
    Input(Option<String>),
}

type RunningSubmit = LocalBoxFuture<'static, SubmitOutcome>;

/// Feeds input lines into a session while at most one submission runs.
pub struct Host {
    session: Session,
    sink: Rc<dyn DisplaySink>,
}

impl Host {
    /// `sink` must be the sink the session writes to; it is used to redraw recalled history.
    pub fn new(session: Session, sink: Rc<dyn DisplaySink>) -> Self {
        Self { session, sink }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs until the input ends or a command closes the session.
    ///
    /// Input keeps being read while a command runs so that `^C` reaches it. At end of input a
    /// running command is interrupted and awaited.
    pub async fn run<R>(&self, input: R) -> TerminalResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut running: Option<RunningSubmit> = None;
        self.session.start();

        while !self.session.is_closed() {
            let event = match running.as_mut() {
                Some(submit) => tokio::select! {
                    biased;
                    outcome = submit => HostEvent::Finished(outcome),
                    line = lines.next_line() => HostEvent::Input(line.map_err(TerminalError::Input)?),
                },
                None => HostEvent::Input(lines.next_line().await.map_err(TerminalError::Input)?),
            };

            match event {
                HostEvent::Finished(outcome) => {
                    log::debug!("submission finished: {outcome:?}");
                    running = None;
                }
                HostEvent::Input(None) => {
                    if let Some(submit) = running.take() {
                        self.session.interrupt();
                        submit.await;
                    }
                    break;
                }
                HostEvent::Input(Some(line)) => {
                    self.handle(HostInput::parse(&line), &mut running).await;
                }
            }
        }
        Ok(())
    }

    async fn handle(&self, input: HostInput, running: &mut Option<RunningSubmit>) {
        match input {
            HostInput::Interrupt => self.session.interrupt(),
            HostInput::History(direction) => {
                let step = self.session.step_history(direction).await;
                if matches!(
                    step,
                    HistoryStep::Restored | HistoryStep::Local(_) | HistoryStep::Remote(_)
                ) {
                    self.sink.write(&format!(
                        "\r{}{}",
                        self.session.current_prompt(),
                        self.session.buffer()
                    ));
                }
            }
            HostInput::Line(line) => {
                // An empty line submits whatever history navigation recalled.
                if !line.trim().is_empty() || self.session.history_cursor().is_none() {
                    let caret = line.chars().count();
                    self.session.edit(line, caret);
                }
                let session = self.session.clone();
                let submit = async move { session.submit().await }.boxed_local();
                match running {
                    Some(_) => {
                        submit.await;
                    }
                    None => *running = Some(submit),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use shell_engine::{builtins::ROOT_PROMPT, BufferSink, SessionConfig, BUSY_MESSAGE};
    use tokio::io::BufReader;

    use super::*;
    use crate::{build_session, config::TerminalConfig};

    fn host(config: TerminalConfig) -> (Host, BufferSink) {
        let sink = BufferSink::new();
        let shared: Rc<dyn DisplaySink> = Rc::new(sink.clone());
        let session = build_session(&config, shared.clone(), None).expect("session");
        (Host::new(session, shared), sink)
    }

    async fn drive(host: &Host, script: &str) {
        host.run(BufReader::new(script.as_bytes())).await.expect("run");
    }

    #[test]
    fn control_lines_are_recognized() {
        assert_eq!(HostInput::parse(" ^C "), HostInput::Interrupt);
        assert_eq!(HostInput::parse(":up"), HostInput::History(HistoryDirection::Older));
        assert_eq!(HostInput::parse(":down"), HostInput::History(HistoryDirection::Newer));
        assert_eq!(HostInput::parse("find x"), HostInput::Line("find x".to_string()));
    }

    #[tokio::test]
    async fn scripted_session_runs_until_exit() {
        let (host, sink) = host(TerminalConfig::default());
        drive(&host, "msg\nexit\nmsg\n").await;
        assert!(host.session().is_closed());
        assert_eq!(
            sink.contents(),
            format!("{ROOT_PROMPT}msg\nHello, World!\n{ROOT_PROMPT}exit\nClosing the terminal...\n")
        );
    }

    #[tokio::test]
    async fn interrupt_line_reaches_running_command() {
        let mut config = TerminalConfig::default();
        config.session = SessionConfig {
            wait_tick_ms: 5,
            ..SessionConfig::default()
        };
        let (host, sink) = host(config);
        drive(&host, "wait\nmsg\n^C\n").await;

        let transcript = sink.contents();
        assert!(transcript.contains(BUSY_MESSAGE));
        assert!(transcript.ends_with(&format!("msg^C\nDone waiting.\n{ROOT_PROMPT}")));
        assert!(!host.session().is_busy());
    }

    #[tokio::test]
    async fn history_recall_resubmits_on_empty_line() {
        let (host, sink) = host(TerminalConfig::default());
        drive(&host, "msg\n:up\n\n").await;
        assert_eq!(
            sink.contents(),
            format!(
                "{ROOT_PROMPT}msg\nHello, World!\n{ROOT_PROMPT}\r{ROOT_PROMPT}msg\
                 msg\nHello, World!\n{ROOT_PROMPT}"
            )
        );
        assert_eq!(host.session().history(), vec!["msg".to_string(), "msg".to_string()]);
    }

    #[tokio::test]
    async fn end_of_input_interrupts_running_command() {
        let mut config = TerminalConfig::default();
        config.session.wait_tick_ms = 5;
        let (host, sink) = host(config);
        drive(&host, "wait\n").await;
        assert!(sink.contents().ends_with(&format!("^C\nDone waiting.\n{ROOT_PROMPT}")));
        assert!(!host.session().is_busy());
    }

    #[tokio::test]
    async fn words_context_is_reachable() {
        let (host, sink) = host(TerminalConfig::default());
        drive(&host, "words\nadd hola es\nexit\nmsg\n").await;
        assert_eq!(
            sink.contents(),
            format!(
                "{ROOT_PROMPT}words\nWords terminal started.\nwords> \
                 add hola es\nWord 'hola' added to es.\nwords> \
                 exit\nContext popped: words\nBye!\n{ROOT_PROMPT}\
                 msg\nHello, World!\n{ROOT_PROMPT}"
            )
        );
    }
}
