use std::fmt;

use shell_engine::{Command, CommandContext, ParamKind, Parameter, ShellError};
use tokio::{net::TcpStream, time};

use crate::config::PingConfig;

/// Host and port probed by `ping`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingTarget {
    pub host: String,
    pub port: u16,
}

impl PingTarget {
    /// Extracts host and port from a URL or bare `host[:port]`.
    pub fn parse(url: &str, default_port: u16) -> Result<Self, ShellError> {
        let invalid = || ShellError::invalid_argument("url", ParamKind::Text, url);
        let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let authority = authority.rsplit_once('@').map_or(authority, |(_, host)| host);

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') || host.ends_with(']') => {
                (host, port.parse::<u16>().map_err(|_| invalid())?)
            }
            _ => (authority, default_port),
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for PingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// `ping <url>`: repeated TCP reachability probes, cancellable with Ctrl-C.
pub fn ping_command(config: PingConfig) -> Result<Command, ShellError> {
    Command::from_fn(
        "ping",
        "Pings a website to check connectivity.",
        vec![Parameter::positional("url", ParamKind::Text, "URL to ping").required()],
        move |context, args| {
            let config = config.clone();
            async move {
                let url = args
                    .text("url")
                    .ok_or_else(|| ShellError::missing_positional("url"))?;
                let target = PingTarget::parse(url, config.port)?;
                probe(&context, &target, &config).await;
                Ok(())
            }
        },
    )
}

async fn probe(context: &CommandContext, target: &PingTarget, config: &PingConfig) {
    context.out(&format!("Attempting to ping {target}...\n"));
    context.out("Press Ctrl+C to cancel.\n");

    let mut ticks = time::interval(config.interval());
    for attempt in 1..=config.attempts {
        tokio::select! {
            biased;
            _ = context.cancelled() => break,
            _ = ticks.tick() => {}
        }

        let connect = time::timeout(
            config.timeout(),
            TcpStream::connect((target.host.as_str(), target.port)),
        );
        let result = tokio::select! {
            biased;
            _ = context.cancelled() => break,
            result = connect => result,
        };
        match result {
            Ok(Ok(_stream)) => context.out(&format!("Ping {attempt} successful!\n")),
            Ok(Err(err)) => context.out(&format!("Ping attempt {attempt} failed: {err}\n")),
            Err(_) => context.out(&format!(
                "Ping attempt {attempt} failed: timed out after {} ms\n",
                config.timeout_ms
            )),
        }
    }
    context.out("Ping process completed.\n");
}

#[cfg(test)]
mod tests {
    use std::{rc::Rc, time::Duration};

    use pretty_assertions::assert_eq;
    use shell_engine::{BufferSink, Context, Session, SubmitOutcome};
    use tokio::net::TcpListener;

    use super::*;

    fn session(config: PingConfig) -> (Session, BufferSink) {
        let sink = BufferSink::new();
        let root = Context::with_commands("root", "$ ", [ping_command(config).expect("ping")]);
        (Session::new(root, Rc::new(sink.clone())), sink)
    }

    fn fast(attempts: u32, interval_ms: u64) -> PingConfig {
        PingConfig {
            attempts,
            interval_ms,
            timeout_ms: 1000,
            port: 443,
        }
    }

    #[test]
    fn targets_are_extracted_from_urls() {
        assert_eq!(
            PingTarget::parse("https://api.github.com/users?x=1", 443),
            Ok(PingTarget {
                host: "api.github.com".to_string(),
                port: 443
            })
        );
        assert_eq!(
            PingTarget::parse("localhost:8080", 443),
            Ok(PingTarget {
                host: "localhost".to_string(),
                port: 8080
            })
        );
        assert_eq!(
            PingTarget::parse("http://[::1]:9000/", 80),
            Ok(PingTarget {
                host: "::1".to_string(),
                port: 9000
            })
        );
        assert!(PingTarget::parse("https://", 443).is_err());
        assert!(PingTarget::parse("example.com:http", 443).is_err());
    }

    #[tokio::test]
    async fn reachable_listener_answers_every_attempt() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (session, sink) = session(fast(2, 5));

        session.edit(format!("ping {addr}"), 0);
        session.submit().await;
        assert_eq!(
            sink.contents(),
            format!(
                "ping {addr}\nAttempting to ping {addr}...\nPress Ctrl+C to cancel.\n\
                 Ping 1 successful!\nPing 2 successful!\nPing process completed.\n$ "
            )
        );
    }

    #[tokio::test]
    async fn refused_connection_is_reported_per_attempt() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let (session, sink) = session(fast(1, 5));

        session.edit(format!("ping {addr}"), 0);
        session.submit().await;
        let transcript = sink.contents();
        assert!(transcript.contains("Ping attempt 1 failed: "));
        assert!(transcript.ends_with("Ping process completed.\n$ "));
    }

    #[tokio::test]
    async fn interrupt_stops_probing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (session, sink) = session(fast(1000, 50));

        session.edit(format!("ping {addr}"), 0);
        let driver = session.clone();
        let (outcome, ()) = tokio::join!(session.submit(), async move {
            time::sleep(Duration::from_millis(20)).await;
            driver.interrupt();
        });

        assert!(matches!(outcome, SubmitOutcome::Cancelled(_)));
        let transcript = sink.contents();
        assert!(transcript.contains("Ping 1 successful!\n"));
        assert!(!transcript.contains("Ping 2"));
        assert!(transcript.ends_with("^C\nPing process completed.\n$ "));
    }
}
