use std::{path::PathBuf, process::exit, rc::Rc};

use clap::Parser;
use shell_engine::DisplaySink;
use shell_terminal::{
    build_session,
    config::TerminalConfig,
    error::{TerminalError, TerminalResult},
    history::JsonlHistory,
    host::{Host, StdoutSink},
};
use tokio::io::BufReader;

#[derive(Debug, Parser)]
#[command(name = "shell-terminal", about = "Interactive command shell with stacked contexts")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// JSON-lines history file; overrides `history_file` from the config.
    #[arg(long, value_name = "PATH", conflicts_with = "no_history")]
    history: Option<PathBuf>,
    /// Keep history in memory only.
    #[arg(long)]
    no_history: bool,
}

fn main() {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_deref()
        .map(TerminalConfig::load)
        .transpose()
        .map(Option::unwrap_or_default);

    let level = config
        .as_ref()
        .map_or("warn", |config| config.log_level.as_str())
        .to_string();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(err) = config.and_then(|config| try_main(&cli, config)) {
        log::error!("{err}");
        exit(1);
    }
}

fn try_main(cli: &Cli, config: TerminalConfig) -> TerminalResult<()> {
    let history_path = if cli.no_history {
        None
    } else {
        cli.history.clone().or_else(|| config.history_file.clone())
    };
    let history = history_path
        .as_deref()
        .map(JsonlHistory::open)
        .transpose()?
        .map(Rc::new);

    let sink: Rc<dyn DisplaySink> = Rc::new(StdoutSink);
    let session = build_session(&config, sink.clone(), history)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(TerminalError::Runtime)?;
    runtime.block_on(Host::new(session, sink).run(BufReader::new(tokio::io::stdin())))
}
