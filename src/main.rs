//! `recall` binary: parses flags, sets up logging and runs the console.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recall::config::Config;
use recall::process::ForkExecRunner;
use recall::repl::Console;
use recall::session::Session;

#[derive(Parser, Debug)]
#[command(name = "recall")]
#[command(version, about = "History pickers and desktop utility commands", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/recall/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run one command line and exit with its status
    #[arg(short, long)]
    command: Option<String>,

    /// Neither load nor save the history file
    #[arg(long)]
    no_history: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "recall=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref())?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting recall");

    let mut session = Session::new(config, ForkExecRunner);
    if !cli.no_history {
        session.load_history();
    }
    let mut console = Console::new().context("initializing line editor")?;

    let code = match cli.command {
        Some(line) => console.execute_once(&mut session, &line),
        None => console.run(&mut session).context("reading input")?,
    };

    if !cli.no_history {
        session.save_history();
    }
    std::process::exit(code);
}
