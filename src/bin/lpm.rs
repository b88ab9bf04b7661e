use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lpm_trie::api::batch;
use lpm_trie::api::repl::{join_repl, repl, RouteConsole};
use lpm_trie::Result;

#[derive(Parser)]
#[command(name = "lpm")]
#[command(about = "Longest prefix match lookups over an IPv4 routing trie", long_about = None)]
struct Cli {
    /// Read the route/query listing from a file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Start an interactive console instead of batch mode
    #[arg(long, conflicts_with = "input")]
    interactive: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn run_batch(input: Option<PathBuf>) -> Result<()> {
    let stdout = io::stdout();
    match input {
        Some(path) => {
            let file = File::open(&path)?;
            tracing::info!(path = %path.display(), "reading routes");
            batch::run(BufReader::new(file), stdout.lock())?;
        }
        None => {
            batch::run(io::stdin().lock(), stdout.lock())?;
        }
    }
    Ok(())
}

fn run_interactive() -> Result<()> {
    let (tx, rx) = mpsc::channel();

    // Spawn the REPL in a separate thread; this thread owns the trie
    let repl_thread = thread::spawn(move || repl(tx));

    let mut console = RouteConsole::default();
    console.listen_for_commands(rx, &mut io::stdout())?;
    console.into_trie().release();

    join_repl(repl_thread)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let result = if cli.interactive {
        run_interactive()
    } else {
        run_batch(cli.input)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
