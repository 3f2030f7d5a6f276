//! ticker-mentions: binary entrypoint.
//! `run` counts a ticker across the accounts in a file and prints a summary;
//! `serve` exposes the same engine over HTTP.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ticker_mentions::api::{self, AppState};
use ticker_mentions::config::{Backend, CounterConfig};
use ticker_mentions::metrics::Metrics;
use ticker_mentions::{load_accounts, InputError, MentionRunner, RecencyWindow, Ticker, TimeUnit};

const EXAMPLE: &str = "Example:\n  ticker-mentions run accounts.txt TSLA 24 hours\n\nUnits: mins, hours, days, weeks";

#[derive(Parser)]
#[command(
    name = "ticker-mentions",
    version,
    about = "Count recent mentions of a ticker across a list of accounts",
    after_help = EXAMPLE
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count mentions once and print the report.
    Run(RunArgs),
    /// Start the HTTP API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
#[command(after_help = EXAMPLE)]
struct RunArgs {
    /// Text file with one account URL per line.
    accounts_file: PathBuf,
    ticker: String,
    count: u64,
    /// mins | hours | days | weeks
    unit: TimeUnit,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the structured report as JSON after the summary.
    #[arg(long)]
    json: bool,
    /// Override `fetch.backend` from the config file.
    #[arg(long)]
    backend: Option<Backend>,
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ticker_mentions=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let res = match cli.cmd {
        Command::Run(args) => run(args).await,
        Command::Serve { addr, config } => serve(&addr, config.as_deref()).await,
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(input) = e.downcast_ref::<InputError>() {
                eprintln!("error: {input}\n");
                eprintln!("{}", Cli::command().render_usage());
                eprintln!("\n{EXAMPLE}");
                return ExitCode::from(2);
            }
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    // Inputs are validated before anything is fetched.
    let ticker = Ticker::new(&args.ticker)?;
    let window = RecencyWindow::new(args.count, args.unit)?;
    let accounts = load_accounts(&args.accounts_file)?;

    let mut cfg = CounterConfig::load(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        cfg.fetch.backend = backend;
    }
    let runner = MentionRunner::from_config(&cfg)?;

    let report = runner.run(&accounts, &ticker, window).await;
    println!("{report}");
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

async fn serve(addr: &str, config: Option<&Path>) -> anyhow::Result<()> {
    let cfg = CounterConfig::load(config)?;
    let runner = MentionRunner::from_config(&cfg)?;
    let state = AppState {
        runner: Arc::new(runner),
    };

    let mut app = api::router(state);
    match Metrics::init() {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => warn!(error = %e, "metrics recorder not installed; /metrics disabled"),
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, backend = ?cfg.fetch.backend, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
