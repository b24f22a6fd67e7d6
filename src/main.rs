//! Replays an upload event log and prints the final results
//!
//! Reads from stdin when no file is given.

use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;

use uploadpulse_lib::modules::export::{ClipboardSink, FileSink, TextSink};
use uploadpulse_lib::progress::ProgressUpdate;
use uploadpulse_lib::{init_logging, replay, Result, TrackerConfig};

/// Replay a JSON-lines upload event log and export the results
#[derive(Parser, Debug)]
#[command(name = "uploadpulse", version, about)]
struct Args {
    /// Event log with one `{"name": ..., "data": ...}` frame per line
    #[arg(value_name = "EVENTS_FILE")]
    input: Option<PathBuf>,

    /// Write the results JSON to this file instead of stdout
    #[arg(short, long, value_name = "PATH", conflicts_with = "clipboard")]
    export: Option<PathBuf>,

    /// Copy the results JSON to the system clipboard
    #[arg(short, long)]
    clipboard: bool,
}

impl Args {
    fn sink(&self) -> Option<Box<dyn TextSink>> {
        if let Some(path) = &self.export {
            return Some(Box::new(FileSink::new(path)));
        }
        if self.clipboard {
            return Some(Box::new(ClipboardSink));
        }
        None
    }
}

async fn run(args: Args) -> Result<bool> {
    let config = TrackerConfig::from_env()?;
    let cancel = CancellationToken::new();

    let tracker = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            replay(BufReader::new(file), &config, cancel).await?
        }
        None => replay(BufReader::new(tokio::io::stdin()), &config, cancel).await?,
    };

    let summary = ProgressUpdate::from_state(&tracker.snapshot()).summary();
    log::info!("Final: {summary}");

    match args.sink() {
        Some(sink) => Ok(tracker.copy_results(sink.as_ref()).await),
        None => {
            let json = tracker.results_json()?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();
    init_logging();

    match run(args).await {
        Ok(true) => std::process::ExitCode::SUCCESS,
        Ok(false) => std::process::ExitCode::FAILURE,
        Err(e) => {
            let message: String = e.into();
            log::error!("{message}");
            std::process::ExitCode::FAILURE
        }
    }
}
