use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use photoview::config::{ConfigError, ViewerConfig};
use photoview::engine::Engine;
use photoview::geometry::Size;
use photoview::input::InputEvent;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid event on line {line}: {source}")]
    InvalidEvent { line: usize, source: serde_json::Error },
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid size `{0}`; expected WIDTHxHEIGHT with positive numbers")]
    InvalidSize(String),
    #[error("failed to read config {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Parser, Debug)]
#[command(name = "photoview-cli", about = "Drive the photoview touch engine from scripted input")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Feed JSON-lines input events through an engine and print each result.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Event script, one JSON event per line. Reads stdin when omitted.
    #[arg(long)]
    script: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Mode::ZoomPan)]
    mode: Mode,

    /// Bitmap pixel size for the zoom/pan model, as WIDTHxHEIGHT.
    #[arg(long, default_value = "1000x1000")]
    bitmap: String,

    /// JSON file overriding the viewer tunables.
    #[arg(long, env = "PHOTOVIEW_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Drag,
    ZoomPan,
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Replay(args) => run_replay(args),
    }
}

fn run_replay(args: ReplayArgs) -> Result<(), CliError> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ViewerConfig::default(),
    };
    let mut engine = match args.mode {
        Mode::Drag => Engine::drag(),
        Mode::ZoomPan => Engine::zoom_pan(parse_size(&args.bitmap)?, config),
    };

    let stdout = io::stdout();
    let count = match &args.script {
        Some(path) => replay(&mut engine, BufReader::new(File::open(path)?), stdout.lock())?,
        None => replay(&mut engine, io::stdin().lock(), stdout.lock())?,
    };
    tracing::info!(events = count, "replay finished");
    Ok(())
}

fn load_config(path: &Path) -> Result<ViewerConfig, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::ConfigRead { path: path.to_path_buf(), source })?;
    let config = ViewerConfig::from_json(&raw)?;
    tracing::debug!(path = %path.display(), "loaded viewer config");
    Ok(config)
}

/// Runs every event line through `engine`, writing one JSON result line per
/// event. Blank lines are skipped. Returns the number of events handled.
fn replay(engine: &mut Engine, input: impl BufRead, mut out: impl Write) -> Result<usize, CliError> {
    let mut handled = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: InputEvent =
            serde_json::from_str(trimmed).map_err(|source| CliError::InvalidEvent { line: index + 1, source })?;
        let actions = engine.handle(event);
        handled += 1;
        let record = json!({
            "event": handled,
            "actions": actions,
            "snapshot": engine.snapshot(),
        });
        writeln!(out, "{}", serde_json::to_string(&record)?)?;
    }
    out.flush()?;
    Ok(handled)
}

fn parse_size(raw: &str) -> Result<Size, CliError> {
    let invalid = || CliError::InvalidSize(raw.to_string());
    let (width, height) = raw.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: f64 = width.trim().parse().map_err(|_| invalid())?;
    let height: f64 = height.trim().parse().map_err(|_| invalid())?;
    let size = Size::new(width, height);
    if size.is_valid() { Ok(size) } else { Err(invalid()) }
}
