//! labelfuse batch labeler
//!
//! Reads JSON-lines items, runs one labeling batch and writes JSON-lines
//! label records.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use labelfuse::{BatchOutcome, EngineConfig, LabelError, LabelRecord, LabelingEngine, RawItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "labelfuse", version, about = "Aggregate heuristic sentiment votes into labels")]
struct Args {
    /// JSON-lines file of items with `id` and `text` (or `title`).
    #[arg(long, short)]
    input: PathBuf,
    /// TOML configuration with rules and tuning.
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Where to write label records; stdout when omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Where to write the diagnostics and reliability report.
    #[arg(long)]
    diagnostics: Option<PathBuf>,
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Label(#[from] LabelError),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{path}:{line}: {source}")]
    Json {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl CliError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn exit_code(&self) -> ExitCode {
        match self {
            Self::Label(e) if e.is_configuration() => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    #[serde(flatten)]
    record: &'a LabelRecord,
    label_class: &'static str,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn read_items(path: &Path) -> Result<Vec<RawItem>, CliError> {
    let file = File::open(path).map_err(|e| CliError::io(path, e))?;
    let mut items = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| CliError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|source| CliError::Json {
            path: path.display().to_string(),
            line: index + 1,
            source,
        })?;
        items.push(item);
    }
    Ok(items)
}

fn write_records(outcome: &BatchOutcome, out: impl Write) -> io::Result<()> {
    let mut out = BufWriter::new(out);
    for record in &outcome.records {
        let line = OutputRecord {
            record,
            label_class: record.label_class(),
        };
        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn write_report(outcome: &BatchOutcome, out: impl Write) -> io::Result<()> {
    let report = json!({
        "batch_id": outcome.batch_id,
        "started_at": outcome.started_at,
        "finished_at": outcome.finished_at,
        "matrix_fingerprint": outcome.matrix.fingerprint(),
        "profile_fingerprint": outcome.profile.fingerprint(),
        "warnings": outcome.warnings,
        "reliability": outcome.profile,
        "diagnostics": outcome.diagnostics,
    });
    let mut out = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut out, &report)?;
    out.write_all(b"\n")?;
    out.flush()
}

fn run(args: &Args) -> Result<(), CliError> {
    let (config, base_dir) = match &args.config {
        Some(path) => (
            EngineConfig::load(path).map_err(LabelError::from)?,
            path.parent().map(Path::to_path_buf).unwrap_or_default(),
        ),
        None => (EngineConfig::default(), PathBuf::from(".")),
    };
    let engine = LabelingEngine::from_config(&config, &base_dir).map_err(LabelError::from)?;

    let items = read_items(&args.input)?;
    info!(path = %args.input.display(), items = items.len(), "items loaded");

    let outcome = engine.run(items)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| CliError::io(path, e))?;
            write_records(&outcome, file).map_err(|e| CliError::io(path, e))?;
        }
        None => write_records(&outcome, io::stdout().lock())
            .map_err(|e| CliError::io(Path::new("<stdout>"), e))?,
    }

    if let Some(path) = &args.diagnostics {
        let file = File::create(path).map_err(|e| CliError::io(path, e))?;
        write_report(&outcome, file).map_err(|e| CliError::io(path, e))?;
    } else {
        eprintln!("{}", outcome.diagnostics);
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_format);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "labelfuse failed");
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelfuse::{Polarity, Rule, RuleSet};

    struct FailingFlush(Vec<u8>);

    impl Write for FailingFlush {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::other("disk full"))
        }
    }

    fn outcome() -> BatchOutcome {
        let rules = RuleSet::new()
            .with(Rule::pattern("closing_up", Polarity::Positive, "fech.*alta").unwrap())
            .unwrap();
        LabelingEngine::new(rules)
            .unwrap()
            .run(vec![RawItem::new("1", "Ibovespa fecha em alta")])
            .unwrap()
    }

    #[test]
    fn report_is_complete_json() {
        let mut buf = Vec::new();
        write_report(&outcome(), &mut buf).unwrap();
        let report: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(report["diagnostics"]["items"], 1);
        assert!(report["profile_fingerprint"].is_string());
    }

    #[test]
    fn report_flush_failure_is_an_error() {
        let err = write_report(&outcome(), FailingFlush(Vec::new())).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn records_carry_export_label() {
        let mut buf = Vec::new();
        write_records(&outcome(), &mut buf).unwrap();
        let line: serde_json::Value =
            serde_json::from_str(String::from_utf8(buf).unwrap().trim()).unwrap();
        assert_eq!(line["label_class"], "POSITIVE");
        assert_eq!(line["item_id"], "1");
    }
}
