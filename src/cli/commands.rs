//! CLI command implementations
//!
//! Every command loads and validates the configuration first. Commands
//! that read archive state open the engine, which replays the journal.

use std::io::{self, BufRead, Write};
use std::path::Path;

use serde_json::{json, Value};

use crate::applier::MutationEvent;
use crate::config::ArchiveConfig;
use crate::engine::ArchiveEngine;
use crate::errors::ArchiveError;
use crate::ledger::VersionLedgerEntry;
use crate::observability::{log_event_with_fields, Event, Logger};
use crate::wal::{journal_path, JournalWriter};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_lines, write_error_to, write_response, write_response_to};

/// Event lines that are not valid `MutationEvent` JSON
pub const INVALID_EVENT_CODE: &str = "ARC_CLI_INVALID_EVENT";

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config),
        Command::Apply { config } => apply(&config),
        Command::Buckets { config } => buckets(&config),
        Command::Versions {
            config,
            bucket,
            key,
        } => versions(&config, &bucket, &key),
    }
}

fn load_config(config_path: &Path) -> CliResult<ArchiveConfig> {
    let config = ArchiveConfig::load(config_path)?;
    Logger::set_min_severity(config.log_severity()?);
    let path = config_path.display().to_string();
    log_event_with_fields(Event::ConfigLoaded, &[("path", &path)]);
    Ok(config)
}

fn is_initialized(data_dir: &Path) -> bool {
    journal_path(data_dir).exists()
}

fn open_engine(config_path: &Path) -> CliResult<ArchiveEngine> {
    let config = load_config(config_path)?;
    if !is_initialized(config.data_path()) {
        return Err(CliError::not_initialized());
    }
    ArchiveEngine::open(config).map_err(|e| CliError::boot_failed(&e))
}

/// Initialize a new archive data directory
///
/// Creates the journal directory and an empty journal. Writes no records.
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let data_dir = config.data_path();

    if is_initialized(data_dir) {
        return Err(CliError::already_initialized());
    }

    let journal = JournalWriter::open(data_dir)
        .map_err(|e| CliError::config_error(format!("Failed to create journal: {}", e)))?;

    write_response(json!({
        "initialized": true,
        "journal": journal.path().display().to_string(),
    }))
}

/// Apply events from stdin until EOF
pub fn apply(config_path: &Path) -> CliResult<()> {
    let engine = open_engine(config_path)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    apply_stream(&engine, stdin.lock(), &mut stdout.lock())
}

/// Applies one `MutationEvent` per input line, writing one response line
/// per event.
///
/// Malformed lines and rejected events get an error line and processing
/// continues. A FATAL engine error writes its error line and stops.
pub fn apply_stream<R: BufRead, W: Write>(
    engine: &ArchiveEngine,
    input: R,
    output: &mut W,
) -> CliResult<()> {
    for line in read_lines(input) {
        let line = line?;

        let event: MutationEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                write_error_to(output, INVALID_EVENT_CODE, &e.to_string())?;
                continue;
            }
        };

        match engine.apply(&event) {
            Ok(outcome) => write_response_to(output, serde_json::to_value(outcome)?)?,
            Err(e) => {
                write_error_to(output, e.code(), &e.to_string())?;
                if e.is_fatal() {
                    return Err(CliError::engine_halted(&e));
                }
            }
        }
    }
    Ok(())
}

/// List every bucket record
pub fn buckets(config_path: &Path) -> CliResult<()> {
    let engine = open_engine(config_path)?;
    write_response(buckets_json(&engine)?)
}

fn buckets_json(engine: &ArchiveEngine) -> CliResult<Value> {
    let records = engine.list_buckets()?;
    let mut out = Vec::with_capacity(records.len());
    for record in &records {
        let mut value = serde_json::to_value(record)?;
        value["versioning_status"] = json!(record.versioning().status_label());
        value["keys"] = json!(engine.list_keys(record.archive_bucket_id())?);
        out.push(value);
    }
    Ok(Value::Array(out))
}

/// List the versions of one key
pub fn versions(config_path: &Path, bucket: &str, key: &str) -> CliResult<()> {
    let engine = open_engine(config_path)?;
    let ledger = lookup_ledger(&engine, bucket, key)?;
    write_response(serde_json::to_value(&ledger)?)
}

/// Resolves `bucket` as an archive id first, then as an ACTIVE logical name.
fn lookup_ledger(engine: &ArchiveEngine, bucket: &str, key: &str) -> CliResult<VersionLedgerEntry> {
    match engine.get_ledger(bucket, key) {
        Err(ArchiveError::NoSuchBucket(_)) => {
            let archive_bucket_id = engine.resolve_active(bucket)?;
            Ok(engine.get_ledger(&archive_bucket_id, key)?)
        }
        other => Ok(other?),
    }
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_config(temp_dir: &TempDir) -> std::path::PathBuf {
        let config_path = temp_dir.path().join("arczone.json");
        let data_dir = temp_dir.path().join("data");

        let config = json!({
            "data_dir": data_dir.to_string_lossy()
        });

        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    fn run_lines(engine: &ArchiveEngine, input: &str) -> Vec<Value> {
        let mut out = Vec::new();
        let _ = apply_stream(engine, input.as_bytes(), &mut out);
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_init_creates_journal() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        init(&config_path).unwrap();
        assert!(journal_path(&temp_dir.path().join("data")).exists());
    }

    #[test]
    fn test_init_refuses_reinit() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        init(&config_path).unwrap();
        let err = init(&config_path).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::AlreadyInitialized);
    }

    #[test]
    fn test_open_requires_init() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_config(&temp_dir);

        let err = open_engine(&config_path).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::NotInitialized);
    }

    #[test]
    fn test_apply_stream_answers_every_line() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ArchiveEngine::open(ArchiveConfig::new(temp_dir.path())).unwrap();

        let input = concat!(
            r#"{"event_kind":"BUCKET_CREATE","logical_bucket":"b"}"#,
            "\n",
            r#"{"event_kind":"CREATE","logical_bucket":"b","key":"foo","size":3,"etag":"e1"}"#,
            "\n",
            "not json\n",
            r#"{"event_kind":"DELETE","logical_bucket":"b","key":"missing"}"#,
            "\n",
            r#"{"event_kind":"BUCKET_DELETE","logical_bucket":"b"}"#,
            "\n",
        );
        let lines = run_lines(&engine, input);

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0]["data"]["outcome"], "bucket_created");
        assert_eq!(lines[1]["data"]["outcome"], "version_appended");
        assert_eq!(lines[1]["data"]["activated_versioning"], true);
        assert_eq!(lines[2]["code"], INVALID_EVENT_CODE);
        assert_eq!(lines[3]["code"], "ARC_NO_SUCH_KEY");
        assert_eq!(lines[4]["data"]["outcome"], "bucket_retired");
    }

    #[test]
    fn test_lookup_ledger_by_logical_name() {
        let temp_dir = TempDir::new().unwrap();
        let engine = ArchiveEngine::open(ArchiveConfig::new(temp_dir.path())).unwrap();
        run_lines(
            &engine,
            concat!(
                r#"{"event_kind":"BUCKET_CREATE","logical_bucket":"b"}"#,
                "\n",
                r#"{"event_kind":"CREATE","logical_bucket":"b","key":"foo","size":3,"etag":"e1"}"#,
                "\n",
            ),
        );

        let by_name = lookup_ledger(&engine, "b", "foo").unwrap();
        let id = engine.resolve_active("b").unwrap();
        let by_id = lookup_ledger(&engine, &id, "foo").unwrap();
        assert_eq!(by_name, by_id);

        let listing = buckets_json(&engine).unwrap();
        assert_eq!(listing[0]["versioning_status"], "Enabled");
        assert_eq!(listing[0]["keys"], json!(["foo"]));
    }
}
