//! CLI module for arczone
//!
//! - init: create the data directory and an empty journal
//! - apply: apply mutation events from stdin, one JSON object per line
//! - buckets: list bucket records
//! - versions: list the versions of one key

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{apply, apply_stream, buckets, init, run, run_command, versions, INVALID_EVENT_CODE};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_lines, write_error_to, write_response, write_response_to};
