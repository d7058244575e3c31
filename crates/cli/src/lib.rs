#![cfg(unix)]
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` implements the `sink` command-line front end. `sink` runs a command
//! with its standard output wired into an [`OutputBridge`], so the output is
//! appended to a file by a consumer that runs beside the command rather than
//! by the command itself.
//!
//! # Design
//!
//! [`run`] is the entry point. It accepts an iterator of arguments together
//! with handles for standard output and error, so tests can drive it without
//! spawning the binary. A [`clap`](https://docs.rs/clap/) command definition
//! parses the options; everything from the first positional argument on is
//! the command line to execute.
//!
//! The command inherits stdin and stderr. Its stdout is a clone of the
//! bridge intake. `run` waits for the command, drops every clone of the
//! intake, and only then closes the bridge, so the destination is complete
//! when `run` returns.
//!
//! # Exit codes
//!
//! The command's own status is forwarded, with `128 + N` when it was killed
//! by signal `N`. When `sink` itself fails the codes in [`exit_code`] apply;
//! a consumer failure only overrides a successful command status.
//!
//! # Examples
//!
//! ```no_run
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(
//!     ["sink", "-o", "/tmp/out.log", "echo", "hello"],
//!     &mut stdout,
//!     &mut stderr,
//! );
//! assert_eq!(status, 0);
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt::Display;
use std::io::{self, Write};
use std::process::{Command, ExitStatus};

use bridge::OutputBridge;
use clap::error::ErrorKind;
use logging::{VerbosityConfig, targets};

mod arguments;
mod error;
pub mod exit_code;

pub use arguments::{PROGRAM_NAME, ParsedArgs, parse_args};
pub use error::CliError;
pub use exit_code::exit_code_from;

/// Parsing entry points for integration tests.
#[doc(hidden)]
pub mod test_utils {
    pub use crate::arguments::{ParsedArgs, parse_args};
}

/// Runs the CLI using the provided argument iterator and output handles.
///
/// Returns the process exit code the caller should use.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    match parse_args(arguments) {
        Ok(parsed) => {
            let verbosity = VerbosityConfig::from_verbose_level(parsed.verbosity)
                .with_program_from_arg0(&parsed.program_name);
            logging::init_tracing(&verbosity);
            execute(&parsed, &verbosity.program, stderr)
        }
        Err(error) => render_clap_error(&error, stdout, stderr),
    }
}

fn render_clap_error<Out: Write, Err: Write>(
    error: &clap::Error,
    stdout: &mut Out,
    stderr: &mut Err,
) -> i32 {
    let rendered = error.render().to_string();
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = stdout.write_all(rendered.as_bytes());
            exit_code::OK
        }
        _ => {
            let _ = stderr.write_all(rendered.as_bytes());
            exit_code::USAGE
        }
    }
}

fn execute<Err: Write>(parsed: &ParsedArgs, program: &str, stderr: &mut Err) -> i32 {
    let span = tracing::info_span!(target: targets::CLI, "sink", program = %program);
    let _enter = span.enter();

    let mut bridge = match OutputBridge::open(&parsed.config) {
        Ok(bridge) => bridge,
        Err(error) => return report(stderr, program, &CliError::from(error)),
    };
    tracing::info!(
        target: targets::CLI,
        command = %parsed.program().to_string_lossy(),
        destination = %parsed.config.destination().display(),
        strategy = %bridge.strategy(),
        executor = %bridge.executor(),
        "running command"
    );

    let status = run_command(parsed.program(), parsed.command_args(), &mut bridge);
    let outcome = bridge.finish();

    let code = match status {
        Ok(status) => exit_code::from_status(status),
        Err(source) => {
            return report(
                stderr,
                program,
                &CliError::Launch {
                    program: parsed.program().clone(),
                    source,
                },
            );
        }
    };
    tracing::info!(target: targets::CLI, code, "command finished");

    match outcome {
        Ok(summary) => {
            tracing::info!(
                target: targets::CLI,
                bytes = summary.bytes,
                writes = summary.writes,
                "output persisted"
            );
            code
        }
        Err(source) => {
            let error = CliError::Pump {
                path: parsed.config.destination().to_path_buf(),
                source,
            };
            let failure = report(stderr, program, &error);
            if code == exit_code::OK { failure } else { code }
        }
    }
}

/// Spawns the command with its stdout on the intake and waits for it.
///
/// The command and its copy of the intake are dropped before this returns.
fn run_command(
    program: &OsStr,
    args: &[OsString],
    bridge: &mut OutputBridge,
) -> io::Result<ExitStatus> {
    let stdout = bridge
        .intake()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "bridge is closed"))?
        .try_clone_stdio()?;

    let mut command = Command::new(program);
    command.args(args).stdout(stdout);
    command.status()
}

fn report<Err: Write>(stderr: &mut Err, program: &str, error: &CliError) -> i32 {
    tracing::debug!(target: targets::CLI, error = ?error, "failing");
    write_diagnostic(stderr, program, error);
    error.exit_code()
}

fn write_diagnostic<Err: Write>(stderr: &mut Err, program: &str, message: &dyn Display) {
    let _ = writeln!(stderr, "{program}: {message}");
}
