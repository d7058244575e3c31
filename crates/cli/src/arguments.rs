//! crates/cli/src/arguments.rs
//! Command definition and argument parsing.

use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

use bridge::{BridgeConfig, ExecutorKind, buffer_size_from_signed};
use clap::builder::{OsStringValueParser, PathBufValueParser, PossibleValuesParser};
use clap::{Arg, ArgAction, Command};

/// Program name used when `argv[0]` is missing.
pub const PROGRAM_NAME: &str = "sink";

/// Parsed command line.
#[derive(Clone, Debug)]
pub struct ParsedArgs {
    /// File name taken from `argv[0]`.
    pub program_name: OsString,
    /// Number of `-v` flags.
    pub verbosity: u8,
    /// Bridge settings derived from the options.
    pub config: BridgeConfig,
    /// Command to run, followed by its arguments.
    pub command: Vec<OsString>,
}

impl ParsedArgs {
    /// Program to spawn.
    pub fn program(&self) -> &OsString {
        &self.command[0]
    }

    /// Arguments passed to the program.
    pub fn command_args(&self) -> &[OsString] {
        &self.command[1..]
    }
}

/// Builds the `clap` command used for parsing.
pub(crate) fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run COMMAND with its standard output appended to FILE through a pipe.")
        .override_usage("sink -o FILE [OPTIONS] COMMAND [ARGS]...")
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("FILE")
                .help("Append the command's output to FILE, creating it if needed.")
                .required(true)
                .value_parser(PathBufValueParser::new()),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase diagnostic verbosity (repeatable).")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("binary")
                .long("binary")
                .short('b')
                .help("Copy raw chunks instead of lines.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("buffer-size")
                .long("buffer-size")
                .value_name("N")
                .help("Read size in bytes; -1 uses the destination's block size.")
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("single-write")
                .long("single-write")
                .help("Collect all output and write it once at end of stream.")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("executor")
                .long("executor")
                .value_name("KIND")
                .help("Where the consumer runs.")
                .default_value(ExecutorKind::default().as_str())
                .value_parser(PossibleValuesParser::new([
                    ExecutorKind::Thread.as_str(),
                    ExecutorKind::Process.as_str(),
                ])),
        )
        .arg(
            Arg::new("command")
                .value_name("COMMAND")
                .help("Command to run, followed by its arguments.")
                .required(true)
                .num_args(1..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .value_parser(OsStringValueParser::new()),
        )
}

/// Parses `arguments` into a [`ParsedArgs`].
///
/// `--help` and `--version` surface as errors of the matching
/// [`clap::error::ErrorKind`], as `clap` reports them.
pub fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }
    let program_name = args[0].clone();

    let mut command = clap_command();
    let mut matches = command.try_get_matches_from_mut(args)?;

    let output = matches.remove_one::<PathBuf>("output").unwrap_or_default();
    let verbosity = matches.get_count("verbose");
    let binary = matches.get_flag("binary");
    let single_write = matches.get_flag("single-write");

    let buffer_size = match matches.remove_one::<i64>("buffer-size") {
        Some(value) => buffer_size_from_signed(value).map_err(|error| {
            command.error(clap::error::ErrorKind::ValueValidation, error)
        })?,
        None => None,
    };

    let executor = matches
        .remove_one::<String>("executor")
        .map(|kind| ExecutorKind::from_str(&kind))
        .transpose()
        .map_err(|error| command.error(clap::error::ErrorKind::InvalidValue, error))?
        .unwrap_or_default();

    let command_line: Vec<OsString> = matches
        .remove_many::<OsString>("command")
        .map(|values| values.collect())
        .unwrap_or_default();
    if command_line.is_empty() {
        return Err(command.error(
            clap::error::ErrorKind::MissingRequiredArgument,
            "a COMMAND to run is required",
        ));
    }

    let config = BridgeConfig::new(output)
        .binary(binary)
        .buffer_size(buffer_size)
        .single_write(single_write)
        .executor(executor);

    Ok(ParsedArgs {
        program_name,
        verbosity,
        config,
        command: command_line,
    })
}
