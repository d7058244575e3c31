//! Tests for `cli::run` driving real commands through a bridge.

use std::ffi::OsString;

use test_support::ScratchDestination;

fn run_with_args<I, S>(args: I) -> (i32, Vec<u8>, Vec<u8>)
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = cli::run(args, &mut stdout, &mut stderr);
    (code, stdout, stderr)
}

fn sink_args(scratch: &ScratchDestination, extra: &[&str]) -> Vec<OsString> {
    let mut args = vec![
        OsString::from("sink"),
        OsString::from("-o"),
        scratch.path().as_os_str().to_owned(),
    ];
    args.extend(extra.iter().map(OsString::from));
    args
}

// ============================================================================
// Successful Runs
// ============================================================================

#[test]
fn command_output_lands_in_destination() {
    let scratch = ScratchDestination::new("out.log").unwrap();
    let (code, stdout, stderr) =
        run_with_args(sink_args(&scratch, &["sh", "-c", "echo first; echo second"]));

    assert_eq!(code, 0, "stderr: {}", String::from_utf8_lossy(&stderr));
    assert!(stdout.is_empty());
    assert!(stderr.is_empty());
    assert_eq!(scratch.read_to_string().unwrap(), "first\nsecond\n");
}

#[test]
fn every_mode_and_executor_is_accepted() {
    let modes: [&[&str]; 4] = [&[], &["-b"], &["--single-write"], &["-b", "--single-write"]];
    for executor in ["thread", "process"] {
        for mode in modes {
            let scratch = ScratchDestination::new("out.log").unwrap();
            let mut extra = vec!["--executor", executor];
            extra.extend_from_slice(mode);
            extra.extend_from_slice(&["printf", "a\\nb\\nc"]);

            let (code, _, stderr) = run_with_args(sink_args(&scratch, &extra));

            assert_eq!(code, 0, "{executor} {mode:?}: {}", String::from_utf8_lossy(&stderr));
            assert_eq!(scratch.read_to_string().unwrap(), "a\nb\nc", "{executor} {mode:?}");
        }
    }
}

#[test]
fn repeated_runs_append() {
    let scratch = ScratchDestination::new("out.log").unwrap();
    for word in ["one", "two", "three"] {
        let (code, _, _) = run_with_args(sink_args(&scratch, &["echo", word]));
        assert_eq!(code, 0);
    }
    assert_eq!(scratch.read_to_string().unwrap(), "one\ntwo\nthree\n");
}

#[test]
fn explicit_buffer_size_is_honoured() {
    let scratch = ScratchDestination::new("out.log").unwrap();
    let (code, _, _) = run_with_args(sink_args(
        &scratch,
        &["-b", "--buffer-size", "3", "printf", "0123456789"],
    ));
    assert_eq!(code, 0);
    assert_eq!(scratch.read_to_string().unwrap(), "0123456789");
}

// ============================================================================
// Exit Status Propagation
// ============================================================================

#[test]
fn command_exit_status_is_forwarded() {
    let scratch = ScratchDestination::new("out.log").unwrap();
    let (code, _, stderr) = run_with_args(sink_args(&scratch, &["sh", "-c", "echo partial; exit 3"]));

    assert_eq!(code, 3);
    assert!(stderr.is_empty());
    assert_eq!(scratch.read_to_string().unwrap(), "partial\n");
}

#[test]
fn killed_command_reports_signal() {
    let scratch = ScratchDestination::new("out.log").unwrap();
    let (code, _, _) = run_with_args(sink_args(&scratch, &["sh", "-c", "kill -9 $$"]));
    assert_eq!(code, 128 + 9);
}

// ============================================================================
// Failures of sink Itself
// ============================================================================

#[test]
fn missing_command_exits_127() {
    let scratch = ScratchDestination::new("out.log").unwrap();
    let (code, _, stderr) = run_with_args(sink_args(&scratch, &["definitely-not-a-command-4f2a"]));

    assert_eq!(code, 127);
    let stderr = String::from_utf8(stderr).unwrap();
    assert!(stderr.starts_with("sink: failed to run definitely-not-a-command-4f2a"), "{stderr}");
}

#[test]
fn unreachable_destination_exits_73() {
    let scratch = ScratchDestination::new("out.log").unwrap();
    let destination = scratch.unreachable();
    let args = [
        OsString::from("sink"),
        OsString::from("-o"),
        destination.as_os_str().to_owned(),
        OsString::from("echo"),
        OsString::from("lost"),
    ];

    let (code, _, stderr) = run_with_args(args);

    assert_eq!(code, 73);
    let stderr = String::from_utf8(stderr).unwrap();
    assert!(stderr.starts_with("sink: cannot open"), "{stderr}");
    assert!(!destination.exists());
}

#[cfg(target_os = "linux")]
#[test]
fn unpersisted_output_exits_74() {
    let (code, _, stderr) = run_with_args(["sink", "-o", "/dev/full", "echo", "overflow"]);

    assert_eq!(code, 74);
    let stderr = String::from_utf8(stderr).unwrap();
    assert!(stderr.contains("output to /dev/full is incomplete"), "{stderr}");
}

#[cfg(target_os = "linux")]
#[test]
fn failing_command_status_wins_over_pump_failure() {
    let (code, _, _) = run_with_args(["sink", "-o", "/dev/full", "sh", "-c", "echo x; exit 5"]);
    assert_eq!(code, 5);
}

#[test]
fn diagnostics_use_program_name_from_arg0() {
    let scratch = ScratchDestination::new("out.log").unwrap();
    let mut args = sink_args(&scratch, &["definitely-not-a-command-4f2a"]);
    args[0] = OsString::from("/opt/tools/bin/tee-sink");

    let (_, _, stderr) = run_with_args(args);

    assert!(String::from_utf8(stderr).unwrap().starts_with("tee-sink: "));
}

// ============================================================================
// Usage
// ============================================================================

#[test]
fn help_goes_to_stdout() {
    let (code, stdout, stderr) = run_with_args(["sink", "--help"]);

    assert_eq!(code, 0);
    assert!(stderr.is_empty());
    let stdout = String::from_utf8(stdout).unwrap();
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--executor"));
}

#[test]
fn version_goes_to_stdout() {
    let (code, stdout, _) = run_with_args(["sink", "--version"]);
    assert_eq!(code, 0);
    assert!(String::from_utf8(stdout).unwrap().contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn usage_errors_exit_2() {
    for args in [
        vec!["sink"],
        vec!["sink", "echo", "no output flag"],
        vec!["sink", "-o", "f"],
        vec!["sink", "-o", "f", "--buffer-size", "-7", "true"],
        vec!["sink", "-o", "f", "--executor", "fiber", "true"],
    ] {
        let (code, stdout, stderr) = run_with_args(args.clone());
        assert_eq!(code, 2, "{args:?}");
        assert!(stdout.is_empty(), "{args:?}");
        assert!(!stderr.is_empty(), "{args:?}");
    }
}
