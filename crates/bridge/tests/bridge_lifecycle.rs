//! End-to-end bridge lifecycles on both executors.
//!
//! None of these tests sleep after closing: every read of the destination
//! happens immediately after `close`/`finish` returns.

use std::io::Write;
use std::num::NonZeroUsize;
use std::process::Command;

use bridge::{
    BridgeConfig, BridgeState, ExecutorKind, OutputBridge, PumpError, PumpStrategy, run_bridged,
};
use test_support::{ScratchDestination, pattern};

const EXECUTORS: [ExecutorKind; 2] = [ExecutorKind::Thread, ExecutorKind::Process];

const STRATEGIES: [PumpStrategy; 4] = [
    PumpStrategy::BinaryStreaming,
    PumpStrategy::BinaryBuffered,
    PumpStrategy::TextStreaming,
    PumpStrategy::TextBuffered,
];

fn config_for(
    scratch: &ScratchDestination,
    strategy: PumpStrategy,
    executor: ExecutorKind,
) -> BridgeConfig {
    BridgeConfig::new(scratch.path())
        .binary(strategy.is_binary())
        .single_write(strategy.is_buffered())
        .executor(executor)
}

/// Platform-native 64-byte encoding of `value`.
fn encode_64(value: u64) -> [u8; 64] {
    let mut out = [0u8; 64];
    if cfg!(target_endian = "little") {
        out[..8].copy_from_slice(&value.to_le_bytes());
    } else {
        out[56..].copy_from_slice(&value.to_be_bytes());
    }
    out
}

// ============================================================================
// Reference Scenarios
// ============================================================================

#[test]
fn text_streaming_round_trip() {
    const TEXT: &str = "April is the cruellest month";
    for executor in EXECUTORS {
        let scratch = ScratchDestination::new("gfile.txt").unwrap();
        let config = BridgeConfig::new(scratch.path()).executor(executor);

        let mut bridge = OutputBridge::open(&config).unwrap();
        bridge.intake().unwrap().write_all(TEXT.as_bytes()).unwrap();
        let report = bridge.finish().unwrap();

        assert_eq!(scratch.read_to_string().unwrap(), TEXT, "{executor}");
        assert_eq!(report.bytes, TEXT.len() as u64);
        assert_eq!(report.lines, 1);
    }
}

#[test]
fn binary_streaming_round_trip() {
    let data = encode_64(25_559_837);
    for executor in EXECUTORS {
        let scratch = ScratchDestination::new("gfile.dat").unwrap();
        let config = BridgeConfig::new(scratch.path()).binary(true).executor(executor);

        let mut bridge = OutputBridge::open(&config).unwrap();
        bridge.write_all(&data).unwrap();
        bridge.finish().unwrap();

        assert_eq!(scratch.read().unwrap(), data, "{executor}");
    }
}

#[test]
fn binary_buffered_ignores_chunk_boundaries() {
    let data = pattern(10_007);
    for executor in EXECUTORS {
        for (a, b) in [(0, 0), (1, 2), (4096, 4097), (10_000, 10_007)] {
            let scratch = ScratchDestination::new("chunks.dat").unwrap();
            let config = BridgeConfig::new(scratch.path())
                .binary(true)
                .single_write(true)
                .executor(executor);

            let mut bridge = OutputBridge::open(&config).unwrap();
            bridge.write_all(&data[..a]).unwrap();
            bridge.write_all(&data[a..b]).unwrap();
            bridge.write_all(&data[b..]).unwrap();
            let report = bridge.finish().unwrap();

            assert_eq!(scratch.read().unwrap(), data, "{executor} split at {a}/{b}");
            assert_eq!(report.writes, 1);
        }
    }
}

#[test]
fn sequential_bridges_append_in_order() {
    for executor in EXECUTORS {
        let scratch = ScratchDestination::new("appended.txt").unwrap();
        let config = BridgeConfig::new(scratch.path()).executor(executor);

        let mut first = OutputBridge::open(&config).unwrap();
        first.write_all(b"first run\n").unwrap();
        first.finish().unwrap();

        let mut second = OutputBridge::open(&config).unwrap();
        second.write_all(b"second run\n").unwrap();
        second.finish().unwrap();

        assert_eq!(
            scratch.read_to_string().unwrap(),
            "first run\nsecond run\n",
            "{executor}"
        );
    }
}

// ============================================================================
// Strategy x Executor Matrix
// ============================================================================

#[test]
fn every_mode_persists_more_than_a_pipe_buffer() {
    // Larger than the default 64 KiB pipe capacity, so the producer blocks
    // until the consumer drains.
    let mut data = Vec::new();
    for i in 0..40_000 {
        writeln!(data, "line {i:05} of the backpressure test").unwrap();
    }
    for executor in EXECUTORS {
        for strategy in STRATEGIES {
            let scratch = ScratchDestination::new("large.log").unwrap();
            let config = config_for(&scratch, strategy, executor);

            let mut bridge = OutputBridge::open(&config).unwrap();
            for chunk in data.chunks(1000) {
                bridge.write_all(chunk).unwrap();
            }
            let report = bridge.finish().unwrap();

            assert_eq!(report.bytes, data.len() as u64, "{strategy} on {executor}");
            assert!(scratch.read().unwrap() == data, "{strategy} on {executor}");
        }
    }
}

#[test]
fn one_byte_buffer_still_round_trips() {
    let data = pattern(3000);
    for executor in EXECUTORS {
        let scratch = ScratchDestination::new("tiny.dat").unwrap();
        let config = BridgeConfig::new(scratch.path())
            .binary(true)
            .buffer_size(NonZeroUsize::new(1))
            .executor(executor);

        let mut bridge = OutputBridge::open(&config).unwrap();
        bridge.write_all(&data).unwrap();
        bridge.finish().unwrap();

        assert_eq!(scratch.read().unwrap(), data);
    }
}

#[test]
fn empty_stream_creates_empty_destination() {
    for executor in EXECUTORS {
        let scratch = ScratchDestination::new("empty.txt").unwrap();
        let config = BridgeConfig::new(scratch.path()).executor(executor);

        let report = OutputBridge::open(&config).unwrap().finish().unwrap();

        assert_eq!(report.bytes, 0);
        assert!(scratch.read().unwrap().is_empty());
    }
}

// ============================================================================
// Spawned Producers
// ============================================================================

#[test]
fn spawned_command_writes_through_the_intake() {
    for executor in EXECUTORS {
        let scratch = ScratchDestination::new("command.txt").unwrap();
        let config = BridgeConfig::new(scratch.path()).executor(executor);
        let mut bridge = OutputBridge::open(&config).unwrap();

        let stdout = bridge.intake().unwrap().try_clone_stdio().unwrap();
        let mut command = Command::new("sh");
        command.args(["-c", "printf 'one\\ntwo\\n'; printf 'three\\n'"]).stdout(stdout);
        let status = command.status().unwrap();
        drop(command);

        assert!(status.success());
        let report = bridge.finish().unwrap();
        assert_eq!(report.lines, 3);
        assert_eq!(scratch.read_to_string().unwrap(), "one\ntwo\nthree\n", "{executor}");
    }
}

#[test]
fn caller_and_command_writes_interleave_in_order() {
    let scratch = ScratchDestination::new("mixed.txt").unwrap();
    let mut bridge = OutputBridge::open(&BridgeConfig::new(scratch.path())).unwrap();

    bridge.write_all(b"header\n").unwrap();
    let stdout = bridge.intake().unwrap().try_clone_stdio().unwrap();
    let status = Command::new("echo").arg("body").stdout(stdout).status().unwrap();
    assert!(status.success());
    bridge.write_all(b"footer\n").unwrap();
    bridge.finish().unwrap();

    assert_eq!(scratch.read_to_string().unwrap(), "header\nbody\nfooter\n");
}

// ============================================================================
// Concurrency and Scoping
// ============================================================================

#[test]
fn overlapping_process_bridges_close_in_any_order() {
    let first = ScratchDestination::new("first.txt").unwrap();
    let second = ScratchDestination::new("second.txt").unwrap();
    let config = |scratch: &ScratchDestination| {
        BridgeConfig::new(scratch.path()).executor(ExecutorKind::Process)
    };

    let mut a = OutputBridge::open(&config(&first)).unwrap();
    let mut b = OutputBridge::open(&config(&second)).unwrap();
    a.write_all(b"from a\n").unwrap();
    b.write_all(b"from b\n").unwrap();

    // The second consumer was forked while `a` was open; it must not keep
    // `a`'s intake alive.
    a.close();
    assert_eq!(first.read_to_string().unwrap(), "from a\n");

    b.close();
    assert_eq!(second.read_to_string().unwrap(), "from b\n");
}

#[test]
fn bridges_on_separate_threads() {
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            std::thread::spawn(move || {
                let scratch = ScratchDestination::new("worker.txt").unwrap();
                let mut bridge = OutputBridge::open(&BridgeConfig::new(scratch.path())).unwrap();
                for line in 0..500 {
                    writeln!(bridge, "worker {worker} line {line}").unwrap();
                }
                let report = bridge.finish().unwrap();
                assert_eq!(report.lines, 500);
                scratch.read_to_string().unwrap().lines().count()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 500);
    }
}

#[test]
fn panic_in_caller_still_closes_the_bridge() {
    for executor in EXECUTORS {
        let scratch = ScratchDestination::new("panic.txt").unwrap();
        let config = BridgeConfig::new(scratch.path()).executor(executor);

        let result = std::panic::catch_unwind(|| {
            let mut bridge = OutputBridge::open(&config).unwrap();
            bridge.write_all(b"written before the panic\n").unwrap();
            panic!("caller failed mid-stream");
        });

        assert!(result.is_err());
        assert_eq!(
            scratch.read_to_string().unwrap(),
            "written before the panic\n",
            "{executor}"
        );
    }
}

#[test]
fn run_bridged_returns_body_value_and_outcome() {
    let scratch = ScratchDestination::new("scoped.txt").unwrap();
    let config = BridgeConfig::new(scratch.path());

    let (value, outcome) = run_bridged(&config, |bridge| {
        assert_eq!(bridge.state(), BridgeState::Open);
        bridge.write_all(b"scoped\n").map(|()| 7)
    })
    .unwrap();

    assert_eq!(value.unwrap(), 7);
    assert_eq!(outcome.unwrap().bytes, 7);
    assert_eq!(scratch.read_to_string().unwrap(), "scoped\n");
}

// ============================================================================
// Out-of-band Pump Failures
// ============================================================================

#[cfg(target_os = "linux")]
#[test]
fn write_failures_are_reported_after_close() {
    for executor in EXECUTORS {
        let config = BridgeConfig::new("/dev/full").executor(executor);
        let mut bridge = OutputBridge::open(&config).unwrap();
        bridge.write_all(b"nowhere to go\n").unwrap();

        bridge.close();
        assert_eq!(bridge.state(), BridgeState::Closed);

        match bridge.outcome() {
            Some(Err(PumpError::Write { bytes, source })) => {
                assert_eq!(*bytes, 0, "{executor}");
                assert_eq!(source.raw_os_error(), Some(libc::ENOSPC), "{executor}");
            }
            other => panic!("{executor}: unexpected outcome {other:?}"),
        }
    }
}

#[cfg(target_os = "linux")]
#[test]
fn finish_surfaces_write_failures() {
    let config = BridgeConfig::new("/dev/full").binary(true).single_write(true);
    let mut bridge = OutputBridge::open(&config).unwrap();
    bridge.write_all(&pattern(100)).unwrap();

    let err = bridge.finish().unwrap_err();
    assert!(err.is_io());
    assert_eq!(err.bytes_persisted(), Some(0));
}
