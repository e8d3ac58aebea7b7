//! Integration tests for tally-metrics
//!
//! Tests cover:
//! - Read-and-reset accounting across concurrent writers
//! - Snapshot line layout and registration order
//! - Growth-only field counts
//! - Silent skip on unwritable sinks
//! - Registration racing with drains

use tally_metrics::{
    timed, DrainOutcome, FileSink, MetricKind, MetricRegistry, Sink, StreamSink,
};
use std::io;
use std::sync::{Arc, Barrier};
use std::thread;

fn drain_line(registry: &MetricRegistry) -> String {
    let mut sink = StreamSink::new(Vec::new());
    registry.drain(&mut sink).unwrap();
    String::from_utf8(sink.into_inner().unwrap()).unwrap()
}

/// Split a line into its timestamp and the `"name" value` tokens.
fn split_line(line: &str) -> (String, Vec<String>) {
    let body = line.strip_suffix('\n').expect("line must end with newline");
    let (date, rest) = body.split_at(10);
    let (time, fields) = rest[1..].split_at(12);
    let tokens = fields.split_whitespace().map(str::to_string).collect();
    (format!("{} {}", date, time), tokens)
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn three_threads_five_adds_each() {
    let registry = MetricRegistry::new();
    let requests = registry.create_metric::<i64>("requests");

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for _ in 0..5 {
                    requests.add(1);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert!(drain_line(&registry).ends_with("\"requests\" 15\n"));
    assert!(drain_line(&registry).ends_with("\"requests\" 0\n"));
}

#[test]
fn adds_before_and_after_drain_land_in_separate_periods() {
    const BEFORE: u64 = 4_000;
    const AFTER: u64 = 2_500;
    let registry = Arc::new(MetricRegistry::new());
    let counter = registry.create_metric::<u64>("events");
    let threads = 4;
    let drained = Arc::new(Barrier::new(threads + 1));
    let finished_before = Arc::new(Barrier::new(threads + 1));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let counter = Arc::clone(&counter);
            let drained = Arc::clone(&drained);
            let finished_before = Arc::clone(&finished_before);
            thread::spawn(move || {
                for _ in 0..BEFORE {
                    counter.add(1);
                }
                finished_before.wait();
                drained.wait();
                for _ in 0..AFTER {
                    counter.add(1);
                }
            })
        })
        .collect();

    finished_before.wait();
    let first = drain_line(&registry);
    drained.wait();
    for h in handles {
        h.join().unwrap();
    }
    let second = drain_line(&registry);

    let expected_first = format!("\"events\" {}\n", BEFORE * threads as u64);
    let expected_second = format!("\"events\" {}\n", AFTER * threads as u64);
    assert!(first.ends_with(&expected_first), "{}", first);
    assert!(second.ends_with(&expected_second), "{}", second);
}

#[test]
fn concurrent_drains_never_lose_or_duplicate() {
    let registry = Arc::new(MetricRegistry::new());
    let counter = registry.create_metric::<u64>("total");
    let writers = 4;
    let per_writer = 10_000u64;

    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..per_writer {
                    counter.add(1);
                }
            })
        })
        .collect();

    let mut seen = 0u64;
    while handles.iter().any(|h| !h.is_finished()) {
        let snapshot = registry.snapshot();
        seen += snapshot.get("total").unwrap().parse::<u64>().unwrap();
    }
    for h in handles {
        h.join().unwrap();
    }
    seen += registry.snapshot().get("total").unwrap().parse::<u64>().unwrap();

    assert_eq!(seen, writers * per_writer);
}

// ============================================================================
// Line Format Tests
// ============================================================================

#[test]
fn line_has_timestamp_prefix() {
    let registry = MetricRegistry::new();
    registry.create_metric_with::<u64>("a", 1);
    let line = drain_line(&registry);
    let (timestamp, _) = split_line(&line);

    let bytes = timestamp.as_bytes();
    assert_eq!(timestamp.len(), 23);
    assert_eq!(bytes[4], b'-');
    assert_eq!(bytes[7], b'-');
    assert_eq!(bytes[10], b' ');
    assert_eq!(bytes[13], b':');
    assert_eq!(bytes[16], b':');
    assert_eq!(bytes[19], b'.');
    assert!(timestamp
        .chars()
        .enumerate()
        .all(|(i, c)| [4, 7, 10, 13, 16, 19].contains(&i) || c.is_ascii_digit()));
}

#[test]
fn formatting_exactness() {
    let registry = MetricRegistry::new();
    registry.create_metric_with::<i64>("int", 42);
    registry.create_metric_with::<f64>("pi", 3.14159);
    registry.create_metric_with::<f64>("two", 2.0);

    let line = drain_line(&registry);
    assert!(line.ends_with(" \"int\" 42 \"pi\" 3.142 \"two\" 2.000\n"));
}

#[test]
fn registration_order_preserved() {
    let registry = MetricRegistry::new();
    registry.create_metric::<u64>("a");
    registry.create_metric::<f64>("b");
    registry.create_metric::<i32>("c");

    let (_, tokens) = split_line(&drain_line(&registry));
    assert_eq!(tokens, vec!["\"a\"", "0", "\"b\"", "0.000", "\"c\"", "0"]);
}

#[test]
fn duplicate_names_appear_twice() {
    let registry = MetricRegistry::new();
    let first = registry.create_metric::<u64>("dup");
    let second = registry.create_metric::<u64>("dup");
    first.add(1);
    second.add(2);

    assert!(drain_line(&registry).ends_with(" \"dup\" 1 \"dup\" 2\n"));
}

#[test]
fn empty_registry_writes_timestamp_only() {
    let registry = MetricRegistry::new();
    let mut sink = StreamSink::new(Vec::new());
    assert_eq!(
        registry.drain(&mut sink).unwrap(),
        DrainOutcome::Written { metrics: 0 }
    );
    let line = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    assert_eq!(line.len(), 24);
}

// ============================================================================
// Growth Tests
// ============================================================================

#[test]
fn field_count_tracks_registered_metrics() {
    let registry = MetricRegistry::new();
    for k in 1..=5 {
        registry.create_metric::<u64>(format!("m{}", k));
        for _ in 0..3 {
            let (_, tokens) = split_line(&drain_line(&registry));
            assert_eq!(tokens.len(), 2 * k);
        }
    }
}

#[test]
fn registration_racing_with_drains() {
    let registry = Arc::new(MetricRegistry::new());
    let creators = 4;
    let per_creator = 50;

    let handles: Vec<_> = (0..creators)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..per_creator {
                    let m = registry.create_metric_with::<u64>(format!("t{}_{}", t, i), 1);
                    m.add(1);
                }
            })
        })
        .collect();

    let mut last_count = 0;
    while handles.iter().any(|h| !h.is_finished()) {
        let (_, tokens) = split_line(&drain_line(&registry));
        assert_eq!(tokens.len() % 2, 0);
        assert!(tokens.len() / 2 >= last_count);
        last_count = tokens.len() / 2;
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(registry.len(), creators * per_creator);
    let (_, tokens) = split_line(&drain_line(&registry));
    assert_eq!(tokens.len(), 2 * creators * per_creator);
}

// ============================================================================
// Sink Tests
// ============================================================================

struct FailingSink;

impl Sink for FailingSink {
    fn is_writable(&self) -> bool {
        true
    }

    fn write_line(&mut self, _line: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "disk full"))
    }
}

#[test]
fn closed_sink_is_silent_and_keeps_values() {
    let registry = MetricRegistry::new();
    let requests = registry.create_metric::<u64>("requests");
    requests.add(9);

    let mut sink: StreamSink<Vec<u8>> = StreamSink::closed();
    assert_eq!(registry.drain(&mut sink).unwrap(), DrainOutcome::Skipped);
    assert!(sink.into_inner().is_none());
    assert_eq!(requests.get(), 9);

    assert!(drain_line(&registry).ends_with("\"requests\" 9\n"));
}

#[test]
fn sink_closed_midway_skips_later_drains() {
    let registry = MetricRegistry::new();
    let requests = registry.create_metric::<u64>("requests");
    let mut sink = StreamSink::new(Vec::new());

    requests.add(1);
    registry.drain(&mut sink).unwrap();
    let written = sink.close().unwrap().unwrap();

    requests.add(2);
    assert_eq!(registry.drain(&mut sink).unwrap(), DrainOutcome::Skipped);
    assert_eq!(written.iter().filter(|&&b| b == b'\n').count(), 1);
    assert_eq!(requests.get(), 2);
}

#[test]
fn failing_sink_reports_error() {
    let registry = MetricRegistry::new();
    let requests = registry.create_metric_with::<u64>("requests", 3);

    let err = registry.drain(&mut FailingSink).unwrap_err();
    assert!(err.to_string().contains("disk full"));
    // values were reset before the write was attempted
    assert_eq!(requests.get(), 0);
}

#[test]
fn file_sink_accumulates_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.log");
    let registry = MetricRegistry::new();
    let requests = registry.create_metric::<u64>("requests");

    let mut sink = FileSink::append(&path).unwrap();
    for i in 1..=3 {
        requests.add(i);
        registry.drain(&mut sink).unwrap();
    }
    drop(sink);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<_> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("\"requests\" 1"));
    assert!(lines[1].ends_with("\"requests\" 2"));
    assert!(lines[2].ends_with("\"requests\" 3"));
}

// ============================================================================
// Snapshot / Export Tests
// ============================================================================

#[test]
fn snapshot_matches_drain_layout() {
    let registry = MetricRegistry::new();
    registry.create_metric_with::<u64>("requests", 5);
    registry.create_metric_with::<f32>("ratio", 0.25);

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.fields[0].kind, MetricKind::Integer);
    assert_eq!(snapshot.fields[1].kind, MetricKind::Float);
    assert!(snapshot
        .to_line()
        .ends_with(" \"requests\" 5 \"ratio\" 0.250\n"));

    let json = snapshot.to_json_compact().unwrap();
    assert!(json.contains("\"value\":\"5\""));
    assert!(json.contains("\"value\":\"0.250\""));
}

#[test]
fn timed_macro_adds_elapsed_millis() {
    let registry = MetricRegistry::new();
    let elapsed = registry.create_metric::<f64>("work_ms");

    let value = timed!(elapsed, {
        thread::sleep(std::time::Duration::from_millis(5));
        7
    });

    assert_eq!(value, 7);
    assert!(elapsed.get() >= 5.0);
}
