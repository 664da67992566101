use std::collections::HashMap;
use std::thread;

use super::{make_record, TestResult};
use crate::InvocationStore;

/// Number of writer threads in each test.
const WRITERS: usize = 8;
/// Appends per writer.
const PER_WRITER: usize = 100;

pub(super) fn run_concurrent_tests<S, F>(factory: &F) -> Vec<TestResult>
where
    S: InvocationStore,
    F: Fn() -> S,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_appends_are_all_kept",
            concurrent_appends_are_all_kept(factory),
        ),
        TestResult::from_result(
            "concurrent",
            "reads_during_appends_see_whole_prefixes",
            reads_during_appends_see_whole_prefixes(factory),
        ),
    ]
}

// ── Concurrent appends: nothing lost, per-writer order kept ─────────────────

/// WRITERS threads each append PER_WRITER records. Every record must be
/// present exactly once, and each writer's records must appear in the order
/// that writer appended them.
fn concurrent_appends_are_all_kept<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();

    thread::scope(|scope| {
        for w in 0..WRITERS {
            let store = &store;
            scope.spawn(move || {
                for i in 0..PER_WRITER {
                    store.append(make_record(&format!("{w}:{i}"), &format!("arn:writer:{w}")));
                }
            });
        }
    });

    let listed = store.list(None);
    if listed.len() != WRITERS * PER_WRITER {
        return Err(format!(
            "expected {} records, found {}",
            WRITERS * PER_WRITER,
            listed.len()
        ));
    }

    let mut next_expected: HashMap<&str, usize> = HashMap::new();
    for record in &listed {
        let (writer, seq) = record
            .request_id
            .split_once(':')
            .ok_or_else(|| format!("malformed request id {}", record.request_id))?;
        let seq: usize = seq
            .parse()
            .map_err(|e| format!("malformed sequence in {}: {e}", record.request_id))?;
        let expected = next_expected.entry(writer).or_insert(0);
        if seq != *expected {
            return Err(format!(
                "writer {writer}: saw sequence {seq}, expected {}",
                *expected
            ));
        }
        *expected += 1;
    }
    Ok(())
}

// ── Reads racing appends ────────────────────────────────────────────────────

/// A reader lists the store while a writer appends. Each snapshot must be a
/// prefix of the final log and grow monotonically.
fn reads_during_appends_see_whole_prefixes<S: InvocationStore, F: Fn() -> S>(
    factory: &F,
) -> Result<(), String> {
    let store = factory();
    let total = WRITERS * PER_WRITER;

    let snapshots = thread::scope(|scope| {
        let writer_store = &store;
        scope.spawn(move || {
            for i in 0..total {
                writer_store.append(make_record(&i.to_string(), "arn:single"));
            }
        });

        let reader_store = &store;
        let reader = scope.spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..50 {
                seen.push(reader_store.list(None));
                thread::yield_now();
            }
            seen
        });
        reader.join().unwrap_or_default()
    });

    let mut last_len = 0;
    for snapshot in snapshots {
        if snapshot.len() < last_len {
            return Err(format!(
                "snapshot shrank from {last_len} to {} records",
                snapshot.len()
            ));
        }
        for (i, record) in snapshot.iter().enumerate() {
            if record.request_id != i.to_string() {
                return Err(format!(
                    "snapshot position {i} held request {}",
                    record.request_id
                ));
            }
        }
        last_len = snapshot.len();
    }
    Ok(())
}
