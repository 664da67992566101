//! Conformance test suite for `InvocationStore` implementations.
//!
//! A backend-agnostic suite that any `InvocationStore` can run to verify
//! the log contract:
//!
//! - **Append**: appended records are listed last, unchanged
//! - **Order**: insertion order is preserved, oldest first
//! - **Filter**: ARN filtering is exact and order-preserving
//! - **Isolation**: listed records are copies
//! - **Concurrency**: appends from many threads are serialized
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory that creates a
//! fresh, empty store for each test:
//!
//! ```ignore
//! use lambda_inspector_storage::conformance::run_conformance_suite;
//!
//! #[test]
//! fn memory_conformance() {
//!     let report = run_conformance_suite(InMemoryInvocationLog::new);
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod append;
mod concurrent;
mod filter;

use std::fmt;

use time::OffsetDateTime;

use crate::record::{InvocationRecord, InvocationResult};
use crate::InvocationStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "append", "filter", "concurrent").
    pub category: String,
    /// Test name (e.g. "append_then_list_returns_record_last").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store, ensuring test isolation.
pub fn run_conformance_suite<S, F>(factory: F) -> ConformanceReport
where
    S: InvocationStore,
    F: Fn() -> S,
{
    let mut results = Vec::new();

    results.extend(append::run_append_tests(&factory));
    results.extend(filter::run_filter_tests(&factory));
    results.extend(concurrent::run_concurrent_tests(&factory));

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_record(request_id: &str, function_arn: &str) -> InvocationRecord {
    InvocationRecord {
        timestamp: OffsetDateTime::now_utc(),
        request_id: request_id.to_string(),
        function_arn: function_arn.to_string(),
        payload: format!(r#"{{"request":"{request_id}"}}"#),
        result: InvocationResult {
            payload: r#"{"ok":true}"#.to_string(),
            logs: "START\nEND".to_string(),
            is_error: false,
        },
    }
}

fn request_ids(records: &[InvocationRecord]) -> Vec<String> {
    records.iter().map(|r| r.request_id.clone()).collect()
}
