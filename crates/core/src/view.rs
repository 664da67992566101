//! Serializable views of invocation records for the query endpoint.
//!
//! The raw view keeps every opaque field as text. The formatted view decodes
//! payloads with [`normalize`](crate::normalize()) and splits the log blob
//! into lines.

use lambda_inspector_storage::InvocationRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::normalize::{normalize_text, split_log_lines};

/// Log output, either as the stored blob or split into lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogsView {
    Blob(String),
    Lines(Vec<String>),
}

impl LogsView {
    /// The log output as individual lines, regardless of representation.
    pub fn lines(&self) -> Vec<String> {
        match self {
            LogsView::Blob(blob) => split_log_lines(blob),
            LogsView::Lines(lines) => lines.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultView {
    pub payload: Value,
    pub logs: LogsView,
    pub is_error: bool,
}

/// One invocation as returned by `GET /invocations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationView {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub request_id: String,
    pub function_arn: String,
    pub payload: Value,
    pub result: ResultView,
}

impl InvocationView {
    /// Opaque fields untouched.
    pub fn raw(record: &InvocationRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            request_id: record.request_id.clone(),
            function_arn: record.function_arn.clone(),
            payload: Value::String(record.payload.clone()),
            result: ResultView {
                payload: Value::String(record.result.payload.clone()),
                logs: LogsView::Blob(record.result.logs.clone()),
                is_error: record.result.is_error,
            },
        }
    }

    /// Payloads normalized, logs split into lines.
    pub fn formatted(record: &InvocationRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            request_id: record.request_id.clone(),
            function_arn: record.function_arn.clone(),
            payload: normalize_text(&record.payload),
            result: ResultView {
                payload: normalize_text(&record.result.payload),
                logs: LogsView::Lines(split_log_lines(&record.result.logs)),
                is_error: record.result.is_error,
            },
        }
    }

    pub fn from_record(record: &InvocationRecord, formatted: bool) -> Self {
        if formatted {
            Self::formatted(record)
        } else {
            Self::raw(record)
        }
    }

    /// Last `:`-separated segment of the function ARN.
    pub fn function_name(&self) -> &str {
        self.function_arn
            .rsplit(':')
            .next()
            .unwrap_or(&self.function_arn)
    }
}

/// Body of `GET /invocations`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationsResponse {
    pub invocations: Vec<InvocationView>,
}
