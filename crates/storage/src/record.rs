use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The outcome of a single intercepted invocation as returned by the
/// execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Response body, stored verbatim (conventionally JSON text).
    pub payload: String,
    /// Newline-delimited log output captured during the invocation.
    pub logs: String,
    pub is_error: bool,
}

/// One logged call: request payload in, result out.
///
/// Records are immutable once appended to an [`InvocationStore`](crate::InvocationStore).
/// `payload` is never parsed at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRecord {
    /// RFC 3339 timestamp of when the call was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub request_id: String,
    pub function_arn: String,
    pub payload: String,
    pub result: InvocationResult,
}
