//! lambda-inspector-core: turning intercepted Lambda invocations into
//! records and records into something readable.
//!
//! - [`InterceptingInvoker`] -- decorates an [`Invoker`] and logs every call
//!   into an [`InvocationStore`](lambda_inspector_storage::InvocationStore)
//! - [`normalize()`] -- recursive decoding of JSON-in-string payloads
//! - [`InvocationView`] -- raw and formatted serialization of records

pub mod intercept;
pub mod normalize;
pub mod view;

pub use intercept::{InterceptingInvoker, InvocationRequest, Invoker};
pub use normalize::{normalize, normalize_text, split_log_lines, MAX_NORMALIZE_DEPTH};
pub use view::{InvocationView, InvocationsResponse, LogsView, ResultView};
