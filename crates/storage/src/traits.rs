use crate::record::InvocationRecord;

/// The storage trait for the invocation log.
///
/// An `InvocationStore` is an append-only, insertion-ordered log of
/// [`InvocationRecord`]s. It is written by the call interceptor and read by
/// the query endpoint, possibly from many threads at once.
///
/// ## Ordering
///
/// Records are returned oldest first, in the order `append` calls completed.
/// Two concurrent appends are serialized; neither may observe or produce a
/// partially-written record.
///
/// ## Ownership
///
/// `list` hands out owned copies. Nothing a caller does with the returned
/// records can change what the store holds.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
pub trait InvocationStore: Send + Sync + 'static {
    /// Append a record to the end of the log. Never fails.
    fn append(&self, record: InvocationRecord);

    /// Snapshot of the log, optionally restricted to records whose
    /// `function_arn` equals `function_arn` exactly.
    fn list(&self, function_arn: Option<&str>) -> Vec<InvocationRecord>;

    /// Number of records currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
