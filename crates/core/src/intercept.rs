//! Call interception: an [`Invoker`] decorator that records every completed
//! invocation into an [`InvocationStore`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lambda_inspector_storage::{InvocationRecord, InvocationResult, InvocationStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A call handed to the execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Caller-supplied request id. Not validated.
    pub invoke_id: String,
    pub function_arn: String,
    /// Request body, passed through verbatim.
    pub payload: String,
}

/// Something that executes invocations.
#[async_trait]
pub trait Invoker: Send + Sync {
    type Error: fmt::Display + Send;

    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult, Self::Error>;
}

#[async_trait]
impl<I: Invoker + ?Sized> Invoker for Arc<I> {
    type Error = I::Error;

    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult, Self::Error> {
        (**self).invoke(request).await
    }
}

/// Wraps an [`Invoker`] and appends an [`InvocationRecord`] for every call
/// that returns a result.
///
/// The timestamp is taken before delegating. The wrapped invoker is always
/// called and its outcome is returned unchanged; failed calls are not
/// recorded.
pub struct InterceptingInvoker<I, S: ?Sized> {
    inner: I,
    store: Arc<S>,
}

impl<I, S: ?Sized> InterceptingInvoker<I, S> {
    pub fn new(inner: I, store: Arc<S>) -> Self {
        Self { inner, store }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

#[async_trait]
impl<I, S> Invoker for InterceptingInvoker<I, S>
where
    I: Invoker,
    S: InvocationStore + ?Sized,
{
    type Error = I::Error;

    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult, Self::Error> {
        let timestamp = OffsetDateTime::now_utc();

        let outcome = self.inner.invoke(request).await;

        match &outcome {
            Ok(result) => {
                self.store.append(InvocationRecord {
                    timestamp,
                    request_id: request.invoke_id.clone(),
                    function_arn: request.function_arn.clone(),
                    payload: request.payload.clone(),
                    result: result.clone(),
                });
                tracing::debug!(
                    request_id = %request.invoke_id,
                    function_arn = %request.function_arn,
                    is_error = result.is_error,
                    "recorded invocation"
                );
            }
            Err(e) => {
                tracing::debug!(
                    request_id = %request.invoke_id,
                    error = %e,
                    "invocation failed, not recorded"
                );
            }
        }

        outcome
    }
}
