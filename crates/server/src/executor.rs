//! HTTP execution backend client.
//!
//! Forwards an invocation to `POST {executor_url}/invoke` and reads the
//! function's result back. Uses `ureq` (sync) wrapped in
//! `tokio::task::spawn_blocking` to avoid blocking the async runtime.

use async_trait::async_trait;
use lambda_inspector_core::{InvocationRequest, Invoker};
use lambda_inspector_storage::InvocationResult;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The request could not be delivered or the executor answered with an
    /// error status.
    #[error("executor request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The executor's answer was not a valid invocation result.
    #[error("executor at {url} returned an unreadable result: {message}")]
    Decode { url: String, message: String },

    #[error("executor task failed: {0}")]
    Join(String),
}

/// Wire body sent to the executor.
#[derive(Debug, Serialize)]
struct ExecutorPayload<'a> {
    #[serde(rename = "invoke-id")]
    invoke_id: &'a str,
    #[serde(rename = "invoked-function-arn")]
    invoked_function_arn: &'a str,
    payload: &'a str,
}

/// Wire body returned by the executor.
#[derive(Debug, Deserialize)]
struct ExecutorResponse {
    payload: String,
    #[serde(default)]
    logs: String,
    #[serde(default)]
    is_error: bool,
}

/// [`Invoker`] that runs invocations on a remote executor over HTTP.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    invoke_url: Url,
}

impl HttpExecutor {
    /// `base` is the executor root; requests go to `{base}/invoke`.
    pub fn new(base: &Url) -> Result<Self, url::ParseError> {
        let mut root = base.clone();
        if !root.path().ends_with('/') {
            root.set_path(&format!("{}/", root.path()));
        }
        Ok(Self {
            invoke_url: root.join("invoke")?,
        })
    }

    pub fn invoke_url(&self) -> &Url {
        &self.invoke_url
    }
}

#[async_trait]
impl Invoker for HttpExecutor {
    type Error = ExecutorError;

    async fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult, ExecutorError> {
        let url = self.invoke_url.to_string();
        let body = serde_json::to_value(ExecutorPayload {
            invoke_id: &request.invoke_id,
            invoked_function_arn: &request.function_arn,
            payload: &request.payload,
        })
        .map_err(|e| ExecutorError::Request {
            url: url.clone(),
            message: format!("could not encode request: {}", e),
        })?;

        tokio::task::spawn_blocking(move || {
            let agent = ureq::Agent::new_with_defaults();
            let response = agent
                .post(&url)
                .send_json(&body)
                .map_err(|e| ExecutorError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            let decoded: ExecutorResponse =
                response
                    .into_body()
                    .read_json()
                    .map_err(|e| ExecutorError::Decode {
                        url: url.clone(),
                        message: e.to_string(),
                    })?;

            Ok(InvocationResult {
                payload: decoded.payload,
                logs: decoded.logs,
                is_error: decoded.is_error,
            })
        })
        .await
        .map_err(|e| ExecutorError::Join(e.to_string()))?
    }
}
