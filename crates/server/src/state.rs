//! Application state shared across request handlers.

use std::sync::Arc;

use lambda_inspector_core::{InterceptingInvoker, Invoker};
use lambda_inspector_proxy::{DuplexProxy, WebSocketConnector};
use lambda_inspector_storage::InvocationStore;
use url::Url;

use crate::executor::ExecutorError;

/// An invoker usable behind `POST /invoke`.
pub type SharedInvoker = Arc<dyn Invoker<Error = ExecutorError>>;

pub struct AppState {
    /// The invocation log read by `GET /invocations`.
    pub(crate) store: Arc<dyn InvocationStore>,
    /// Intercepting executor. `None` when no execution backend is configured.
    pub(crate) invoker: Option<SharedInvoker>,
    /// WebSocket proxy to the dashboard backend.
    pub(crate) proxy: DuplexProxy<WebSocketConnector>,
}

impl AppState {
    pub fn new(store: Arc<dyn InvocationStore>, ws_forward: Url) -> Self {
        Self {
            store,
            invoker: None,
            proxy: DuplexProxy::new(ws_forward, WebSocketConnector),
        }
    }

    /// Route `POST /invoke` through `executor`, recording every call in the
    /// state's store.
    pub fn with_executor<I>(mut self, executor: I) -> Self
    where
        I: Invoker<Error = ExecutorError> + 'static,
    {
        let intercepting = InterceptingInvoker::new(executor, self.store.clone());
        self.invoker = Some(Arc::new(intercepting));
        self
    }

    pub fn store(&self) -> &Arc<dyn InvocationStore> {
        &self.store
    }
}
