//! Upstream resolution and session setup for the duplex proxy.

use url::Url;

use crate::relay::{relay, SessionReport};
use crate::transport::{Connector, DuplexTransport, FrameSink, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The path suffix does not resolve to a URL under the forward base.
    #[error("cannot forward path '{path}' under {base}: {reason}")]
    InvalidPath {
        base: String,
        path: String,
        reason: String,
    },

    /// The upstream connection could not be established.
    #[error("failed to connect to upstream {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: TransportError,
    },
}

/// Forwards duplex sessions to `forward_base + path`.
///
/// The proxy owns every outbound connection it opens; inbound connections
/// are handed over for the lifetime of one session.
pub struct DuplexProxy<C> {
    forward_base: Url,
    connector: C,
}

impl<C: Connector> DuplexProxy<C> {
    pub fn new(forward_base: Url, connector: C) -> Self {
        Self {
            forward_base,
            connector,
        }
    }

    pub fn forward_base(&self) -> &Url {
        &self.forward_base
    }

    /// Resolve a path suffix against the forward base.
    ///
    /// Resolution follows URL reference rules, so a base without a trailing
    /// slash has its last segment replaced. The result must stay on the
    /// base's scheme, host and port.
    pub fn resolve(&self, path: &str) -> Result<Url, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidPath {
            base: self.forward_base.to_string(),
            path: path.to_string(),
            reason,
        };

        let url = self
            .forward_base
            .join(path)
            .map_err(|e| invalid(e.to_string()))?;

        if url.scheme() != self.forward_base.scheme()
            || url.host_str() != self.forward_base.host_str()
            || url.port_or_known_default() != self.forward_base.port_or_known_default()
        {
            return Err(invalid(format!("resolves outside the forward base to {url}")));
        }
        Ok(url)
    }

    /// Open the upstream connection for `path`.
    pub async fn connect(&self, path: &str) -> Result<C::Transport, ProxyError> {
        let url = self.resolve(path)?;
        self.connector
            .connect(&url)
            .await
            .map_err(|source| ProxyError::Connect {
                url: url.to_string(),
                source,
            })
    }

    /// Run a full session for an already-accepted inbound connection.
    ///
    /// If the upstream cannot be reached the inbound connection is closed and
    /// the error returned; no relaying happens. Otherwise frames are relayed
    /// until either side ends and both connections are closed before this
    /// returns.
    pub async fn handle<T: DuplexTransport>(
        &self,
        inbound: T,
        path: &str,
    ) -> Result<SessionReport, ProxyError> {
        let outbound = match self.connect(path).await {
            Ok(outbound) => outbound,
            Err(e) => {
                tracing::warn!(path, error = %e, "upstream unavailable, rejecting session");
                release(inbound).await;
                return Err(e);
            }
        };
        Ok(self.session(inbound, outbound, path).await)
    }

    /// Relay between `inbound` and an upstream connection opened by
    /// [`connect`](Self::connect), logging the session.
    pub async fn session<T: DuplexTransport>(
        &self,
        inbound: T,
        outbound: C::Transport,
        path: &str,
    ) -> SessionReport {
        tracing::info!(path, upstream = %self.forward_base, "duplex session started");
        let report = relay(inbound, outbound).await;
        tracing::info!(
            path,
            initiator = %report.initiator,
            inbound_to_outbound = report.inbound_to_outbound,
            outbound_to_inbound = report.outbound_to_inbound,
            "duplex session closed"
        );
        report
    }
}

/// Close a connection that will never be relayed. Close errors are
/// discarded.
pub async fn release<T: DuplexTransport>(connection: T) {
    let (sink, _source) = connection.split();
    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "closing unused connection failed");
    }
}
