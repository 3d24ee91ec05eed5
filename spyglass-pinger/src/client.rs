use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::protocol::{self, PingError, RawQuery, RawStatus};

/// Network boundary of the ingestion pipeline.
///
/// The sweep only talks to this trait, so tests can drive it with scripted
/// responses instead of live sockets.
pub trait StatusProtocol: Send + Sync + 'static {
    /// One status-ping exchange. Every network or protocol failure looks
    /// the same to callers: the server yields no data this sweep.
    fn query_status(
        &self,
        host: String,
        port: u16,
    ) -> impl Future<Output = Result<RawStatus, PingError>> + Send;

    /// Best-effort legacy query. `None` on any failure.
    fn query_legacy(&self, host: String, port: u16) -> impl Future<Output = Option<RawQuery>> + Send;
}

/// Production client speaking the wire protocols with one shared timeout.
///
/// No retries: a server that does not answer in time is simply skipped
/// until the next sweep.
#[derive(Debug, Clone)]
pub struct PingClient {
    timeout: Duration,
}

impl PingClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for PingClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl StatusProtocol for PingClient {
    async fn query_status(&self, host: String, port: u16) -> Result<RawStatus, PingError> {
        protocol::status_ping(&host, port, self.timeout).await
    }

    async fn query_legacy(&self, host: String, port: u16) -> Option<RawQuery> {
        match protocol::full_query(&host, port, self.timeout).await {
            Ok(query) => Some(query),
            Err(e) => {
                debug!(host = %host, port, error = %e, "legacy query failed");
                None
            }
        }
    }
}
