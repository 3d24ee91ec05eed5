//! The sweep: one full pass over all known servers.

use std::sync::Arc;

use spyglass_db::{Database, DbError, NewRecord, Server, ServerKind};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::client::StatusProtocol;
use crate::helpers::now;
use crate::normalize;

#[derive(Debug, Error)]
pub enum SweepError {
    /// A batch commit failed. Batches committed before this one are
    /// durable; the sweep stops here instead of silently losing the
    /// fetched data.
    #[error("persisting a batch failed: {0}")]
    Persistence(#[from] DbError),
}

/// Tuning for one sweep.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Servers polled concurrently per committed batch
    pub batch_size: usize,
    /// Log every merged record
    pub verbose: bool,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            batch_size: 200,
            verbose: false,
        }
    }
}

/// What a finished sweep did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Known servers considered
    pub servers: usize,
    /// Committed batch sizes, in commit order
    pub batches: Vec<usize>,
}

impl SweepSummary {
    /// Total records persisted.
    pub fn records(&self) -> usize {
        self.batches.iter().sum()
    }
}

/// Poll every known server once and persist the results batch by batch.
///
/// Polls within a batch fan out concurrently; batches are strictly
/// sequential, and a batch is committed before the next one starts. A
/// server whose status step fails contributes nothing and never disturbs
/// its siblings. Only a persistence failure aborts the sweep.
pub async fn run_sweep<C: StatusProtocol>(
    db: &Database,
    client: Arc<C>,
    options: &SweepOptions,
) -> Result<SweepSummary, SweepError> {
    let servers = db.all_servers().await?;
    let batch_size = options.batch_size.max(1);
    info!(servers = servers.len(), batch_size, "starting sweep");

    let mut summary = SweepSummary {
        servers: servers.len(),
        batches: Vec::new(),
    };

    for batch in servers.chunks(batch_size) {
        let mut polls = JoinSet::new();
        for server in batch {
            let client = Arc::clone(&client);
            let server = server.clone();
            polls.spawn(async move { poll_server(client, server).await });
        }

        let mut records = Vec::new();
        while let Some(outcome) = polls.join_next().await {
            match outcome {
                Ok(Some(record)) => {
                    if options.verbose {
                        info!(?record, "merged record");
                    }
                    records.push(record);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "poll task failed"),
            }
        }

        let committed = records.len();
        db.save_records(records, now()).await?;
        info!("{committed} servers committed");
        summary.batches.push(committed);
    }

    info!(
        batches = summary.batches.len(),
        records = summary.records(),
        "sweep complete"
    );
    Ok(summary)
}

/// One server's poll: the status ping, then (Java only) the best-effort
/// legacy query, merged into a record draft. `None` means this server
/// contributes nothing this sweep.
async fn poll_server<C: StatusProtocol>(client: Arc<C>, server: Server) -> Option<NewRecord> {
    let Some((host, port)) = split_address(&server.address) else {
        warn!(address = %server.address, "unparseable address, skipping");
        return None;
    };

    let kind = match ServerKind::parse(&server.kind) {
        Some(kind) => kind,
        None => {
            warn!(address = %server.address, kind = %server.kind, "unsupported server kind, skipping");
            return None;
        }
    };

    match kind {
        ServerKind::Java => {
            let status = match client.query_status(host.clone(), port).await {
                Ok(status) => status,
                Err(e) => {
                    debug!(address = %server.address, error = %e, "status ping failed");
                    return None;
                }
            };

            let query = client.query_legacy(host, port).await;

            let record = normalize::merge(&server, status, query);
            if record.max_players == 0 {
                // Signal only: a reported max of 0 usually means offline
                warn!(address = %server.address, "server reports a max player count of 0");
            }
            Some(record)
        }
        ServerKind::Bedrock => {
            // Not implemented yet; Bedrock servers yield nothing for now
            debug!(address = %server.address, "bedrock polling not implemented");
            None
        }
    }
}

/// Split `host:port`. The scraper normalizes addresses to always carry a
/// port, but rows predating that rule may not.
fn split_address(address: &str) -> Option<(String, u16)> {
    let (host, port) = address.split_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse().ok()?;
    Some((host.to_string(), port))
}
