//! IPC between CLI and daemon
//!
//! Line-delimited JSON over a unix socket at `.vigil/state/daemon.sock`.
//! One request, one reply per line; the daemon keeps the connection
//! open so a client can issue several requests over it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, warn};

use vigil_core::event::{AlertRecord, Anomaly, EventRecord};
use vigil_risk::Baseline;
use vigil_store::{EventFilter, EventStats, RiskSummary, TimelineBucket};

use crate::daemon::DaemonContext;

/// Where the daemon listens inside a data directory
pub fn socket_path(data_dir: &Path) -> PathBuf {
    data_dir.join("state/daemon.sock")
}

/// Requests the CLI can issue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum IpcRequest {
    Status,
    Events { filter: EventFilter },
    Event { id: u64 },
    Alerts { unresolved_only: bool, limit: usize },
    ResolveAlert { id: u64 },
    Anomalies,
    Baseline,
    Stats,
    Timeline { hours: i64 },
}

/// Daemon self-description returned for [`IpcRequest::Status`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub pid: u32,
    pub uptime_secs: u64,
    pub actor: String,
    pub roots: Vec<PathBuf>,
    pub events_processed: u64,
    pub alerts_raised: u64,
}

/// Replies, one per request variant plus a generic error
///
/// Struct variants throughout: serde's internal tagging cannot
/// represent a newtype variant holding a sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum IpcResponse {
    Status { status: DaemonStatus },
    Events { events: Vec<EventRecord> },
    Event { record: Option<EventRecord> },
    Alerts { alerts: Vec<AlertRecord> },
    Resolved { known: bool },
    Anomalies { anomalies: Vec<Anomaly> },
    Baseline { baseline: Baseline },
    Stats { summary: RiskSummary, stats: EventStats },
    Timeline { buckets: Vec<TimelineBucket> },
    Error { message: String },
}

/// IPC client for communicating with daemon
pub struct IpcClient {
    stream: BufReader<UnixStream>,
}

impl IpcClient {
    /// Connect to daemon
    pub async fn connect(socket_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket_path).await.with_context(|| {
            format!(
                "Failed to connect to daemon socket at {}",
                socket_path.display()
            )
        })?;
        Ok(Self {
            stream: BufReader::new(stream),
        })
    }

    /// Send one request and wait for the reply
    pub async fn request(&mut self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut line = serde_json::to_string(request).context("Failed to serialize request")?;
        line.push('\n');
        self.stream
            .get_mut()
            .write_all(line.as_bytes())
            .await
            .context("Failed to send request to daemon")?;

        let mut reply = String::new();
        let read = self
            .stream
            .read_line(&mut reply)
            .await
            .context("Failed to read daemon reply")?;
        if read == 0 {
            anyhow::bail!("Daemon closed the connection");
        }

        let response: IpcResponse =
            serde_json::from_str(reply.trim()).context("Failed to parse daemon reply")?;
        Ok(response)
    }

    /// Convenience wrapper for the status round trip
    pub async fn get_status(&mut self) -> Result<DaemonStatus> {
        match self.request(&IpcRequest::Status).await? {
            IpcResponse::Status { status } => Ok(status),
            IpcResponse::Error { message } => anyhow::bail!(message),
            other => anyhow::bail!("Unexpected reply to status request: {:?}", other),
        }
    }
}

/// IPC server for daemon
pub struct IpcServer {
    listener: UnixListener,
    path: PathBuf,
}

impl IpcServer {
    /// Bind the daemon socket, replacing a leftover socket file
    ///
    /// A daemon that died hard leaves its socket file behind; the lock
    /// guarantees no live daemon owns it, so removal is safe.
    pub fn bind(socket_path: &Path) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("Failed to remove stale daemon socket")?;
        }

        let listener = UnixListener::bind(socket_path).with_context(|| {
            format!("Failed to bind daemon socket at {}", socket_path.display())
        })?;

        Ok(Self {
            listener,
            path: socket_path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept loop; one task per connection
    pub async fn serve(self, context: Arc<DaemonContext>) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let context = Arc::clone(&context);
                    tokio::spawn(async move {
                        if let Err(error) = handle_connection(stream, context).await {
                            debug!(%error, "ipc connection ended with error");
                        }
                    });
                }
                Err(error) => {
                    warn!(%error, "ipc accept failed");
                }
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, context: Arc<DaemonContext>) -> Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();

    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(()); // client went away
        }

        let response = match serde_json::from_str::<IpcRequest>(line.trim()) {
            Ok(request) => context.handle(request).await,
            Err(error) => IpcResponse::Error {
                message: format!("Malformed request: {}", error),
            },
        };

        let mut reply = serde_json::to_string(&response)?;
        reply.push('\n');
        reader.get_mut().write_all(reply.as_bytes()).await?;
    }
}
