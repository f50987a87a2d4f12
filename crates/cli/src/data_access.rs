//! Unified data access for query commands
//!
//! Query commands work whether or not the daemon is up. A live daemon
//! owns the sled lock, so replies come over IPC; otherwise the store
//! is opened directly and dispatch runs in-process.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use vigil_store::SledStore;

use crate::config::MonitorConfig;
use crate::daemon::DaemonContext;
use crate::ipc::{socket_path, IpcClient, IpcRequest, IpcResponse};
use crate::locks::read_daemon_lock;
use crate::util;

/// Where query replies come from
pub enum DataAccess {
    /// Live daemon over the unix socket
    Daemon(IpcClient),
    /// Direct store access with in-process dispatch
    Direct(Box<DaemonContext>),
}

impl DataAccess {
    /// Pick the access path for this data directory
    pub async fn connect(data_dir: &Path, config: MonitorConfig) -> Result<Self> {
        if read_daemon_lock(data_dir).is_some() {
            let client = IpcClient::connect(&socket_path(data_dir))
                .await
                .context("Daemon is running but its socket is unreachable")?;
            return Ok(DataAccess::Daemon(client));
        }

        let store = Arc::new(
            SledStore::open(&data_dir.join("db")).context("Failed to open activity store")?,
        );
        let context = DaemonContext::offline(store, config, util::current_actor());
        Ok(DataAccess::Direct(Box::new(context)))
    }

    /// Issue one request over whichever path is active
    pub async fn request(&mut self, request: IpcRequest) -> Result<IpcResponse> {
        let response = match self {
            DataAccess::Daemon(client) => client.request(&request).await?,
            DataAccess::Direct(context) => context.handle(request).await,
        };

        if let IpcResponse::Error { message } = response {
            anyhow::bail!(message);
        }
        Ok(response)
    }

    /// True when replies come from a live daemon
    pub fn is_live(&self) -> bool {
        matches!(self, DataAccess::Daemon(_))
    }
}
