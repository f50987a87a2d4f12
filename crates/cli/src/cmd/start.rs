//! Start the Vigil daemon

use anyhow::{Context, Result};
use std::time::Duration;

pub async fn run(foreground: bool) -> Result<()> {
    if foreground {
        // Run daemon in foreground (for debugging)
        crate::daemon::start().await
    } else {
        // Start daemon in background
        start_background().await
    }
}

async fn start_background() -> Result<()> {
    use crate::util;
    use std::process::Command;

    let data_dir = util::find_data_dir()?;
    let log_file = data_dir.join("logs/daemon.log");

    if crate::daemon::is_running(&data_dir) {
        println!("Daemon is already running");
        return Ok(());
    }

    // Ensure logs directory exists
    std::fs::create_dir_all(data_dir.join("logs")).context("Failed to create logs directory")?;

    // Get current executable path
    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    // Spawn daemon in background with nohup; pin the data directory so
    // the child resolves the same one regardless of its cwd
    let log_file_writer = std::fs::File::create(&log_file).context("Failed to create log file")?;

    Command::new("nohup")
        .arg(&exe)
        .arg("start")
        .arg("--foreground")
        .env(util::DATA_DIR_ENV, &data_dir)
        .stdout(log_file_writer.try_clone()?)
        .stderr(log_file_writer)
        .spawn()
        .context("Failed to spawn daemon process")?;

    // Poll briefly to verify it started
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        if crate::daemon::is_running(&data_dir) {
            println!("Daemon started successfully");
            println!("Logs: {}", log_file.display());
            return Ok(());
        }
    }

    anyhow::bail!(
        "Daemon failed to start (check logs at {})",
        log_file.display()
    )
}
