//! Run an on-demand anomaly detection pass

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config;
use crate::data_access::DataAccess;
use crate::ipc::{IpcRequest, IpcResponse};
use crate::util;

pub async fn run() -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;

    let mut access = DataAccess::connect(&data_dir, monitor_config).await?;
    let reply = access.request(IpcRequest::Anomalies).await?;
    let IpcResponse::Anomalies { anomalies } = reply else {
        anyhow::bail!("Unexpected reply to anomalies query");
    };

    if anomalies.is_empty() {
        println!("{}", "No anomalies in the current window".green());
        return Ok(());
    }

    println!("{}", "Anomalies".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for anomaly in &anomalies {
        // Pad before coloring so columns line up
        let kind = format!("{:<14}", anomaly.kind.to_string());
        println!(
            "{} sev {} {}",
            kind.red().bold(),
            anomaly.severity,
            anomaly.description
        );
        println!(
            "  {}",
            format!(
                "window: {} to {} ({} events)",
                util::format_absolute_time(anomaly.window.since),
                util::format_absolute_time(anomaly.window.until),
                anomaly.window.events_considered
            )
            .dimmed()
        );
    }

    Ok(())
}
