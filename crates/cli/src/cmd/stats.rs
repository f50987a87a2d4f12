//! Aggregate statistics for recorded activity

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
    let reply = access.request(IpcRequest::Stats).await?;
    let IpcResponse::Stats { summary, stats } = reply else {
        anyhow::bail!("Unexpected reply to stats query");
    };

    println!("{}", "Activity Statistics".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Events:");
    println!("  Total:        {}", stats.total_events);
    println!("  Average risk: {:.1}", stats.average_risk);
    println!("  High risk:    {}", stats.high_risk_events);
    println!("  External:     {}", stats.external_drive_events);
    println!();

    if !stats.by_type.is_empty() {
        println!("By type:");
        for entry in &stats.by_type {
            // Pad before coloring so columns line up
            let label = format!("{:<12}", entry.event_type.to_string());
            println!("  {} {}", label.cyan(), entry.count);
        }
        println!();
    }

    println!("Risk distribution:");
    for bucket in &summary.distribution {
        let (low, high) = bucket.level.bounds();
        println!(
            "  {} ({:>3}-{:>3}) {}",
            format!("{:<10}", bucket.level.label()),
            low,
            high,
            bucket.count
        );
    }
    println!();

    println!("Alerts:");
    println!("  Total:        {}", summary.total_alerts);
    println!("  Unresolved:   {}", summary.unresolved_alerts);

    Ok(())
}
