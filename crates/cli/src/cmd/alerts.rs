//! List and resolve risk alerts

use anyhow::Result;
use owo_colors::OwoColorize;

use vigil_core::event::AlertRecord;

use crate::config;
use crate::data_access::DataAccess;
use crate::ipc::{IpcRequest, IpcResponse};
use crate::util;

pub async fn run(unresolved_only: bool, limit: usize) -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;

    let mut access = DataAccess::connect(&data_dir, monitor_config).await?;
    let reply = access
        .request(IpcRequest::Alerts {
            unresolved_only,
            limit,
        })
        .await?;
    let IpcResponse::Alerts { alerts } = reply else {
        anyhow::bail!("Unexpected reply to alerts query");
    };

    if alerts.is_empty() {
        if unresolved_only {
            println!("{}", "No unresolved alerts".green());
        } else {
            println!("{}", "No alerts recorded".dimmed());
        }
        return Ok(());
    }

    println!("{}", "Risk Alerts".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for record in &alerts {
        print_alert_row(record);
    }
    println!();
    println!(
        "{}",
        "Tip: Resolve an alert with 'vigil resolve <id>'".dimmed()
    );

    Ok(())
}

/// Mark one alert as handled
pub async fn run_resolve(id: u64) -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;

    let mut access = DataAccess::connect(&data_dir, monitor_config).await?;
    let reply = access.request(IpcRequest::ResolveAlert { id }).await?;
    let IpcResponse::Resolved { known } = reply else {
        anyhow::bail!("Unexpected reply to resolve request");
    };

    if known {
        println!("{} Alert {} resolved", "✓".green(), id);
        Ok(())
    } else {
        anyhow::bail!("No alert with id {}", id)
    }
}

fn print_alert_row(record: &AlertRecord) {
    let alert = &record.alert;
    // Pad before coloring so columns line up
    let state = if record.resolved {
        format!("{:<8}", "resolved").green().to_string()
    } else {
        format!("{:<8}", "open").red().bold().to_string()
    };

    println!(
        "{} {} sev {} {} {}",
        format!("{:>6}", record.id).yellow(),
        state,
        alert.severity,
        alert.description,
        util::format_relative_time(record.created_at).dimmed(),
    );
}
