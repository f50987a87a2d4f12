//! Show daemon and activity status

use crate::config;
use crate::data_access::DataAccess;
use crate::ipc::{socket_path, IpcClient, IpcRequest, IpcResponse};
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use vigil_store::EventFilter;

pub async fn run() -> Result<()> {
    // 1. Find the data directory and load configuration
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;
    let high_floor = monitor_config.display.high_risk_threshold;

    // 2. Check daemon status
    let daemon_running = crate::daemon::is_running(&data_dir);

    // 3. Display output
    println!("{}", "Vigil Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    // Data directory
    println!("Data dir:      {}", data_dir.display().to_string().cyan());
    println!();

    // Daemon status
    print!("Daemon:        ");
    if daemon_running {
        println!("{}", "Running ✓".green());

        // If daemon is running, try to get detailed status via IPC
        if let Ok(mut client) = IpcClient::connect(&socket_path(&data_dir)).await {
            if let Ok(status) = client.get_status().await {
                println!("  PID:         {}", status.pid);
                println!("  Uptime:      {} seconds", status.uptime_secs);
                println!("  Actor:       {}", status.actor);
                println!("  Watching:    {} roots", status.roots.len());
                println!("  Events:      {} processed", status.events_processed);
                println!("  Alerts:      {} raised", status.alerts_raised);
            }
        }
    } else {
        println!("{}", "Not running".yellow());
        println!("  {}", "Tip: Start with 'vigil start'".dimmed());
    }
    println!();

    // 4. Latest event and totals, from wherever is answering queries
    let mut access = DataAccess::connect(&data_dir, monitor_config).await?;

    println!("Latest event:");
    let reply = access
        .request(IpcRequest::Events {
            filter: EventFilter {
                limit: 1,
                high_floor,
                ..Default::default()
            },
        })
        .await?;
    if let IpcResponse::Events { events } = reply {
        match events.first() {
            Some(record) => {
                let event = &record.event;
                println!("  ID:          {}", record.id.to_string().yellow());
                println!("  Type:        {}", event.event_type.to_string().cyan());
                println!("  File:        {}", event.name);
                println!(
                    "  Score:       {}",
                    util::paint_score(event.risk_score, high_floor)
                );
                println!(
                    "  Time:        {} ({})",
                    util::format_relative_time(event.created_at),
                    util::format_absolute_time(event.created_at).dimmed()
                );
            }
            None => println!("  {}", "No events recorded yet".dimmed()),
        }
    }
    println!();

    let reply = access.request(IpcRequest::Stats).await?;
    if let IpcResponse::Stats { summary, stats } = reply {
        println!("Activity:");
        println!("  Events:      {}", stats.total_events);
        println!("  High risk:   {}", stats.high_risk_events);
        println!(
            "  Alerts:      {} ({} unresolved)",
            summary.total_alerts, summary.unresolved_alerts
        );
        println!();

        // Helpful hints
        if stats.total_events == 0 && !daemon_running {
            println!(
                "{}",
                "Tip: Start the daemon to begin recording file activity".dimmed()
            );
        } else if !daemon_running {
            println!(
                "{}",
                "Note: Daemon is not running. New file activity is not being recorded.".dimmed()
            );
        }
    }

    Ok(())
}
