//! List and inspect recorded file events

use anyhow::Result;
use chrono::{Duration, Utc};
use owo_colors::OwoColorize;
use std::str::FromStr;

use vigil_core::event::{EventRecord, EventType};
use vigil_store::{EventFilter, RiskBand};

use crate::config;
use crate::data_access::DataAccess;
use crate::ipc::{IpcRequest, IpcResponse};
use crate::util;

pub async fn run(
    limit: usize,
    event_type: Option<String>,
    risk: Option<String>,
    search: Option<String>,
    hours: Option<i64>,
    offset: usize,
) -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;
    let high_floor = monitor_config.display.high_risk_threshold;

    // Parse textual filters up front so errors name the bad value
    let event_type = event_type
        .map(|raw| EventType::from_str(&raw))
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let risk = risk
        .map(|raw| RiskBand::from_str(&raw))
        .transpose()
        .map_err(anyhow::Error::msg)?;
    let since = hours.map(|h| Utc::now() - Duration::hours(h.max(1)));

    let filter = EventFilter {
        event_type,
        risk,
        search,
        since,
        limit,
        offset,
        high_floor,
    };

    let mut access = DataAccess::connect(&data_dir, monitor_config).await?;
    let reply = access.request(IpcRequest::Events { filter }).await?;
    let IpcResponse::Events { events } = reply else {
        anyhow::bail!("Unexpected reply to events query");
    };

    if events.is_empty() {
        println!("{}", "No events match".dimmed());
        return Ok(());
    }

    println!("{}", "Recent Events".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for record in &events {
        print_event_row(record, high_floor);
    }
    println!();
    println!(
        "{}",
        format!(
            "{} event(s) shown; 'vigil event <id>' shows details",
            events.len()
        )
        .dimmed()
    );

    Ok(())
}

/// Show one event in full
pub async fn run_show(id: u64) -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;
    let high_floor = monitor_config.display.high_risk_threshold;

    let mut access = DataAccess::connect(&data_dir, monitor_config).await?;
    let reply = access.request(IpcRequest::Event { id }).await?;
    let IpcResponse::Event { record } = reply else {
        anyhow::bail!("Unexpected reply to event query");
    };

    let Some(record) = record else {
        anyhow::bail!("No event with id {}", id);
    };
    let event = &record.event;

    println!(
        "{} {}",
        "event".yellow().bold(),
        record.id.to_string().cyan()
    );
    println!("{} {}", "Type:      ".dimmed(), event.event_type);
    println!("{} {}", "Path:      ".dimmed(), event.path.display());
    println!("{} {}", "Name:      ".dimmed(), event.name);
    if event.extension.is_empty() {
        println!("{} {}", "Extension: ".dimmed(), "(none)".dimmed());
    } else {
        println!("{} {}", "Extension: ".dimmed(), event.extension);
    }
    println!(
        "{} {}",
        "External:  ".dimmed(),
        if event.is_external_drive { "yes" } else { "no" }
    );
    println!(
        "{} {}",
        "Score:     ".dimmed(),
        util::paint_score(event.risk_score, high_floor)
    );
    println!("{} {}", "Actor:     ".dimmed(), event.actor);
    println!(
        "{} {} ({})",
        "Date:      ".dimmed(),
        util::format_absolute_time(event.created_at),
        util::format_relative_time(event.created_at).dimmed()
    );

    Ok(())
}

fn print_event_row(record: &EventRecord, high_floor: u8) {
    let event = &record.event;
    // Pad before coloring so columns line up
    let type_label = format!("{:<10}", event.event_type.to_string());
    let external = if event.is_external_drive {
        format!(" {}", "[external]".red())
    } else {
        String::new()
    };

    println!(
        "{} {} {} {}{} {}",
        format!("{:>6}", record.id).yellow(),
        util::paint_score(event.risk_score, high_floor),
        type_label.cyan(),
        event.name,
        external,
        util::format_relative_time(event.created_at).dimmed(),
    );
}
