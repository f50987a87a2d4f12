//! Hourly activity timeline

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::config;
use crate::data_access::DataAccess;
use crate::ipc::{IpcRequest, IpcResponse};
use crate::util;

pub async fn run(hours: i64) -> Result<()> {
    let data_dir = util::find_data_dir()?;
    let monitor_config = config::load(&data_dir)?;

    let mut access = DataAccess::connect(&data_dir, monitor_config).await?;
    let reply = access.request(IpcRequest::Timeline { hours }).await?;
    let IpcResponse::Timeline { buckets } = reply else {
        anyhow::bail!("Unexpected reply to timeline query");
    };

    if buckets.is_empty() {
        println!("{}", "No activity in the selected window".dimmed());
        return Ok(());
    }

    println!("{}", format!("Activity (last {} hours)", hours.max(1)).bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    for bucket in &buckets {
        println!(
            "{}  {:>5} events  avg risk {:>5.1}",
            util::format_absolute_time(bucket.hour).dimmed(),
            bucket.count,
            bucket.average_risk,
        );
    }

    Ok(())
}
