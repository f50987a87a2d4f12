//! Show the current behavioral baseline

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
    let reply = access.request(IpcRequest::Baseline).await?;
    let IpcResponse::Baseline { baseline } = reply else {
        anyhow::bail!("Unexpected reply to baseline query");
    };

    println!("{}", "Behavioral Baseline".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if baseline.is_fallback {
        println!(
            "{}",
            "Using fallback baseline (not enough recorded activity yet)".yellow()
        );
        println!();
    }

    println!("Events/hour:    {:.2}", baseline.avg_events_per_hour);
    println!("Deletes/hour:   {:.2}", baseline.avg_deletes_per_hour);
    println!("External/hour:  {:.2}", baseline.avg_external_per_hour);
    print!("Common types:   ");
    if baseline.common_extensions.is_empty() {
        println!("{}", "(none)".dimmed());
    } else {
        println!("{}", baseline.common_extensions.join(", "));
    }
    println!("Sampled events: {}", baseline.sampled_events);

    Ok(())
}
