//! Initialize Vigil monitoring in a directory

use anyhow::{Context, Result};
use std::env;

use crate::config;
use crate::util::DATA_DIR_NAME;

pub async fn run() -> Result<()> {
    // Get current directory
    let current_dir = env::current_dir()?;
    let data_dir = current_dir.join(DATA_DIR_NAME);

    if data_dir.exists() {
        println!("Error: Vigil already initialized");
        println!("Location: {}", data_dir.display());
        std::process::exit(1);
    }

    println!("Initializing Vigil monitoring at {}", current_dir.display());

    // Create the directory layout
    for sub in ["db", "locks", "logs", "state"] {
        std::fs::create_dir_all(data_dir.join(sub))
            .with_context(|| format!("Failed to create {} directory", sub))?;
    }

    // Write the commented default configuration
    std::fs::write(config::config_path(&data_dir), config::example_config())
        .context("Failed to write default configuration")?;

    println!("Successfully initialized Vigil");
    println!();
    println!("Created .vigil/ directory structure:");
    println!("  - .vigil/db/          (event and alert storage)");
    println!("  - .vigil/locks/       (daemon lock)");
    println!("  - .vigil/logs/        (daemon log output)");
    println!("  - .vigil/state/       (daemon socket)");
    println!("  - .vigil/config.toml  (monitor configuration)");
    println!();
    println!("Next steps:");
    println!("  - Run 'vigil start' to begin monitoring");
    println!("  - Run 'vigil status' to check daemon state");
    Ok(())
}
