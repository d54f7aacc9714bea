//! `mainline load` command implementation.

use std::fs;
use std::path::Path;

use colored::Colorize;
use mainline::NetworkData;

use super::Context;

/// Run the load command.
pub fn run(ctx: &Context, file: &Path) -> Result<(), mainline::Error> {
    let content = fs::read_to_string(file)?;
    let data: NetworkData = serde_json::from_str(&content)?;

    println!(
        "{} {} into {}",
        "Loading".cyan().bold(),
        file.display(),
        ctx.database().display()
    );

    let network = ctx.create()?;
    let summary = network.load_network(&data)?;

    println!();
    println!(
        "  {}: {}",
        "Pipes".white().bold(),
        summary.pipes.to_string().green()
    );
    println!(
        "  {}: {}",
        "Services".white().bold(),
        summary.services.to_string().green()
    );
    println!(
        "  {}: {}",
        "Buildings".white().bold(),
        summary.buildings.to_string().green()
    );
    println!();
    println!(
        "{}",
        "Graph cleared. Run `mainline build` to rebuild it.".dimmed()
    );

    Ok(())
}
