//! `mainline outage` command implementation.

use colored::Colorize;
use mainline::EdgeId;

use super::Context;
use super::display::{format_length, print_ids};

/// Run the outage command.
pub fn run(ctx: &Context, edge_id: EdgeId) -> Result<(), mainline::Error> {
    let network = ctx.open()?;
    let impact = network.outage(edge_id)?;

    println!(
        "{} {}",
        "Outage impact for edge".cyan().bold(),
        format!("#{edge_id}").cyan().bold()
    );
    println!();

    match impact.hub {
        Some(hub) => println!("  {}: node #{hub}", "Supply hub".white().bold()),
        None => {
            println!(
                "  {}",
                "No graph loaded; nothing can be disconnected.".yellow()
            );
            return Ok(());
        }
    }

    if impact.is_empty() {
        println!(
            "  {}",
            "No other part of the network depends on this edge.".green()
        );
        return Ok(());
    }

    println!(
        "  {}: {}",
        "Disconnected nodes".white().bold(),
        impact.disconnected_nodes.len().to_string().green()
    );
    println!(
        "  {}: {}",
        "Affected buildings".white().bold(),
        impact.affected_building_count().to_string().green()
    );
    println!(
        "  {}: {} ({})",
        "Service connections".white().bold(),
        impact.affected_service_count.to_string().green(),
        format_length(impact.total_service_length_m)
    );
    println!();

    println!("  {}:", "Pipes without supply".white().bold());
    print_ids("pipe", &impact.affected_pipes, "(none)");

    Ok(())
}
