//! `mainline status` command implementation.

use colored::Colorize;

use super::Context;

/// Run the status command.
pub fn run(ctx: &Context) -> Result<(), mainline::Error> {
    let network = ctx.open()?;
    let status = network.status()?;

    println!("{}", "Graph Status".cyan().bold());
    println!();
    println!(
        "  {}: {}",
        "Database".white().bold(),
        ctx.database().display()
    );

    if !status.graph_loaded {
        println!(
            "  {}: {}",
            "Graph".white().bold(),
            "not built (run `mainline build`)".yellow()
        );
        return Ok(());
    }

    println!("  {}: {}", "Graph".white().bold(), "loaded".green());
    println!(
        "  {}: {}",
        "Nodes".white().bold(),
        status.node_count.to_string().green()
    );
    println!(
        "  {}: {}",
        "Edges".white().bold(),
        status.edge_count.to_string().green()
    );

    let scored = if status.scored_edges == status.edge_count {
        "all".green().to_string()
    } else if status.scored_edges == 0 {
        "none (run `mainline criticality`)".yellow().to_string()
    } else {
        format!("{} of {}", status.scored_edges, status.edge_count)
            .yellow()
            .to_string()
    };
    println!("  {}: {scored}", "Scored".white().bold());

    Ok(())
}
