//! `mainline build` command implementation.

use colored::Colorize;

use super::Context;

/// Run the build command.
pub fn run(ctx: &Context) -> Result<(), mainline::Error> {
    let network = ctx.open()?;
    let tolerance = network.config().graph.snap_tolerance_m;

    println!(
        "{} (snap tolerance {tolerance} m)",
        "Building network graph".cyan().bold()
    );

    let report = network.rebuild_graph()?;

    println!();
    println!(
        "  {}: {}",
        "Nodes".white().bold(),
        report.nodes.to_string().green()
    );
    println!(
        "  {}: {}",
        "Edges".white().bold(),
        report.edges.to_string().green()
    );
    println!(
        "  {}: {} ({:.1}%)",
        "Dead ends".white().bold(),
        report.metrics.dead_ends.to_string().green(),
        report.dead_end_ratio * 100.0
    );
    println!(
        "  {}: {}",
        "Intersections".white().bold(),
        report.metrics.intersections.to_string().green()
    );

    if !report.skipped_pipes.is_empty() {
        println!();
        println!(
            "  {} {} pipes skipped (no usable geometry)",
            "warning:".yellow().bold(),
            report.skipped_pipes.len()
        );
    }

    let range = network.config().graph.dead_end_range();
    if report.metrics.total_nodes > 0 && !range.contains(&report.dead_end_ratio) {
        println!(
            "  {} dead-end share outside the expected {:.0}%-{:.0}%; check the snap tolerance",
            "warning:".yellow().bold(),
            range.start() * 100.0,
            range.end() * 100.0
        );
    }

    Ok(())
}
