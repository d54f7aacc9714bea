//! `mainline spread` command implementation.

use colored::Colorize;
use mainline::Point;

use super::Context;
use super::display::print_hop_edges;

/// Run the spread command.
pub fn run(ctx: &Context, lon: f64, lat: f64, max_hops: Option<u32>) -> Result<(), mainline::Error> {
    let network = ctx.open()?;
    let hops = max_hops.unwrap_or(network.config().analysis.default_spread_hops);
    let result = network.spread(Point::new(lon, lat), hops)?;

    println!(
        "{} from ({lon}, {lat}), up to {hops} hops",
        "Spread".cyan().bold()
    );
    println!();
    println!(
        "  {}: edge #{} (node #{})",
        "Origin".white().bold(),
        result.origin_edge,
        result.origin_node
    );
    println!(
        "  {}: {}",
        "Edges reached".white().bold(),
        result.edges.len().to_string().green()
    );
    println!();

    print_hop_edges(&result.edges);

    Ok(())
}
