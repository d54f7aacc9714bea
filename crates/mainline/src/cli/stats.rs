//! `mainline stats` command implementation.

use colored::Colorize;

use super::Context;
use super::display::format_length;

/// Run the stats command.
pub fn run(ctx: &Context) -> Result<(), mainline::Error> {
    let network = ctx.open()?;
    let stats = network.network_stats()?;
    let totals = &stats.totals;

    println!("{}", "Network Statistics".cyan().bold());
    println!();

    println!(
        "  {}: {} ({})",
        "Pipes".white().bold(),
        totals.pipe_count.to_string().green(),
        format_length(totals.pipe_length_m)
    );
    println!(
        "  {}: {} ({})",
        "Services".white().bold(),
        totals.service_count.to_string().green(),
        format_length(totals.service_length_m)
    );
    println!(
        "  {}: {}",
        "Buildings".white().bold(),
        totals.building_count.to_string().green()
    );

    if !stats.by_class.is_empty() {
        println!();
        println!("  {}:", "By class".white().bold());
        for class in &stats.by_class {
            println!(
                "    {} {}: {} pipes, {}, avg {} mm",
                "•".dimmed(),
                class.class,
                class.count.to_string().green(),
                format_length(class.total_length_m),
                class.avg_diameter_mm
            );
        }
    }

    if !stats.by_material.is_empty() {
        println!();
        println!("  {}:", "By material".white().bold());
        for material in &stats.by_material {
            println!(
                "    {} {}: {} pipes, {}",
                "•".dimmed(),
                material.material,
                material.count.to_string().green(),
                format_length(material.total_length_m)
            );
        }
    }

    if !stats.by_age.is_empty() {
        println!();
        println!("  {}:", "By installation era".white().bold());
        for era in &stats.by_age {
            println!(
                "    {} {}: {} pipes, {}",
                "•".dimmed(),
                era.era,
                era.count.to_string().green(),
                format_length(era.total_length_m)
            );
        }
    }

    Ok(())
}
