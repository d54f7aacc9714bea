//! Common display utilities for CLI commands.

use std::fmt::Display;

use colored::Colorize;
use mainline::spread::HopEdge;

const MAX_DISPLAY_ITEMS: usize = 10;

/// Display ids of one kind with optional truncation.
///
/// Shows up to `MAX_DISPLAY_ITEMS` ids with bullet points. If there are more,
/// shows "... and N more". If empty, shows the provided `empty_message`.
pub fn print_ids<T: Display>(kind: &str, ids: &[T], empty_message: &str) {
    if ids.is_empty() {
        println!("    {}", empty_message.dimmed());
        return;
    }

    for id in ids.iter().take(MAX_DISPLAY_ITEMS) {
        println!("    {} {kind} #{id}", "•".dimmed());
    }

    print_remainder(ids.len());
}

/// Display reached edges grouped by hop distance.
pub fn print_hop_edges(edges: &[HopEdge]) {
    if edges.is_empty() {
        println!("    {}", "(nothing reached)".dimmed());
        return;
    }

    let mut start = 0;
    while start < edges.len() {
        let hop = edges[start].hop;
        let end = edges[start..]
            .iter()
            .position(|e| e.hop != hop)
            .map_or(edges.len(), |offset| start + offset);
        let group = &edges[start..end];

        println!(
            "  {} {} ({} edges)",
            "Hop".white().bold(),
            hop.to_string().white().bold(),
            group.len().to_string().green()
        );
        for edge in group.iter().take(MAX_DISPLAY_ITEMS) {
            println!("    {} edge #{}", "•".dimmed(), edge.edge_id);
        }
        print_remainder(group.len());
        start = end;
    }
}

fn print_remainder(len: usize) {
    if len > MAX_DISPLAY_ITEMS {
        println!("    {} ... and {} more", "•".dimmed(), len - MAX_DISPLAY_ITEMS);
    }
}

/// Format a length in metres for display.
pub fn format_length(metres: f64) -> String {
    if metres >= 1000.0 {
        format!("{:.2} km", metres / 1000.0)
    } else {
        format!("{metres:.1} m")
    }
}
