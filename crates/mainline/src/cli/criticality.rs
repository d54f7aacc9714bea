//! `mainline criticality` command implementation.

use std::io::Write;

use colored::Colorize;
use mainline::CriticalityOptions;
use mainline::criticality::{CancelToken, CriticalityLevel, Progress};

use super::Context;

/// Run the criticality command.
///
/// The first Ctrl-C stops the run after the edge in progress, leaving the
/// stored scores untouched; a second one exits immediately.
pub fn run(ctx: &Context, sequential: bool, top: Option<usize>) -> Result<(), mainline::Error> {
    let token = CancelToken::new();
    cancel_on_interrupt(token.clone());
    score(ctx, sequential, top, token)
}

fn cancel_on_interrupt(token: CancelToken) {
    let spawned = std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot watch for Ctrl-C; run is not interruptible");
                    return;
                }
            };
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                eprintln!(
                    "\n{}",
                    "Stopping after the current edge (Ctrl-C again to abort)".yellow()
                );
                token.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Cannot watch for Ctrl-C; run is not interruptible");
    }
}

fn score(
    ctx: &Context,
    sequential: bool,
    top: Option<usize>,
    token: CancelToken,
) -> Result<(), mainline::Error> {
    let network = ctx.open()?;
    let snapshot = network.snapshot()?;

    if snapshot.edge_count() == 0 {
        println!(
            "{}",
            "No graph loaded. Run `mainline build` first.".yellow()
        );
        return Ok(());
    }

    println!(
        "{} {} edges{}",
        "Scoring".cyan().bold(),
        snapshot.edge_count().to_string().green(),
        if sequential { " (sequential)" } else { "" }
    );
    if let Some(hub) = snapshot.hub_node() {
        println!(
            "  {}: node #{hub} (degree {})",
            "Using hub".white().bold(),
            snapshot.degree(hub).unwrap_or(0)
        );
    }
    drop(snapshot);

    let report_progress = |progress: Progress| {
        print!(
            "\r  {} {}/{} edges",
            "Processed".dimmed(),
            progress.processed,
            progress.total
        );
        // Progress output is best effort
        std::io::stdout().flush().ok();
    };

    let report = network.compute_criticality(&CriticalityOptions {
        sequential,
        top,
        cancel: Some(token),
        on_progress: Some(&report_progress),
    })?;
    println!();
    println!();

    println!(
        "  {}: {}",
        "Scores written".white().bold(),
        report.persisted.to_string().green()
    );

    match report.most_critical {
        Some((edge, score)) if score > 0 => println!(
            "  {}: edge #{edge} ({} buildings affected)",
            "Most critical".white().bold(),
            score.to_string().red().bold()
        ),
        _ => println!(
            "  {}",
            "No single edge failure disconnects any building.".green()
        ),
    }

    if !report.distribution.is_empty() {
        println!();
        println!("  {}:", "Distribution".white().bold());
        for band in &report.distribution {
            println!(
                "    {} {}: {} edges (avg {:.1} buildings)",
                "•".dimmed(),
                paint(band.level),
                band.edge_count.to_string().green(),
                band.average_score
            );
        }
    }

    if !report.ranking.is_empty() {
        println!();
        println!(
            "{}",
            format!("Top {} Critical Edges", report.ranking.len())
                .cyan()
                .bold()
        );
        for (rank, entry) in report.ranking.iter().enumerate() {
            let pipe = match (entry.class, entry.diameter_mm) {
                (Some(class), Some(diameter)) => format!("{class}, {diameter} mm"),
                _ => "unknown pipe".to_string(),
            };
            println!(
                "  {:>3}. edge #{} {} buildings [{}] {}",
                rank + 1,
                entry.edge_id,
                entry.score.to_string().green(),
                paint(entry.level),
                pipe.dimmed()
            );
        }
    }

    Ok(())
}

fn paint(level: CriticalityLevel) -> colored::ColoredString {
    let label = level.as_str().to_uppercase();
    match level {
        CriticalityLevel::High => label.red().bold(),
        CriticalityLevel::Medium => label.yellow(),
        CriticalityLevel::Low => label.normal(),
    }
}
