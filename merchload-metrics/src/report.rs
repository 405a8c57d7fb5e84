//! Summary output

use crate::error::MetricsResult;
use crate::summary::Summary;
use colored::*;
use std::fmt::Write as _;
use std::path::Path;

const NAME_WIDTH: usize = 32;

fn dotted(name: &str) -> String {
    if name.len() >= NAME_WIDTH {
        format!("{}:", name)
    } else {
        format!("{}{}:", name, ".".repeat(NAME_WIDTH - name.len()))
    }
}

fn print_duration(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else if ms >= 1.0 {
        format!("{:.2}ms", ms)
    } else {
        format!("{:.0}µs", ms * 1000.0)
    }
}

/// Render the summary as text for a terminal
pub fn render_text(summary: &Summary) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "\n  {} {} (started {}, ran {})\n",
        "run".bold(),
        summary.run_id,
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        print_duration(summary.duration_ms)
    );

    if !summary.checks.is_empty() {
        for (name, stats) in &summary.checks {
            let mark = if stats.fails == 0 {
                "✓".bright_green().bold()
            } else {
                "✗".bright_red().bold()
            };
            let _ = writeln!(
                out,
                "  {} {} {} {}",
                mark,
                dotted(name),
                format!("✓ {}", stats.passes).green(),
                format!("✗ {}", stats.fails).red()
            );
        }
        let total = summary.total_checks();
        let _ = writeln!(
            out,
            "\n  {} {:.2}% of {}\n",
            dotted(crate::CHECKS),
            total.rate().unwrap_or(0.0) * 100.0,
            total.total()
        );
    }

    for (name, stats) in &summary.trends {
        let _ = writeln!(
            out,
            "  {} avg={} min={} med={} max={} p(90)={} p(95)={} p(99)={} count={}",
            dotted(name).bright_cyan(),
            print_duration(stats.avg),
            print_duration(stats.min),
            print_duration(stats.med),
            print_duration(stats.max),
            print_duration(stats.p90),
            print_duration(stats.p95),
            print_duration(stats.p99),
            stats.count
        );
    }

    for (name, value) in &summary.counters {
        let rate = if summary.duration_ms > 0.0 {
            *value as f64 / (summary.duration_ms / 1000.0)
        } else {
            0.0
        };
        let _ = writeln!(out, "  {} {} {:.2}/s", dotted(name), value, rate);
    }

    for (name, value) in &summary.gauges {
        let _ = writeln!(out, "  {} {}", dotted(name), value);
    }

    if !summary.thresholds.is_empty() {
        let _ = writeln!(out, "\n  {}", "thresholds".bold());
        for outcome in &summary.thresholds {
            let mark = if outcome.passed {
                "✓".bright_green().bold()
            } else {
                "✗".bright_red().bold()
            };
            let observed = outcome
                .observed
                .map(|value| format!("{:.3}", value))
                .unwrap_or_else(|| "no data".to_string());
            let _ = writeln!(
                out,
                "  {} {} {} (observed {})",
                mark, outcome.metric, outcome.expression, observed
            );
        }
    }

    out
}

/// Print the text summary to stdout
pub fn print_summary(summary: &Summary) {
    println!("{}", render_text(summary));
    if !summary.passed() {
        let failed = summary.failed_thresholds().count();
        println!(
            "{} {} threshold(s) crossed",
            "✗".bright_red().bold(),
            failed.to_string().bright_red()
        );
    }
}

/// Write the summary as pretty JSON
pub fn write_json(summary: &Summary, path: impl AsRef<Path>) -> MetricsResult<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path.as_ref(), json)?;
    tracing::info!("Wrote summary to {}", path.as_ref().display());
    Ok(())
}
