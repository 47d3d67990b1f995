use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{StatsFilter, Subject};
use crate::stats::correlation::Correlation;
use crate::stats::StatsResult;

const STRONGEST_LINKS: usize = 3;

/// Off-diagonal cells from the upper triangle, strongest first.
pub fn strongest_links(correlations: &[Correlation], limit: usize) -> Vec<&Correlation> {
    let position = |label: &str| Subject::ALL.iter().position(|s| s.label() == label);
    let mut links: Vec<&Correlation> = correlations
        .iter()
        .filter(|cell| position(cell.x) < position(cell.y))
        .collect();
    links.sort_by(|a, b| b.value.abs().total_cmp(&a.value.abs()));
    links.truncate(limit);
    links
}

pub fn build_report(
    filter: &StatsFilter,
    stats: &StatsResult,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Score Atlas Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        filter.describe(),
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);

    if stats.count == 0 {
        let _ = writeln!(output, "No students match this filter.");
        return output;
    }

    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Students: {}", stats.count);
    let _ = writeln!(
        output,
        "- Total: avg {:.2}, max {}, min {}",
        stats.avg_total, stats.max_total, stats.min_total
    );
    let _ = writeln!(output, "- Excellent rate: {:.1}%", stats.excellent_rate);
    let _ = writeln!(output, "- Qualified rate: {:.1}%", stats.qualified_rate);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Segments");
    for segment in &stats.segments {
        let _ = writeln!(output, "- {}: {}", segment.label, segment.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Total Distribution");
    for bin in &stats.histogram {
        let _ = writeln!(output, "- {}: {}", bin.label, bin.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Subjects");
    let _ = writeln!(output, "| Subject | Avg | Min | Q1 | Median | Q3 | Max |");
    let _ = writeln!(output, "|---|---|---|---|---|---|---|");
    for (average, plot) in stats.subject_averages.iter().zip(&stats.box_plots) {
        let s = plot.summary;
        let _ = writeln!(
            output,
            "| {} (/{}) | {:.2} | {} | {} | {} | {} | {} |",
            average.label, average.max, average.avg, s.min, s.q1, s.median, s.q3, s.max
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Strongest Subject Links");
    let links = strongest_links(&stats.correlations, STRONGEST_LINKS);
    if links.iter().all(|cell| cell.value == 0.0) {
        let _ = writeln!(output, "Not enough variation to correlate subjects.");
    } else {
        for cell in links {
            let _ = writeln!(output, "- {} / {}: r = {:.4}", cell.x, cell.y, cell.value);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Students");
    for (rank, record) in stats.top10.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {} (total {})",
            rank + 1,
            record.name,
            record.total()
        );
    }

    output
}
