//! Output formatting for CLI

use olist_dw_core::clean::CleanStats;
use olist_dw_core::quality::QualityReport;
use olist_dw_core::warehouse::LoadStats;

/// Print one line per cleaned entity
pub fn print_clean_stats(stats: &[CleanStats]) {
    if stats.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<14} {:>10} {:>10} {:>10} {:>8}",
        "Entity", "Read", "Rejected", "Written", "Time"
    );
    println!("{}", "-".repeat(56));
    for s in stats {
        println!(
            "{:<14} {:>10} {:>10} {:>10} {:>8}",
            s.entity.name(),
            s.rows_read,
            s.rows_rejected,
            s.rows_written(),
            s.duration_string()
        );
        for output in &s.outputs {
            println!("    {} ({} rows, sha256 {})", output.path, output.rows, short_hash(&output.sha256));
        }
    }
}

/// Print one line per loaded warehouse table
pub fn print_load_stats(loads: &[LoadStats]) {
    if loads.is_empty() {
        return;
    }
    println!();
    println!(
        "{:<18} {:>10} {:>10} {:>10} {:>11}",
        "Table", "Rows in", "Written", "Skipped", "Unresolved"
    );
    println!("{}", "-".repeat(63));
    for load in loads {
        println!(
            "{:<18} {:>10} {:>10} {:>10} {:>11}",
            load.table, load.rows_in, load.rows_written, load.rows_skipped, load.unresolved_keys
        );
    }
}

/// Print the quality report as a table, failed checks with their samples
pub fn print_quality_report(report: &QualityReport) {
    println!();
    println!("Data Quality Report");
    println!("===================");
    for result in &report.results {
        let coverage = result
            .coverage_rate
            .map(|rate| format!(" coverage {rate:.2}%"))
            .unwrap_or_default();
        println!(
            "  [{}] {:<24} {:<16} {} violation(s){}",
            result.status, result.check_name, result.table_name, result.violation_count, coverage
        );
        if !result.passed() && !result.sample_violations.is_empty() {
            println!("         samples: {}", result.sample_violations.join(", "));
        }
    }

    let failed = report.failed().count();
    println!();
    println!(
        "{} passed, {} failed",
        report.results.len() - failed,
        failed
    );
}

/// Print the quality report as pretty JSON
pub fn print_quality_json(report: &QualityReport) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
