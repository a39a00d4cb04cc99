use std::path::Path;

use netgauge_core::regression::RegressionOutcome;
use netgauge_core::results::{ResultRecord, RunMetadata, ScenarioResults};
use netgauge_core::ScenarioConfig;

use super::aggregates;

pub(crate) fn print_header(
    config: &Path,
    metadata: &RunMetadata,
    scenarios: &[ScenarioConfig],
    drivers: &[String],
) {
    println!("netgauge run {}", metadata.uuid);
    println!(
        "config={} platform={} kernel={} mtu={}",
        config.display(),
        dash_if_empty(&metadata.platform),
        dash_if_empty(&metadata.kernel),
        metadata.mtu
    );
    println!("scenarios={} drivers={}", scenarios.len(), drivers.join(","));
}

pub(crate) fn print_results(results: &ScenarioResults) {
    println!();
    println!(
        "driver      | profile                | same | host | svc | az  | dur | par |   size | n |        throughput |         p99 | loss%"
    );
    println!(
        "------------+------------------------+------+------+-----+-----+-----+-----+--------+---+-------------------+-------------+------"
    );

    for record in &results.records {
        println!("{}", result_row(record));
    }

    println!();
    for record in &results.records {
        if let Some(line) = confidence_line(record) {
            println!("{line}");
        }
    }
}

fn result_row(record: &ResultRecord) -> String {
    let cfg = &record.config;
    let profile = if record.annotation.is_empty() {
        cfg.profile.to_string()
    } else {
        format!("{} ({})", cfg.profile, record.annotation)
    };

    // Display surface: median central tendency, robust to single-run tool
    // hiccups.
    let (throughput, latency, loss, count) = match aggregates(record) {
        Some(agg) => (
            format!("{:.2} {}", agg.throughput_median, record.metric),
            format!("{:.2} ms", agg.latency99_median_ms),
            format!("{:.1}", agg.loss_mean),
            record.throughput_summary.len(),
        ),
        None => ("-".to_string(), "-".to_string(), "-".to_string(), 0),
    };

    format!(
        "{:<11} | {:<22} | {:>4} | {:>4} | {:>3} | {:>3} | {:>3} | {:>3} | {:>6} | {} | {:>17} | {:>11} | {:>5}",
        record.driver,
        profile,
        yes_no(record.same_node),
        yes_no(record.host_network),
        yes_no(record.service),
        yes_no(record.across_az),
        cfg.duration_secs,
        cfg.parallelism,
        cfg.message_size,
        count,
        throughput,
        latency,
        loss,
    )
}

fn confidence_line(record: &ResultRecord) -> Option<String> {
    let agg = aggregates(record)?;
    let (lo, hi) = agg.throughput_ci95;

    let mut spread = netgauge_stats::RunningStats::default();
    for &t in &record.throughput_summary {
        spread.push(t);
    }

    Some(format!(
        "ci95 {} {} size={}: {:.2}..{:.2} {} (mean {:.2}, stdev {:.1}%)",
        record.driver,
        record.config.profile,
        record.config.message_size,
        lo,
        hi,
        record.metric,
        agg.throughput_mean,
        spread.stdev_pct(),
    ))
}

pub(crate) fn print_regression(outcome: &RegressionOutcome) {
    println!();
    match outcome {
        RegressionOutcome::Skipped => {
            println!("regression check skipped: no host-network results");
        }
        RegressionOutcome::Checked {
            tolerance_pct,
            findings,
        } => {
            if findings.is_empty() {
                println!(
                    "PASS: host vs pod network throughput within {tolerance_pct}% tolerance"
                );
                return;
            }
            for f in findings {
                println!(
                    "FAIL: regression at message size {}: host={:.2} pod={:.2} diff={:.2}% (tolerance {}%)",
                    f.message_size, f.host_throughput, f.pod_throughput, f.diff_pct, tolerance_pct
                );
            }
        }
    }
}

fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

fn dash_if_empty(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}
