use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

use netgauge_core::ScenarioResults;

use super::aggregates;

/// One aggregated row per combination. The archival surfaces use the
/// mean-based aggregation path.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    driver: &'a str,
    profile: String,
    same_node: bool,
    host_network: bool,
    service: bool,
    across_az: bool,
    annotation: &'a str,
    duration_secs: u64,
    parallelism: u32,
    samples: u32,
    message_size: u32,
    burst: u32,
    metric: &'a str,
    throughput_avg: Option<f64>,
    latency99_avg_ms: Option<f64>,
    ci95_low: Option<f64>,
    ci95_high: Option<f64>,
    loss_avg: Option<f64>,
    retransmits_avg: Option<f64>,
}

pub(crate) fn write(path: &Path, results: &ScenarioResults) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create csv file: {}", path.display()))?;

    for record in &results.records {
        let agg = aggregates(record);
        let row = CsvRow {
            driver: &record.driver,
            profile: record.config.profile.to_string(),
            same_node: record.same_node,
            host_network: record.host_network,
            service: record.service,
            across_az: record.across_az,
            annotation: &record.annotation,
            duration_secs: record.config.duration_secs,
            parallelism: record.config.parallelism,
            samples: record.config.samples,
            message_size: record.config.message_size,
            burst: record.config.burst,
            metric: &record.metric,
            throughput_avg: agg.map(|a| a.throughput_mean),
            latency99_avg_ms: agg.map(|a| a.latency99_mean_ms),
            ci95_low: agg.map(|a| a.throughput_ci95.0),
            ci95_high: agg.map(|a| a.throughput_ci95.1),
            loss_avg: agg.map(|a| a.loss_mean),
            retransmits_avg: agg.map(|a| a.retransmits_mean),
        };
        writer
            .serialize(row)
            .with_context(|| format!("failed to write csv row: {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush csv file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::one_record_results;

    #[test]
    fn writes_one_row_per_record_with_aggregates() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(err) => panic!("tempdir: {err}"),
        };
        let path = dir.path().join("out.csv");

        let results = one_record_results(&[900.0, 1000.0]);
        match write(&path, &results) {
            Ok(()) => {}
            Err(err) => panic!("write failed: {err:#}"),
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(err) => panic!("read back: {err}"),
        };

        let mut lines = content.lines();
        let header = lines.next().unwrap_or_default();
        assert!(header.starts_with("driver,profile,same_node,host_network"), "header: {header}");
        assert!(header.contains("message_size"));

        let row = lines.next().unwrap_or_default();
        assert!(row.starts_with("netperf,TCP_STREAM,"), "row: {row}");
        // mean of 900 and 1000
        assert!(row.contains("950"), "row: {row}");
    }
}
