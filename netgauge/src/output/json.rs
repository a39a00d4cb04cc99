use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

use netgauge_core::ScenarioResults;

use super::aggregates;

/// One export document per combination, carrying the run identity, the
/// combination keys, the mean-based aggregates and the raw per-sample
/// lists.
#[derive(Debug, Serialize)]
struct JsonDoc<'a> {
    uuid: String,
    timestamp: String,
    platform: &'a str,
    kernel: &'a str,
    version: &'a str,
    mtu: u32,

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

    throughput_samples: &'a [f64],
    latency99_samples_ms: &'a [f64],
    loss_samples: &'a [f64],
    retransmit_samples: &'a [f64],
}

pub(crate) fn write(path: &Path, results: &ScenarioResults) -> anyhow::Result<()> {
    let meta = &results.metadata;
    let docs: Vec<JsonDoc<'_>> = results
        .records
        .iter()
        .map(|record| {
            let agg = aggregates(record);
            JsonDoc {
                uuid: meta.uuid.to_string(),
                timestamp: record.end.to_rfc3339(),
                platform: &meta.platform,
                kernel: &meta.kernel,
                version: &meta.version,
                mtu: meta.mtu,
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
                throughput_samples: &record.throughput_summary,
                latency99_samples_ms: &record.latency99_summary,
                loss_samples: &record.loss_summary,
                retransmit_samples: &record.retransmit_summary,
            }
        })
        .collect();

    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create json file: {}", path.display()))?;
    serde_json::to_writer_pretty(file, &docs)
        .with_context(|| format!("failed to write json documents: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::one_record_results;
    use serde_json::Value;

    #[test]
    fn documents_carry_identity_and_samples() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(err) => panic!("tempdir: {err}"),
        };
        let path = dir.path().join("out.json");

        let results = one_record_results(&[900.0, 1000.0]);
        match write(&path, &results) {
            Ok(()) => {}
            Err(err) => panic!("write failed: {err:#}"),
        }

        let raw = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(err) => panic!("read back: {err}"),
        };
        let docs: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(err) => panic!("invalid json written: {err}"),
        };

        assert_eq!(docs.as_array().map(Vec::len), Some(1));
        let doc = &docs[0];
        assert_eq!(
            doc.get("uuid").and_then(Value::as_str),
            Some("00000000-0000-0000-0000-000000000000")
        );
        assert_eq!(doc.get("profile").and_then(Value::as_str), Some("TCP_STREAM"));
        assert_eq!(doc.get("throughput_avg").and_then(Value::as_f64), Some(950.0));
        assert_eq!(
            doc.pointer("/throughput_samples/1").and_then(Value::as_f64),
            Some(1000.0)
        );
        assert!(doc.get("timestamp").and_then(Value::as_str).is_some());
    }
}
