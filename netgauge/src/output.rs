pub(crate) mod csv;
pub(crate) mod human;
pub(crate) mod json;

use netgauge_core::ResultRecord;

/// Aggregates over one record's sample lists. Display surfaces report the
/// median columns; the archival surfaces (CSV/JSON) report the mean.
/// `None` for a record with no throughput data (unsupported-test
/// short-circuit).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Aggregates {
    pub throughput_mean: f64,
    pub throughput_median: f64,
    pub throughput_ci95: (f64, f64),
    pub latency99_mean_ms: f64,
    pub latency99_median_ms: f64,
    pub loss_mean: f64,
    pub retransmits_mean: f64,
}

pub(crate) fn aggregates(record: &ResultRecord) -> Option<Aggregates> {
    Some(Aggregates {
        throughput_mean: netgauge_stats::mean(&record.throughput_summary)?,
        throughput_median: netgauge_stats::median(&record.throughput_summary)?,
        throughput_ci95: netgauge_stats::confidence_interval_95(&record.throughput_summary)?,
        latency99_mean_ms: netgauge_stats::mean(&record.latency99_summary)?,
        latency99_median_ms: netgauge_stats::median(&record.latency99_summary)?,
        loss_mean: netgauge_stats::mean(&record.loss_summary)?,
        retransmits_mean: netgauge_stats::mean(&record.retransmit_summary)?,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use netgauge_core::{Profile, ResultRecord, RunMetadata, Sample, ScenarioConfig, ScenarioResults};
    use uuid::Uuid;

    pub(crate) fn record_with_samples(throughputs: &[f64]) -> ResultRecord {
        let cfg = ScenarioConfig {
            profile: Profile::TcpStream,
            duration_secs: 10,
            samples: throughputs.len() as u32,
            message_size: 1024,
            parallelism: 1,
            burst: 0,
            service: false,
        };
        let mut record = ResultRecord::new(cfg, "netperf");
        for &t in throughputs {
            record.append(&Sample {
                driver: "netperf".to_string(),
                metric: "Mb/s".to_string(),
                throughput: t,
                latency99_ms: 45.0,
                latency_mean_ms: 12.0,
                loss_percent: 0.0,
                retransmits: 2.0,
            });
        }
        record
    }

    pub(crate) fn one_record_results(throughputs: &[f64]) -> ScenarioResults {
        let mut results = ScenarioResults::new(RunMetadata {
            uuid: Uuid::nil(),
            platform: "kind".to_string(),
            kernel: "6.6.0".to_string(),
            version: "v1.30.0".to_string(),
            mtu: 1500,
        });
        results.push(record_with_samples(throughputs));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregates_use_both_central_tendencies() {
        let record = testing::record_with_samples(&[900.0, 1000.0, 950.0]);
        let agg = match aggregates(&record) {
            Some(a) => a,
            None => panic!("record has data"),
        };

        assert!((agg.throughput_mean - 950.0).abs() < 1e-9);
        assert!((agg.throughput_median - 950.0).abs() < 1e-9);
        assert_eq!(agg.latency99_median_ms, 45.0);
        assert_eq!(agg.retransmits_mean, 2.0);
        assert!(agg.throughput_ci95.0 < 950.0 && 950.0 < agg.throughput_ci95.1);
    }

    #[test]
    fn empty_record_has_no_aggregates() {
        let record = testing::record_with_samples(&[]);
        assert!(aggregates(&record).is_none());
    }
}
