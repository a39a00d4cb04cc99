//! Host-network vs pod-network throughput regression check.
//!
//! Restricted to the single-stream TCP stream profile in non-service mode:
//! that is the combination where host and pod network results measure the
//! same path and differ only by the network namespace boundary.

use std::collections::BTreeSet;

use crate::config::Profile;
use crate::error::{Error, Result};
use crate::results::{ResultRecord, ScenarioResults};

pub const DEFAULT_TOLERANCE_PCT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionFinding {
    pub message_size: u32,
    pub host_throughput: f64,
    pub pod_throughput: f64,
    /// Percent difference: `(host - pod) / ((host + pod) / 2) * 100`.
    pub diff_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegressionOutcome {
    /// No host-network results in the run; the check does not apply.
    Skipped,
    Checked {
        tolerance_pct: f64,
        findings: Vec<RegressionFinding>,
    },
}

impl RegressionOutcome {
    pub fn flagged(&self) -> bool {
        matches!(self, Self::Checked { findings, .. } if !findings.is_empty())
    }
}

/// Compare mean host-network and pod-network throughput per message size
/// and flag differences beyond `tolerance_pct`.
pub fn check(results: &ScenarioResults, tolerance_pct: f64) -> Result<RegressionOutcome> {
    let eligible: Vec<&ResultRecord> = results
        .records
        .iter()
        .filter(|r| {
            r.config.profile == Profile::TcpStream
                && r.config.parallelism == 1
                && !r.config.service
                && r.has_data()
        })
        .collect();

    let host: Vec<&&ResultRecord> = eligible.iter().filter(|r| r.host_network).collect();
    if host.is_empty() {
        return Ok(RegressionOutcome::Skipped);
    }

    let mut findings = Vec::new();
    let sizes: BTreeSet<u32> = host.iter().map(|r| r.config.message_size).collect();

    for size in sizes {
        let host_throughput = mean_throughput(&eligible, size, true);
        let pod_throughput = mean_throughput(&eligible, size, false);

        let (Some(host_throughput), Some(pod_throughput)) = (host_throughput, pod_throughput)
        else {
            continue;
        };

        let midpoint = (host_throughput + pod_throughput) / 2.0;
        if midpoint <= 0.0 {
            return Err(Error::Regression(format!(
                "mean throughput is zero at message size {size}"
            )));
        }

        let diff_pct = (host_throughput - pod_throughput) / midpoint * 100.0;
        if diff_pct > tolerance_pct {
            findings.push(RegressionFinding {
                message_size: size,
                host_throughput,
                pod_throughput,
                diff_pct,
            });
        }
    }

    Ok(RegressionOutcome::Checked {
        tolerance_pct,
        findings,
    })
}

fn mean_throughput(records: &[&ResultRecord], size: u32, host_network: bool) -> Option<f64> {
    let samples: Vec<f64> = records
        .iter()
        .filter(|r| r.config.message_size == size && r.host_network == host_network)
        .flat_map(|r| r.throughput_summary.iter().copied())
        .collect();
    netgauge_stats::mean(&samples)
}
