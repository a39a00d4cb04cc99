//! The execution loop: drives one driver through N samples against a
//! resolved endpoint, with bounded retry on run and parse failures.
//!
//! Scheduling is strictly sequential: scenarios, network modes, and
//! drivers iterate in nested loops, and sample `i` completes before sample
//! `i + 1` starts. A retry budget exhausted anywhere aborts the entire run.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::ScenarioConfig;
use crate::drivers::{self, Driver};
use crate::error::{Error, Result};
use crate::exec::{self, PodExec};
use crate::metrics::MetricsSource;
use crate::resolver::{self, ResolvedEndpoint};
use crate::results::{ResultRecord, RunMetadata, Sample, ScenarioResults};
use crate::topology::{Pod, TopologyState};

/// Attempts per sample before the run is declared failed. Run errors and
/// parse errors draw from the same budget.
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

const READY_DEADLINE: Duration = Duration::from_secs(60);
const READY_INTERVAL: Duration = Duration::from_secs(2);

/// Everything one combination needs, threaded explicitly instead of held
/// as ambient state.
pub struct RunContext<'a> {
    pub exec: &'a dyn PodExec,
    pub topology: &'a TopologyState,
    pub retry_budget: u32,
    pub metrics: Option<&'a dyn MetricsSource>,
}

/// Run every scenario x network-mode x driver combination, in order.
///
/// The host-network mode is appended per scenario when the topology
/// requests it. Any fatal error aborts the remaining combinations.
pub fn run_all(
    exec: &dyn PodExec,
    topology: &TopologyState,
    scenarios: &[ScenarioConfig],
    driver_names: &[String],
    retry_budget: u32,
    metrics: Option<&dyn MetricsSource>,
    metadata: RunMetadata,
) -> Result<ScenarioResults> {
    let mut results = ScenarioResults::new(metadata);

    let mut modes = vec![false];
    if topology.host_network {
        modes.push(true);
    }

    for cfg in scenarios {
        for &host_network in &modes {
            let topo_mode = topology.with_host_network(host_network);
            for name in driver_names {
                let driver = drivers::driver_for(name);
                let ctx = RunContext {
                    exec,
                    topology: &topo_mode,
                    retry_budget,
                    metrics,
                };
                let record = run_combination(&ctx, driver.as_ref(), cfg)?;
                results.push(record);
            }
        }
    }

    Ok(results)
}

/// Execute one (scenario, network-mode, driver) combination.
///
/// An unsupported profile short-circuits to an empty record before any
/// sample is attempted; that is not an error.
pub fn run_combination(
    ctx: &RunContext<'_>,
    driver: &dyn Driver,
    cfg: &ScenarioConfig,
) -> Result<ResultRecord> {
    cfg.validate().map_err(Error::from)?;

    let topo = ctx.topology;
    let mut record = ResultRecord::new(*cfg, driver.name());
    record.same_node = topo.node_local;
    record.host_network = topo.host_network;
    record.across_az = topo.across_az;

    if !driver.is_test_supported(cfg.profile) {
        info!(
            driver = driver.name(),
            profile = %cfg.profile,
            "test not supported, skipping combination"
        );
        return Ok(record);
    }

    let resolved = resolver::resolve(topo, cfg, driver.name())?;
    record.annotation = resolved.annotation.clone();

    let client = first_client(&resolved)?;
    exec::wait_ready(ctx.exec, client, READY_DEADLINE, READY_INTERVAL)?;

    info!(
        driver = driver.name(),
        profile = %cfg.profile,
        server = %resolved.server_addr,
        client = %client.name,
        host_network = topo.host_network,
        "running scenario"
    );

    record.start = Utc::now();

    if topo.vm && !driver.runs_in_vm() {
        warn!(
            driver = driver.name(),
            "driver cannot execute against VM workloads, recording empty sample"
        );
        record.append(&Sample {
            driver: driver.name().to_string(),
            ..Sample::default()
        });
    } else {
        for sample_idx in 0..cfg.samples {
            let sample = sample_with_retry(ctx, driver, cfg, client, &resolved, sample_idx)?;
            record.append(&sample);
        }
    }

    record.end = Utc::now();

    if let Some(metrics) = ctx.metrics {
        let window = (record.start, record.end);
        record.attach_cpu(
            metrics.node_cpu(&topo.client_node, window),
            metrics.node_cpu(&topo.server_node, window),
        );
        record.attach_top_pods(
            metrics.top_pod_cpu(&topo.server_node, window),
            metrics.top_pod_memory(&topo.server_node, window),
        );
    }

    Ok(record)
}

fn sample_with_retry(
    ctx: &RunContext<'_>,
    driver: &dyn Driver,
    cfg: &ScenarioConfig,
    client: &Pod,
    resolved: &ResolvedEndpoint,
    sample_idx: u32,
) -> Result<Sample> {
    let mut last: Option<Error> = None;

    for attempt in 1..=ctx.retry_budget {
        let outcome = driver
            .run(ctx.exec, ctx.topology, cfg, client, &resolved.server_addr)
            .and_then(|raw| driver.parse_results(&raw, cfg));

        match outcome {
            Ok(sample) => {
                debug!(
                    driver = driver.name(),
                    sample = sample_idx,
                    attempt,
                    throughput = sample.throughput,
                    "sample accepted"
                );
                return Ok(sample);
            }
            Err(err) => {
                warn!(
                    driver = driver.name(),
                    sample = sample_idx,
                    attempt,
                    budget = ctx.retry_budget,
                    %err,
                    "sample attempt failed"
                );
                last = Some(err);
            }
        }
    }

    Err(Error::RetriesExhausted {
        driver: driver.name().to_string(),
        attempts: ctx.retry_budget,
        last: last.map(|err| err.to_string()).unwrap_or_default(),
    })
}

fn first_client(resolved: &ResolvedEndpoint) -> Result<&Pod> {
    resolved
        .client_pods
        .first()
        .ok_or(Error::EmptyPodSet { role: "client" })
}
