use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use netgauge_core::UdnMode;

fn parse_udn_mode(input: &str) -> Result<UdnMode, String> {
    match input.trim() {
        "layer2" | "l2" => Ok(UdnMode::Layer2),
        "layer3" | "l3" => Ok(UdnMode::Layer3),
        other => Err(format!("invalid udn mode `{other}` (expected layer2 or layer3)")),
    }
}

fn parse_tolerance(input: &str) -> Result<f64, String> {
    let value: f64 = input
        .parse()
        .map_err(|_| format!("invalid tolerance `{input}` (expected a percentage)"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("tolerance must be >= 0 (got {input})"));
    }
    Ok(value)
}

fn parse_retries(input: &str) -> Result<u32, String> {
    let value: u32 = input
        .parse()
        .map_err(|_| format!("invalid retries `{input}` (expected a positive integer)"))?;
    if value == 0 {
        return Err("retries must be > 0".to_string());
    }
    Ok(value)
}

#[derive(Debug, Parser)]
#[command(
    name = "netgauge",
    author,
    version,
    about = "Cluster network performance benchmark engine",
    long_about = "netgauge drives benchmark tools (netperf, iperf3, uperf, ib_write_bw) between provisioned client/server workloads under a chosen network topology, aggregates repeated samples, and flags host-network vs pod-network throughput regressions.\n\nProvisioning is external: the topology manifest lists the ready pods, their addresses and annotations, and any per-driver service addresses. netgauge only executes benchmarks against them.",
    after_help = "Examples:\n  netgauge run scenarios.yaml --topology topology.yaml\n  netgauge run scenarios.yaml --topology topology.yaml --driver netperf --driver iperf3\n  netgauge run scenarios.yaml --topology topology.yaml --host-network --tolerance 5\n  netgauge run scenarios.yaml --topology topology.yaml --udn layer2 --vm --vm-binding l2bridge\n  netgauge run scenarios.yaml --topology topology.yaml --csv out.csv --json out.json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the benchmark scenarios from a config file
    #[command(
        long_about = "Run every scenario x network-mode x driver combination from the scenario config against the workloads in the topology manifest, then aggregate and check for regressions."
    )]
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the scenario config (.yaml)
    pub config: PathBuf,

    /// Topology manifest describing the provisioned pods and services
    #[arg(long)]
    pub topology: PathBuf,

    /// Benchmark driver to run (repeatable). Unknown names fall back to
    /// netperf.
    #[arg(long = "driver", value_name = "NAME", default_values_t = [String::from("netperf")])]
    pub drivers: Vec<String>,

    /// Client and server run on the same node
    #[arg(long)]
    pub local: bool,

    /// Additionally run every combination against the host-network
    /// workload variants
    #[arg(long)]
    pub host_network: bool,

    /// Client and server are placed in different availability zones
    #[arg(long)]
    pub across_az: bool,

    /// Workloads are virtual machines instead of containers
    #[arg(long)]
    pub vm: bool,

    /// Network binding mode label for VM workloads on a user-defined
    /// network
    #[arg(long, value_name = "MODE")]
    pub vm_binding: Option<String>,

    /// Primary user-defined network mode (layer2 | layer3)
    #[arg(long, value_name = "MODE", value_parser = parse_udn_mode)]
    pub udn: Option<UdnMode>,

    /// Cluster-scoped user-defined network name (secondary role)
    #[arg(long, value_name = "NAME")]
    pub cudn: Option<String>,

    /// Interface name of a bridged secondary network
    #[arg(long, value_name = "INTERFACE")]
    pub bridge: Option<String>,

    /// Static bridge server address (CIDR) for VM workloads
    #[arg(long, value_name = "CIDR")]
    pub bridge_address: Option<String>,

    /// Fixed server address outside the cluster
    #[arg(long, value_name = "ADDR")]
    pub external_server: Option<String>,

    /// RDMA device for ib_write_bw (device:gid-index, e.g. mlx5_0:3)
    #[arg(long, value_name = "DEVICE:GID")]
    pub rdma_device: Option<String>,

    /// Attempts per sample before the run is aborted
    #[arg(long, value_parser = parse_retries, default_value_t = netgauge_core::runner::DEFAULT_RETRY_BUDGET)]
    pub retries: u32,

    /// Host vs pod network regression tolerance, percent
    #[arg(long, value_parser = parse_tolerance, default_value_t = netgauge_core::regression::DEFAULT_TOLERANCE_PCT)]
    pub tolerance: f64,

    /// Timeout for a single remote command (e.g. 120s, 5m)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "120s")]
    pub exec_timeout: Duration,

    /// kubectl binary used for remote execution
    #[arg(long, default_value = "kubectl")]
    pub kubectl: PathBuf,

    /// Kubeconfig passed to kubectl
    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<PathBuf>,

    /// Write one aggregated row per combination to a CSV file
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Write the full result document set to a JSON file
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,
}
