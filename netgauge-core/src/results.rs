use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::ScenarioConfig;
use crate::metrics::{CpuStat, PodConsumption};

/// One benchmark tool invocation's numeric outcome. Immutable once parsed;
/// repeated samples are appended to a [`ResultRecord`], never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub driver: String,
    /// Unit the throughput value is reported in (`Mb/s`, `OP/s`, `Gb/s`).
    pub metric: String,
    pub throughput: f64,
    pub latency99_ms: f64,
    pub latency_mean_ms: f64,
    pub loss_percent: f64,
    pub retransmits: f64,
}

/// Aggregated record of all samples for one scenario x network-mode x
/// driver combination. Appended to by the execution loop that owns it;
/// read-only afterwards except for metric attachment.
#[derive(Debug, Clone)]
pub struct ResultRecord {
    pub config: ScenarioConfig,
    pub driver: String,
    pub metric: String,

    // Topology flags actually used for this combination.
    pub same_node: bool,
    pub host_network: bool,
    pub service: bool,
    pub across_az: bool,
    /// Network annotation (udn/bridge/external label), empty for the
    /// default pod network.
    pub annotation: String,

    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    // Parallel per-sample value lists.
    pub throughput_summary: Vec<f64>,
    pub latency99_summary: Vec<f64>,
    pub latency_mean_summary: Vec<f64>,
    pub loss_summary: Vec<f64>,
    pub retransmit_summary: Vec<f64>,

    // Attached by the external metrics collaborator.
    pub client_cpu: Option<CpuStat>,
    pub server_cpu: Option<CpuStat>,
    pub top_pod_cpu: Vec<PodConsumption>,
    pub top_pod_memory: Vec<PodConsumption>,
}

impl ResultRecord {
    pub fn new(config: ScenarioConfig, driver: &str) -> Self {
        let now = Utc::now();
        Self {
            config,
            driver: driver.to_string(),
            metric: config.profile.metric_unit().to_string(),
            same_node: false,
            host_network: false,
            service: config.service,
            across_az: false,
            annotation: String::new(),
            start: now,
            end: now,
            throughput_summary: Vec::new(),
            latency99_summary: Vec::new(),
            latency_mean_summary: Vec::new(),
            loss_summary: Vec::new(),
            retransmit_summary: Vec::new(),
            client_cpu: None,
            server_cpu: None,
            top_pod_cpu: Vec::new(),
            top_pod_memory: Vec::new(),
        }
    }

    pub fn append(&mut self, sample: &Sample) {
        if !sample.metric.is_empty() {
            self.metric = sample.metric.clone();
        }
        self.throughput_summary.push(sample.throughput);
        self.latency99_summary.push(sample.latency99_ms);
        self.latency_mean_summary.push(sample.latency_mean_ms);
        self.loss_summary.push(sample.loss_percent);
        self.retransmit_summary.push(sample.retransmits);
    }

    /// A populated record has throughput data; an unsupported-test
    /// short-circuit leaves it empty.
    pub fn has_data(&self) -> bool {
        !self.throughput_summary.is_empty()
    }

    pub fn attach_cpu(&mut self, client: Option<CpuStat>, server: Option<CpuStat>) {
        self.client_cpu = client;
        self.server_cpu = server;
    }

    pub fn attach_top_pods(&mut self, cpu: Vec<PodConsumption>, memory: Vec<PodConsumption>) {
        self.top_pod_cpu = cpu;
        self.top_pod_memory = memory;
    }
}

/// Run-level metadata attached to the full result set.
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub uuid: Uuid,
    pub platform: String,
    pub kernel: String,
    pub version: String,
    pub mtu: u32,
}

/// The full run's output: one record per completed combination, in
/// execution order.
#[derive(Debug)]
pub struct ScenarioResults {
    pub metadata: RunMetadata,
    pub records: Vec<ResultRecord>,
}

impl ScenarioResults {
    pub fn new(metadata: RunMetadata) -> Self {
        Self {
            metadata,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: ResultRecord) {
        self.records.push(record);
    }
}
