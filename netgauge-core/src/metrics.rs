use chrono::{DateTime, Utc};
use serde::Serialize;

/// Node CPU busy breakdown over a result's sample window, as percentages.
/// Filled in by the external metrics collaborator; the engine only attaches
/// it to result records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuStat {
    pub idle: f64,
    pub user: f64,
    pub system: f64,
    pub steal: f64,
    pub softirq: f64,
    pub irq: f64,
    pub iowait: f64,
}

/// One entry of a top-N pod CPU or memory consumer list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodConsumption {
    pub pod: String,
    pub value: f64,
}

/// Time window a result's samples were collected in.
pub type Window = (DateTime<Utc>, DateTime<Utc>);

/// Seam to the external metrics backend. Implementations query a
/// time-series store for the given node and window; the engine never does.
pub trait MetricsSource {
    fn node_cpu(&self, node: &str, window: Window) -> Option<CpuStat>;
    fn top_pod_cpu(&self, node: &str, window: Window) -> Vec<PodConsumption>;
    fn top_pod_memory(&self, node: &str, window: Window) -> Vec<PodConsumption>;
}
