//! Benchmark execution and results engine.
//!
//! Resolves, per test scenario and network mode, which endpoint and client
//! pod set to use; drives a benchmark tool through a uniform contract to
//! produce raw samples; retries transient failures; aggregates repeated
//! samples into per-combination result records and checks host-network vs
//! pod-network throughput for regressions.
//!
//! Cluster provisioning and metrics collection are external collaborators:
//! the engine consumes ready pod sets and resolved addresses, and only
//! attaches pre-fetched metric structs to its records.

pub mod config;
pub mod drivers;
pub mod error;
pub mod exec;
pub mod metrics;
pub mod regression;
pub mod resolver;
pub mod results;
pub mod runner;
pub mod topology;

pub use config::{ConfigError, Profile, Protocol, ScenarioConfig};
pub use error::{Error, Result};
pub use results::{ResultRecord, RunMetadata, Sample, ScenarioResults};
pub use topology::{
    BridgeConfig, Pod, PodSets, RdmaDevice, RolePods, TopologyState, UdnMode,
};
