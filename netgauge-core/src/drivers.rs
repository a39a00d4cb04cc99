//! Benchmark tool adapters. Each driver builds its tool's invocation,
//! executes it against a resolved endpoint through [`PodExec`], and parses
//! the raw output into a [`Sample`].

use crate::config::{Profile, ScenarioConfig};
use crate::error::{Error, Result};
use crate::exec::PodExec;
use crate::results::Sample;
use crate::topology::{Pod, TopologyState};

mod ib_write_bw;
mod iperf3;
mod netperf;
mod uperf;

pub use ib_write_bw::IbWriteBw;
pub use iperf3::Iperf3;
pub use netperf::Netperf;
pub use uperf::Uperf;

/// The three-operation benchmark tool contract. Callers check
/// [`Driver::is_test_supported`] before [`Driver::run`]; retry policy
/// lives in the execution loop, never here.
pub trait Driver {
    fn name(&self) -> &'static str;

    /// Whether the driver can execute the given profile at all.
    fn is_test_supported(&self, profile: Profile) -> bool;

    /// Whether the driver can run against VM workloads.
    fn runs_in_vm(&self) -> bool {
        true
    }

    /// Execute one benchmark invocation on `client` against `server_addr`
    /// and return the tool's raw output.
    fn run(
        &self,
        exec: &dyn PodExec,
        topo: &TopologyState,
        cfg: &ScenarioConfig,
        client: &Pod,
        server_addr: &str,
    ) -> Result<Vec<u8>>;

    /// Parse one invocation's raw output into a sample.
    fn parse_results(&self, raw: &[u8], cfg: &ScenarioConfig) -> Result<Sample>;
}

/// Map a driver name to its implementation. Unknown names deliberately
/// fall back to netperf.
pub fn driver_for(name: &str) -> Box<dyn Driver> {
    match name {
        iperf3::NAME => Box::new(Iperf3),
        uperf::NAME => Box::new(Uperf),
        ib_write_bw::NAME => Box::new(IbWriteBw),
        _ => Box::new(Netperf),
    }
}

pub fn known_drivers() -> [&'static str; 4] {
    [netperf::NAME, iperf3::NAME, uperf::NAME, ib_write_bw::NAME]
}

fn utf8<'a>(raw: &'a [u8], driver: &'static str) -> Result<&'a str> {
    std::str::from_utf8(raw).map_err(|_| Error::parse(driver, "output is not valid UTF-8"))
}
