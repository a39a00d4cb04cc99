use serde::Deserialize;

use super::{Driver, utf8};
use crate::config::{Profile, Protocol, ScenarioConfig};
use crate::error::{Error, Result};
use crate::exec::PodExec;
use crate::results::Sample;
use crate::topology::{Pod, TopologyState};

pub(crate) const NAME: &str = "iperf3";

const SERVER_PORT: u16 = 5201;
const REMOTE_LOG: &str = "/tmp/iperf3-result.json";

/// JSON-emitting stream tool. Stream profiles only.
///
/// The invocation is two-phase: the tool writes its JSON document to a
/// remote log file, then a second exec retrieves that file. This works
/// around the tool's own streamed-JSON limitation and stays inside one
/// `run` call.
pub struct Iperf3;

impl Iperf3 {
    fn benchmark_argv(cfg: &ScenarioConfig, server_addr: &str) -> Vec<String> {
        let udp = match cfg.profile.protocol() {
            Protocol::Udp => "-u -b 0 ",
            _ => "",
        };
        let shell = format!(
            "rm -f {REMOTE_LOG} && iperf3 -c {server_addr} -p {SERVER_PORT} -t {} -P {} -l {} {}--json --logfile {REMOTE_LOG}",
            cfg.duration_secs, cfg.parallelism, cfg.message_size, udp,
        );
        vec!["sh".to_string(), "-c".to_string(), shell]
    }

    fn fetch_argv() -> Vec<String> {
        vec!["cat".to_string(), REMOTE_LOG.to_string()]
    }
}

impl Driver for Iperf3 {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_test_supported(&self, profile: Profile) -> bool {
        profile.is_stream()
    }

    fn run(
        &self,
        exec: &dyn PodExec,
        _topo: &TopologyState,
        cfg: &ScenarioConfig,
        client: &Pod,
        server_addr: &str,
    ) -> Result<Vec<u8>> {
        if !self.is_test_supported(cfg.profile) {
            return Err(Error::UnsupportedProfile {
                driver: NAME,
                profile: cfg.profile.to_string(),
            });
        }

        exec.exec(client, &Self::benchmark_argv(cfg, server_addr))?
            .ok_stdout(&client.name)?;

        let document = exec.exec(client, &Self::fetch_argv())?.ok_stdout(&client.name)?;
        Ok(document.into_bytes())
    }

    fn parse_results(&self, raw: &[u8], cfg: &ScenarioConfig) -> Result<Sample> {
        let text = utf8(raw, NAME)?;
        let doc: Document = serde_json::from_str(text)
            .map_err(|err| Error::parse(NAME, format!("invalid JSON document: {err}")))?;

        let (bits_per_second, loss_percent, retransmits) = match cfg.profile.protocol() {
            Protocol::Udp => {
                let sum = doc
                    .end
                    .sum
                    .ok_or_else(|| Error::parse(NAME, "missing end.sum for UDP result"))?;
                (sum.bits_per_second, sum.lost_percent, 0.0)
            }
            _ => {
                let received = doc.end.sum_received.ok_or_else(|| {
                    Error::parse(NAME, "missing end.sum_received for TCP result")
                })?;
                let retransmits = doc
                    .end
                    .sum_sent
                    .and_then(|s| s.retransmits)
                    .unwrap_or(0.0);
                (received.bits_per_second, 0.0, retransmits)
            }
        };

        Ok(Sample {
            driver: NAME.to_string(),
            metric: "Mb/s".to_string(),
            throughput: bits_per_second / 1_000_000.0,
            latency99_ms: 0.0,
            latency_mean_ms: 0.0,
            loss_percent,
            retransmits,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Document {
    end: End,
}

#[derive(Debug, Deserialize)]
struct End {
    sum_received: Option<SumReceived>,
    sum_sent: Option<SumSent>,
    sum: Option<SumUdp>,
}

#[derive(Debug, Deserialize)]
struct SumReceived {
    bits_per_second: f64,
}

#[derive(Debug, Deserialize)]
struct SumSent {
    retransmits: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SumUdp {
    bits_per_second: f64,
    #[serde(default)]
    lost_percent: f64,
}
