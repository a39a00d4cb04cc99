use super::{Driver, utf8};
use crate::config::{Profile, ScenarioConfig};
use crate::error::{Error, Result};
use crate::exec::PodExec;
use crate::results::Sample;
use crate::topology::{Pod, TopologyState};

pub(crate) const NAME: &str = "uperf";

const SERVER_PORT: u16 = 30000;
const REMOTE_PROFILE: &str = "/tmp/uperf-workload.xml";

/// Profile-file tool: the workload is described by an XML document written
/// to the client pod before the run. Everything except the
/// connect-per-request TCP variant is supported.
pub struct Uperf;

impl Uperf {
    /// XML workload descriptor for one scenario, parameterized by message
    /// size, parallelism, duration, protocol and the resolved server port.
    fn workload_xml(cfg: &ScenarioConfig, server_addr: &str) -> String {
        let proto = cfg.profile.protocol();
        let size = cfg.message_size;
        let duration = cfg.duration_secs;
        let nprocs = cfg.parallelism;

        let body = if cfg.profile.is_stream() {
            format!(
                r#"    <transaction duration="{duration}s">
      <flowop type="write" options="count=16 size={size}"/>
    </transaction>"#
            )
        } else {
            format!(
                r#"    <transaction duration="{duration}s">
      <flowop type="write" options="size={size}"/>
      <flowop type="read" options="size={size}"/>
    </transaction>"#
            )
        };

        format!(
            r#"<?xml version="1.0"?>
<profile name="netgauge-{profile}">
  <group nprocs="{nprocs}">
    <transaction iterations="1">
      <flowop type="connect" options="remotehost={server_addr} protocol={proto} port={port}"/>
    </transaction>
{body}
    <transaction iterations="1">
      <flowop type="disconnect"/>
    </transaction>
  </group>
</profile>
"#,
            profile = cfg.profile,
            port = SERVER_PORT,
        )
    }

    fn write_profile_argv(cfg: &ScenarioConfig, server_addr: &str) -> Vec<String> {
        let xml = Self::workload_xml(cfg, server_addr);
        vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("cat > {REMOTE_PROFILE} <<'EOF'\n{xml}EOF\n"),
        ]
    }

    fn benchmark_argv() -> Vec<String> {
        vec![
            NAME.to_string(),
            "-v".to_string(),
            "-a".to_string(),
            "-R".to_string(),
            "-i".to_string(),
            "1".to_string(),
            "-m".to_string(),
            REMOTE_PROFILE.to_string(),
        ]
    }
}

impl Driver for Uperf {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_test_supported(&self, profile: Profile) -> bool {
        profile != Profile::TcpCrr
    }

    fn run(
        &self,
        exec: &dyn PodExec,
        _topo: &TopologyState,
        cfg: &ScenarioConfig,
        client: &Pod,
        server_addr: &str,
    ) -> Result<Vec<u8>> {
        exec.exec(client, &Self::write_profile_argv(cfg, server_addr))?
            .ok_stdout(&client.name)?;

        let out = exec.exec(client, &Self::benchmark_argv())?.ok_stdout(&client.name)?;
        Ok(out.into_bytes())
    }

    /// Scans the repeated `Txn2` timestamp/byte/op-count lines, derives
    /// per-interval deltas, and reports mean throughput plus the 99th
    /// percentile of the per-interval per-operation latency.
    fn parse_results(&self, raw: &[u8], cfg: &ScenarioConfig) -> Result<Sample> {
        let text = utf8(raw, NAME)?;

        let mut points: Vec<TxnPoint> = Vec::new();
        for line in text.lines() {
            if let Some(point) = TxnPoint::from_line(line) {
                points.push(point);
            }
        }

        let mut throughputs: Vec<f64> = Vec::new();
        let mut latencies_ms: Vec<f64> = Vec::new();
        for pair in points.windows(2) {
            let dt_ms = pair[1].timestamp_ms - pair[0].timestamp_ms;
            if dt_ms <= 0.0 {
                continue;
            }

            let d_bytes = pair[1].bytes.saturating_sub(pair[0].bytes);
            let d_ops = pair[1].ops.saturating_sub(pair[0].ops);

            throughputs.push(d_bytes as f64 * 8.0 / 1_000_000.0 / (dt_ms / 1000.0));
            if d_ops > 0 {
                latencies_ms.push(dt_ms / d_ops as f64);
            }
        }

        let throughput = netgauge_stats::mean(&throughputs)
            .ok_or_else(|| Error::parse(NAME, "no Txn2 intervals in output"))?;
        let latency99_ms = netgauge_stats::percentile(&latencies_ms, 99.0).unwrap_or(0.0);
        let latency_mean_ms = netgauge_stats::mean(&latencies_ms).unwrap_or(0.0);

        Ok(Sample {
            driver: NAME.to_string(),
            metric: cfg.profile.metric_unit().to_string(),
            throughput,
            latency99_ms,
            latency_mean_ms,
            loss_percent: 0.0,
            retransmits: 0.0,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct TxnPoint {
    timestamp_ms: f64,
    bytes: u64,
    ops: u64,
}

impl TxnPoint {
    /// Expected shape:
    /// `timestamp_ms:1694013813.21 name:Txn2 nr_bytes:104857600 nr_ops:1600`
    fn from_line(line: &str) -> Option<Self> {
        if !line.contains("name:Txn2") {
            return None;
        }

        let mut timestamp_ms = None;
        let mut bytes = None;
        let mut ops = None;
        for token in line.split_whitespace() {
            if let Some(v) = token.strip_prefix("timestamp_ms:") {
                timestamp_ms = v.parse::<f64>().ok();
            } else if let Some(v) = token.strip_prefix("nr_bytes:") {
                bytes = v.parse::<u64>().ok();
            } else if let Some(v) = token.strip_prefix("nr_ops:") {
                ops = v.parse::<u64>().ok();
            }
        }

        Some(Self {
            timestamp_ms: timestamp_ms?,
            bytes: bytes?,
            ops: ops?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedExec;

    fn cfg(profile: Profile) -> ScenarioConfig {
        ScenarioConfig {
            profile,
            duration_secs: 10,
            samples: 1,
            message_size: 1024,
            parallelism: 2,
            burst: 0,
            service: false,
        }
    }

    fn client() -> Pod {
        Pod {
            name: "client-0".to_string(),
            ip: "10.244.0.10".to_string(),
            node: "node-a".to_string(),
            ..Pod::default()
        }
    }

    #[test]
    fn everything_but_tcp_crr_is_supported() {
        assert!(Uperf.is_test_supported(Profile::TcpStream));
        assert!(Uperf.is_test_supported(Profile::UdpRr));
        assert!(Uperf.is_test_supported(Profile::SctpStream));
        assert!(!Uperf.is_test_supported(Profile::TcpCrr));
    }

    #[test]
    fn workload_xml_carries_scenario_parameters() {
        let xml = Uperf::workload_xml(&cfg(Profile::TcpStream), "10.244.1.20");
        assert!(xml.contains("remotehost=10.244.1.20"));
        assert!(xml.contains("protocol=tcp"));
        assert!(xml.contains("port=30000"));
        assert!(xml.contains("size=1024"));
        assert!(xml.contains(r#"nprocs="2""#));
        assert!(xml.contains(r#"duration="10s""#));
        // Stream workload writes only.
        assert!(!xml.contains(r#"type="read""#));

        let xml = Uperf::workload_xml(&cfg(Profile::UdpRr), "10.244.1.20");
        assert!(xml.contains("protocol=udp"));
        assert!(xml.contains(r#"type="read""#));
    }

    #[test]
    fn run_writes_profile_then_invokes_tool() {
        let exec = ScriptedExec::new([
            ScriptedExec::ok(""),
            ScriptedExec::ok("timestamp_ms:0.0 name:Txn2 nr_bytes:0 nr_ops:0\n"),
        ]);

        match Uperf.run(
            &exec,
            &TopologyState::default(),
            &cfg(Profile::TcpStream),
            &client(),
            "10.244.1.20",
        ) {
            Ok(_) => {}
            Err(err) => panic!("run failed: {err}"),
        }

        let calls = exec.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1[2].contains("/tmp/uperf-workload.xml"));
        assert!(calls[0].1[2].contains("remotehost=10.244.1.20"));
        assert_eq!(calls[1].1[0], "uperf");
        assert!(calls[1].1.contains(&"-m".to_string()));
    }

    #[test]
    fn parse_derives_interval_deltas() {
        // Two 1s intervals: 100 MB and 50 ops each.
        let raw = b"starting...\n\
            timestamp_ms:1000.0 name:Txn2 nr_bytes:0 nr_ops:0\n\
            timestamp_ms:2000.0 name:Txn2 nr_bytes:100000000 nr_ops:50\n\
            timestamp_ms:3000.0 name:Txn2 nr_bytes:200000000 nr_ops:100\n";

        let sample = match Uperf.parse_results(raw, &cfg(Profile::TcpStream)) {
            Ok(s) => s,
            Err(err) => panic!("parse failed: {err}"),
        };

        // 100 MB/s = 800 Mb/s per interval; mean over two equal intervals.
        assert!((sample.throughput - 800.0).abs() < 1e-6);
        // 1000 ms / 50 ops = 20 ms per op in both intervals.
        assert!((sample.latency99_ms - 20.0).abs() < 1e-6);
        assert!((sample.latency_mean_ms - 20.0).abs() < 1e-6);
    }

    #[test]
    fn parse_requires_txn2_intervals() {
        let raw = b"uperf starting\nno transactions here\n";
        match Uperf.parse_results(raw, &cfg(Profile::TcpStream)) {
            Err(Error::Parse { reason, .. }) => assert!(reason.contains("Txn2")),
            other => panic!("expected parse error, got {other:?}"),
        }

        // A single point yields no interval.
        let raw = b"timestamp_ms:1000.0 name:Txn2 nr_bytes:5 nr_ops:1\n";
        assert!(Uperf.parse_results(raw, &cfg(Profile::TcpStream)).is_err());
    }
}
