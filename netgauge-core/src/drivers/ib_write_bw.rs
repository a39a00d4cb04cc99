use super::{Driver, utf8};
use crate::config::{ConfigError, Profile, ScenarioConfig};
use crate::error::{Error, Result};
use crate::exec::PodExec;
use crate::results::Sample;
use crate::topology::{Pod, TopologyState};

pub(crate) const NAME: &str = "ib_write_bw";

/// Single-purpose RDMA bandwidth tool. Bound to the UDP stream profile as
/// a selector only; the measurement itself is RDMA write bandwidth, not a
/// UDP test. Requires a `device:gid-index` parameter and is never invoked
/// against VM workloads.
pub struct IbWriteBw;

impl Driver for IbWriteBw {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_test_supported(&self, profile: Profile) -> bool {
        profile == Profile::UdpStream
    }

    fn runs_in_vm(&self) -> bool {
        false
    }

    fn run(
        &self,
        exec: &dyn PodExec,
        topo: &TopologyState,
        cfg: &ScenarioConfig,
        client: &Pod,
        server_addr: &str,
    ) -> Result<Vec<u8>> {
        let rdma = topo
            .rdma_device
            .as_ref()
            .ok_or(Error::Config(ConfigError::MissingRdmaDevice))?;

        let argv = vec![
            NAME.to_string(),
            "-d".to_string(),
            rdma.device.clone(),
            "-x".to_string(),
            rdma.gid_index.to_string(),
            "-s".to_string(),
            cfg.message_size.to_string(),
            "-D".to_string(),
            cfg.duration_secs.to_string(),
            "--report_gbits".to_string(),
            server_addr.to_string(),
        ];

        let out = exec.exec(client, &argv)?.ok_stdout(&client.name)?;
        Ok(out.into_bytes())
    }

    /// Scans the tool's fixed-width table for the first fully numeric data
    /// row and reads its fourth column (BW average).
    fn parse_results(&self, raw: &[u8], _cfg: &ScenarioConfig) -> Result<Sample> {
        let text = utf8(raw, NAME)?;

        for line in text.lines() {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 4 {
                continue;
            }
            if !tokens.iter().all(|t| t.parse::<f64>().is_ok()) {
                continue;
            }

            let bw_average: f64 = tokens[3]
                .parse()
                .map_err(|_| Error::parse(NAME, "BW average column is not a number"))?;

            return Ok(Sample {
                driver: NAME.to_string(),
                metric: "Gb/s".to_string(),
                throughput: bw_average,
                latency99_ms: 0.0,
                latency_mean_ms: 0.0,
                loss_percent: 0.0,
                retransmits: 0.0,
            });
        }

        Err(Error::parse(NAME, "no numeric data row in output"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::ScriptedExec;
    use crate::topology::RdmaDevice;

    fn cfg() -> ScenarioConfig {
        ScenarioConfig {
            profile: Profile::UdpStream,
            duration_secs: 10,
            samples: 1,
            message_size: 65536,
            parallelism: 1,
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

    const OUTPUT: &str = "\
---------------------------------------------------------------------------------------
                    RDMA_Write BW Test
 Dual-port       : OFF          Device         : mlx5_0
---------------------------------------------------------------------------------------
 #bytes     #iterations    BW peak[Gb/s]    BW average[Gb/s]   MsgRate[Mpps]
 65536      77588          92.11            91.85              0.175171
---------------------------------------------------------------------------------------
";

    #[test]
    fn only_the_udp_stream_selector_is_supported() {
        assert!(IbWriteBw.is_test_supported(Profile::UdpStream));
        assert!(!IbWriteBw.is_test_supported(Profile::TcpStream));
        assert!(!IbWriteBw.is_test_supported(Profile::UdpRr));
        assert!(!IbWriteBw.runs_in_vm());
    }

    #[test]
    fn run_requires_rdma_device_before_executing() {
        let exec = ScriptedExec::new([]);
        let result = IbWriteBw.run(
            &exec,
            &TopologyState::default(),
            &cfg(),
            &client(),
            "10.244.1.20",
        );
        match result {
            Err(Error::Config(ConfigError::MissingRdmaDevice)) => {}
            other => panic!("expected MissingRdmaDevice, got {other:?}"),
        }
        assert!(exec.calls.borrow().is_empty());
    }

    #[test]
    fn run_passes_device_and_gid() {
        let topo = TopologyState {
            rdma_device: Some(RdmaDevice {
                device: "mlx5_0".to_string(),
                gid_index: 3,
            }),
            ..TopologyState::default()
        };
        let exec = ScriptedExec::new([ScriptedExec::ok(OUTPUT)]);

        match IbWriteBw.run(&exec, &topo, &cfg(), &client(), "10.244.1.20") {
            Ok(_) => {}
            Err(err) => panic!("run failed: {err}"),
        }

        let calls = exec.calls.borrow();
        let argv = &calls[0].1;
        assert_eq!(argv[0], "ib_write_bw");
        assert!(argv.windows(2).any(|w| w == ["-d", "mlx5_0"]));
        assert!(argv.windows(2).any(|w| w == ["-x", "3"]));
        assert!(argv.contains(&"--report_gbits".to_string()));
    }

    #[test]
    fn parse_reads_bw_average_column() {
        let sample = match IbWriteBw.parse_results(OUTPUT.as_bytes(), &cfg()) {
            Ok(s) => s,
            Err(err) => panic!("parse failed: {err}"),
        };
        assert!((sample.throughput - 91.85).abs() < 1e-9);
        assert_eq!(sample.metric, "Gb/s");
    }

    #[test]
    fn parse_requires_a_numeric_data_row() {
        let raw = b"#bytes #iterations BW peak[Gb/s] BW average[Gb/s]\nno data\n";
        match IbWriteBw.parse_results(raw, &cfg()) {
            Err(Error::Parse { reason, .. }) => assert!(reason.contains("numeric data row")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
