use std::collections::HashMap;

use super::{Driver, utf8};
use crate::config::{Profile, ScenarioConfig};
use crate::error::{Error, Result};
use crate::exec::PodExec;
use crate::results::Sample;
use crate::topology::{Pod, TopologyState};

pub(crate) const NAME: &str = "netperf";

const CONTROL_PORT: u16 = 12865;
const DATA_PORT: u16 = 42424;

/// Reportable fields requested from the tool, emitted as `KEY=VALUE`
/// lines.
const OUTPUT_KEYS: &str = "THROUGHPUT,THROUGHPUT_UNITS,MEAN_LATENCY,P99_LATENCY,P90_LATENCY,\
                           STDDEV_LATENCY,LOCAL_TRANSPORT_RETRANS,LOCAL_SEND_CALLS,\
                           LOCAL_RECV_CALLS,REMOTE_SEND_CALLS,REMOTE_RECV_CALLS";

/// Stream/request-response tool. Baseline driver: every profile is
/// supported, and unknown driver names resolve here.
pub struct Netperf;

impl Netperf {
    fn argv(cfg: &ScenarioConfig, server_addr: &str) -> Vec<String> {
        let mut argv = vec![
            NAME.to_string(),
            "-H".to_string(),
            server_addr.to_string(),
            "-p".to_string(),
            CONTROL_PORT.to_string(),
            "-l".to_string(),
            cfg.duration_secs.to_string(),
            "-t".to_string(),
            cfg.profile.to_string(),
            "--".to_string(),
            "-k".to_string(),
            OUTPUT_KEYS.to_string(),
            "-m".to_string(),
            cfg.message_size.to_string(),
            "-P".to_string(),
            format!("0,{DATA_PORT}"),
        ];

        if !cfg.profile.is_stream() && cfg.burst > 0 {
            argv.push("-b".to_string());
            argv.push(cfg.burst.to_string());
        }

        argv
    }
}

impl Driver for Netperf {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_test_supported(&self, _profile: Profile) -> bool {
        true
    }

    fn run(
        &self,
        exec: &dyn PodExec,
        _topo: &TopologyState,
        cfg: &ScenarioConfig,
        client: &Pod,
        server_addr: &str,
    ) -> Result<Vec<u8>> {
        let out = exec.exec(client, &Self::argv(cfg, server_addr))?;
        let stdout = out.ok_stdout(&client.name)?;
        Ok(stdout.into_bytes())
    }

    fn parse_results(&self, raw: &[u8], cfg: &ScenarioConfig) -> Result<Sample> {
        let text = utf8(raw, NAME)?;

        let lines: Vec<&str> = text.lines().collect();
        if lines.len() < 5 {
            return Err(Error::parse(
                NAME,
                format!("truncated output ({} lines)", lines.len()),
            ));
        }

        let mut fields: HashMap<&str, &str> = HashMap::new();
        for line in &lines {
            if let Some((key, value)) = line.split_once('=') {
                fields.insert(key.trim(), value.trim());
            }
        }

        let throughput = required_f64(&fields, "THROUGHPUT")?;
        let latency99_ms = required_f64(&fields, "P99_LATENCY")?;
        let latency_mean_ms = lenient_f64(&fields, "MEAN_LATENCY");
        let retransmits = lenient_f64(&fields, "LOCAL_TRANSPORT_RETRANS");

        // A negative retransmit count is the tool's convention for UDP
        // loss mode: loss is derived from the send/receive call counts.
        let loss_percent = if retransmits < 0.0 {
            let sent = lenient_f64(&fields, "LOCAL_SEND_CALLS");
            let received = lenient_f64(&fields, "REMOTE_RECV_CALLS");
            if sent > 0.0 {
                100.0 - (received / sent * 100.0)
            } else {
                0.0
            }
        } else {
            0.0
        };

        Ok(Sample {
            driver: NAME.to_string(),
            metric: cfg.profile.metric_unit().to_string(),
            throughput,
            latency99_ms,
            latency_mean_ms,
            loss_percent,
            retransmits: retransmits.max(0.0),
        })
    }
}

fn required_f64(fields: &HashMap<&str, &str>, key: &'static str) -> Result<f64> {
    let raw = fields
        .get(key)
        .ok_or_else(|| Error::parse(NAME, format!("missing field {key}")))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| Error::parse(NAME, format!("{key} is not a number: `{raw}`")))?;
    if value.is_nan() {
        return Err(Error::parse(NAME, format!("{key} is not a number")));
    }
    Ok(value)
}

fn lenient_f64(fields: &HashMap<&str, &str>, key: &str) -> f64 {
    fields
        .get(key)
        .and_then(|raw| raw.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
