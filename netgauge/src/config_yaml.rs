use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

use netgauge_core::{Profile, ScenarioConfig};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigFileYaml {
    tests: Vec<TestYaml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TestYaml {
    /// Wire-format profile name (TCP_STREAM, UDP_RR, ...).
    profile: String,
    /// Seconds per sample.
    duration: u64,
    samples: u32,
    message_size: u32,
    parallelism: u32,
    #[serde(default)]
    burst: u32,
    #[serde(default)]
    service: bool,
}

pub(crate) fn load(path: &Path) -> anyhow::Result<Vec<ScenarioConfig>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario config: {}", path.display()))?;
    parse(&raw).with_context(|| format!("invalid scenario config: {}", path.display()))
}

fn parse(raw: &str) -> anyhow::Result<Vec<ScenarioConfig>> {
    let file: ConfigFileYaml = serde_yaml::from_str(raw)?;
    if file.tests.is_empty() {
        anyhow::bail!("scenario config contains no tests");
    }

    let mut out = Vec::with_capacity(file.tests.len());
    for (idx, test) in file.tests.into_iter().enumerate() {
        let profile = Profile::parse(&test.profile).with_context(|| format!("test #{idx}"))?;
        let cfg = ScenarioConfig {
            profile,
            duration_secs: test.duration,
            samples: test.samples,
            message_size: test.message_size,
            parallelism: test.parallelism,
            burst: test.burst,
            service: test.service,
        };
        cfg.validate()
            .with_context(|| format!("test #{idx} ({profile})"))?;
        out.push(cfg);
    }
    Ok(out)
}
