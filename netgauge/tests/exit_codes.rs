use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context as _;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn ensure_code(out: &std::process::Output, expected: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == expected,
        "expected exit code {expected}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

#[test]
fn invalid_flags_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_netgauge");

    let out = Command::new(exe)
        .arg("run")
        .arg(fixture("rr_only.yaml"))
        .arg("--topology")
        .arg(fixture("topology.yaml"))
        .arg("--tolerance")
        .arg("lots")
        .output()
        .context("run netgauge binary")?;

    ensure_code(&out, 30)
}

#[test]
fn missing_config_file_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_netgauge");

    let out = Command::new(exe)
        .arg("run")
        .arg("./does-not-exist.yaml")
        .arg("--topology")
        .arg(fixture("topology.yaml"))
        .output()
        .context("run netgauge binary")?;

    ensure_code(&out, 30)
}

#[test]
fn unknown_profile_exit_30() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_netgauge");

    let out = Command::new(exe)
        .arg("run")
        .arg(fixture("bad_profile.yaml"))
        .arg("--topology")
        .arg(fixture("topology.yaml"))
        .output()
        .context("run netgauge binary")?;

    ensure_code(&out, 30)?;

    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(
        stderr.contains("unknown profile"),
        "stderr should name the violated constraint:\n{stderr}"
    );
    Ok(())
}

/// A driver that does not support the requested profile short-circuits to
/// an empty result instead of executing anything, so this pipeline runs
/// end-to-end without a cluster: exports are written, the regression check
/// is skipped, and the exit code is success.
#[test]
fn unsupported_combination_exit_0_with_exports() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_netgauge");
    let dir = tempfile::tempdir().context("tempdir")?;
    let csv = dir.path().join("out.csv");
    let json = dir.path().join("out.json");

    let out = Command::new(exe)
        .arg("run")
        .arg(fixture("rr_only.yaml"))
        .arg("--topology")
        .arg(fixture("topology.yaml"))
        .arg("--driver")
        .arg("iperf3")
        .arg("--csv")
        .arg(&csv)
        .arg("--json")
        .arg(&json)
        .output()
        .context("run netgauge binary")?;

    ensure_code(&out, 0)?;

    let stdout = String::from_utf8_lossy(&out.stdout);
    anyhow::ensure!(
        stdout.contains("regression check skipped"),
        "stdout should report the skipped check:\n{stdout}"
    );
    anyhow::ensure!(csv.exists(), "csv export missing");
    anyhow::ensure!(json.exists(), "json export missing");

    let rows = std::fs::read_to_string(&csv).context("read csv")?;
    anyhow::ensure!(
        rows.lines().count() == 2,
        "expected header plus one row:\n{rows}"
    );
    anyhow::ensure!(rows.contains("iperf3,TCP_RR"), "row should key the combination:\n{rows}");

    Ok(())
}
