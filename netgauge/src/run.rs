use anyhow::Context as _;
use uuid::Uuid;

use netgauge_core::exec::KubectlExec;
use netgauge_core::regression;
use netgauge_core::results::RunMetadata;
use netgauge_core::runner;
use netgauge_core::topology::{BridgeConfig, RdmaDevice, TopologyState};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::run_error::RunError;
use crate::topology_yaml::TopologyManifest;
use crate::{config_yaml, output, topology_yaml};

pub fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let scenarios = config_yaml::load(&args.config).map_err(RunError::InvalidInput)?;
    let manifest = topology_yaml::load(&args.topology).map_err(RunError::InvalidInput)?;

    let namespace = manifest.namespace.clone();
    let metadata = RunMetadata {
        uuid: Uuid::new_v4(),
        platform: manifest.platform.clone(),
        kernel: manifest.kernel.clone(),
        version: manifest.version.clone(),
        mtu: manifest.mtu,
    };

    let topology = build_topology(&args, manifest).map_err(RunError::InvalidInput)?;
    let exec = KubectlExec::new(
        args.kubectl.clone(),
        namespace,
        args.kubeconfig.clone(),
        args.exec_timeout,
    );

    output::human::print_header(&args.config, &metadata, &scenarios, &args.drivers);
    tracing::info!(
        scenarios = scenarios.len(),
        drivers = ?args.drivers,
        retries = args.retries,
        "starting benchmark run"
    );

    let results = runner::run_all(
        &exec,
        &topology,
        &scenarios,
        &args.drivers,
        args.retries,
        None,
        metadata,
    )
    .map_err(engine_error)?;

    output::human::print_results(&results);

    // Display and export always complete before the regression outcome is
    // decided.
    if let Some(path) = &args.csv {
        output::csv::write(path, &results).map_err(RunError::RuntimeError)?;
    }
    if let Some(path) = &args.json {
        output::json::write(path, &results).map_err(RunError::RuntimeError)?;
    }

    let outcome = regression::check(&results, args.tolerance)
        .map_err(|err| RunError::Regression(anyhow::Error::new(err)))?;
    output::human::print_regression(&outcome);

    Ok(ExitCode::from_regression(outcome.flagged()))
}

fn engine_error(err: netgauge_core::Error) -> RunError {
    if err.is_config() {
        RunError::InvalidInput(anyhow::Error::new(err))
    } else {
        RunError::RuntimeError(anyhow::Error::new(err))
    }
}

fn build_topology(args: &RunArgs, manifest: TopologyManifest) -> anyhow::Result<TopologyState> {
    let rdma_device = args
        .rdma_device
        .as_deref()
        .map(RdmaDevice::parse)
        .transpose()
        .context("invalid --rdma-device")?;

    let bridge = args.bridge.as_ref().map(|interface| BridgeConfig {
        interface: interface.clone(),
        static_address: args.bridge_address.clone(),
    });

    let topology = TopologyState {
        node_local: args.local,
        host_network: args.host_network,
        across_az: args.across_az,
        vm: args.vm,
        vm_binding: args.vm_binding.clone(),
        udn: args.udn,
        cudn: args.cudn.clone(),
        bridge,
        external_server: args.external_server.clone(),
        rdma_device,
        server_node: manifest.server_node.clone(),
        client_node: manifest.client_node.clone(),
        mtu: manifest.mtu,
        services: manifest.services.clone(),
        pods: manifest.into_pod_sets(),
    };

    topology.validate().context("invalid topology")?;
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser as _;

    fn args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["netgauge", "run", "s.yaml", "--topology", "t.yaml"];
        argv.extend_from_slice(extra);
        let cli = match crate::cli::Cli::try_parse_from(argv) {
            Ok(v) => v,
            Err(err) => panic!("args: {err}"),
        };
        let crate::cli::Command::Run(args) = cli.command;
        args
    }

    fn manifest() -> TopologyManifest {
        match serde_yaml::from_str("namespace: netgauge\nserverNode: node-b\npods: {}\n") {
            Ok(m) => m,
            Err(err) => panic!("manifest: {err}"),
        }
    }

    #[test]
    fn topology_is_built_from_flags_and_manifest() {
        let topo = match build_topology(&args(&["--local", "--host-network"]), manifest()) {
            Ok(t) => t,
            Err(err) => panic!("build failed: {err:#}"),
        };
        assert!(topo.node_local);
        assert!(topo.host_network);
        assert_eq!(topo.server_node, "node-b");
        assert_eq!(topo.mtu, 1500);
    }

    #[test]
    fn conflicting_network_modes_are_rejected() {
        let result = build_topology(
            &args(&["--udn", "layer2", "--external-server", "198.51.100.7"]),
            manifest(),
        );
        let err = match result {
            Err(err) => format!("{err:#}"),
            Ok(_) => panic!("expected failure"),
        };
        assert!(err.contains("at most one of"), "error: {err}");
    }

    #[test]
    fn malformed_rdma_device_is_rejected() {
        let result = build_topology(&args(&["--rdma-device", "mlx5_0"]), manifest());
        let err = match result {
            Err(err) => format!("{err:#}"),
            Ok(_) => panic!("expected failure"),
        };
        assert!(err.contains("device:gid-index"), "error: {err}");
    }
}
