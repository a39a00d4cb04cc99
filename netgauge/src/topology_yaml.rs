use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;

use netgauge_core::{Pod, PodSets, RolePods};

/// Everything the provisioning collaborator hands over: ready pods per
/// role, per-driver service addresses, node identities and cluster
/// metadata. netgauge never creates or deletes any of it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct TopologyManifest {
    pub namespace: String,

    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub kernel: String,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_mtu")]
    pub mtu: u32,

    #[serde(default)]
    pub server_node: String,
    #[serde(default)]
    pub client_node: String,

    pub pods: RoleSetYaml,
    #[serde(default)]
    pub vm_pods: RoleSetYaml,

    /// Cluster-internal service address per driver name.
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

fn default_mtu() -> u32 {
    1500
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RoleSetYaml {
    #[serde(default)]
    client: Vec<PodYaml>,
    #[serde(default)]
    client_across: Vec<PodYaml>,
    #[serde(default)]
    client_host: Vec<PodYaml>,
    #[serde(default)]
    server: Vec<PodYaml>,
    #[serde(default)]
    server_host: Vec<PodYaml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PodYaml {
    name: String,
    ip: String,
    #[serde(default)]
    node: String,
    /// Raw primary-network status annotation payload.
    #[serde(default)]
    pod_networks: Option<String>,
    /// Raw CNI network-status annotation payload.
    #[serde(default)]
    network_status: Option<String>,
}

impl TopologyManifest {
    pub(crate) fn into_pod_sets(self) -> PodSets {
        PodSets {
            containers: self.pods.into_role_pods(),
            vms: self.vm_pods.into_role_pods(),
        }
    }
}

impl RoleSetYaml {
    fn into_role_pods(self) -> RolePods {
        RolePods {
            client: into_pods(self.client),
            client_across: into_pods(self.client_across),
            client_host: into_pods(self.client_host),
            server: into_pods(self.server),
            server_host: into_pods(self.server_host),
        }
    }
}

fn into_pods(pods: Vec<PodYaml>) -> Vec<Pod> {
    pods.into_iter()
        .map(|p| Pod {
            name: p.name,
            ip: p.ip,
            node: p.node,
            pod_networks: p.pod_networks,
            network_status: p.network_status,
        })
        .collect()
}

pub(crate) fn load(path: &Path) -> anyhow::Result<TopologyManifest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read topology manifest: {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid topology manifest: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
namespace: netgauge
platform: kind
kernel: 6.6.0
version: v1.30.0
mtu: 1400
serverNode: node-b
clientNode: node-a
pods:
  client:
    - name: client-0
      ip: 10.244.0.10
      node: node-a
  clientAcross:
    - name: client-across-0
      ip: 10.244.1.10
      node: node-a
  server:
    - name: server-0
      ip: 10.244.1.20
      node: node-b
      networkStatus: '[{"name":"testing/br-ex","interface":"net1","ips":["192.168.10.7"]}]'
services:
  netperf: 10.96.0.10
  iperf3: 10.96.0.11
"#;

    #[test]
    fn parses_a_manifest() {
        let manifest: TopologyManifest = match serde_yaml::from_str(MANIFEST) {
            Ok(m) => m,
            Err(err) => panic!("parse failed: {err}"),
        };

        assert_eq!(manifest.namespace, "netgauge");
        assert_eq!(manifest.mtu, 1400);
        assert_eq!(manifest.server_node, "node-b");
        assert_eq!(manifest.services.get("iperf3").map(String::as_str), Some("10.96.0.11"));

        let sets = manifest.into_pod_sets();
        assert_eq!(sets.containers.client.len(), 1);
        assert_eq!(sets.containers.client_across[0].name, "client-across-0");
        assert_eq!(sets.containers.server[0].ip, "10.244.1.20");
        assert!(sets.containers.server[0].network_status.is_some());
        assert!(sets.vms.server.is_empty());
    }

    #[test]
    fn mtu_defaults_when_absent() {
        let manifest: TopologyManifest = match serde_yaml::from_str("namespace: x\npods: {}\n") {
            Ok(m) => m,
            Err(err) => panic!("parse failed: {err}"),
        };
        assert_eq!(manifest.mtu, 1500);
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: Result<TopologyManifest, _> =
            serde_yaml::from_str("namespace: x\npods: {}\npodz: {}\n");
        assert!(result.is_err());
    }
}
