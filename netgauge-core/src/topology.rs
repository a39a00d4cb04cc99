use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::ConfigError;

/// One ready workload endpoint (container pod or VM launcher pod), as
/// supplied by the provisioning collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pod {
    pub name: String,
    /// Primary (cluster network) address.
    pub ip: String,
    pub node: String,
    /// Raw primary-network status annotation payload, when the workload is
    /// attached to a primary user-defined network.
    pub pod_networks: Option<String>,
    /// Raw CNI network-status annotation payload, when the workload carries
    /// secondary attachments.
    pub network_status: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("pod carries no {0} annotation")]
    MissingAnnotation(&'static str),

    #[error("malformed network annotation: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("no primary-role network with an address")]
    NoPrimaryAddress,

    #[error("no network-status entry for network `{0}`")]
    NetworkNotFound(String),

    #[error("no network-status entry for interface `{0}`")]
    InterfaceNotFound(String),
}

#[derive(Debug, Deserialize)]
struct PodNetworkEntry {
    #[serde(default)]
    ip_addresses: Vec<String>,
    #[serde(default)]
    role: String,
}

#[derive(Debug, Deserialize)]
struct NetworkStatusEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    interface: String,
    #[serde(default)]
    ips: Vec<String>,
}

fn strip_cidr(addr: &str) -> &str {
    addr.split('/').next().unwrap_or(addr)
}

impl Pod {
    /// Address of the pod's primary user-defined network, extracted from
    /// the primary-network status annotation.
    pub fn primary_network_address(&self) -> Result<String, AddressError> {
        let raw = self
            .pod_networks
            .as_deref()
            .ok_or(AddressError::MissingAnnotation("pod-networks"))?;
        let networks: BTreeMap<String, PodNetworkEntry> = serde_json::from_str(raw)?;

        networks
            .values()
            .find(|n| n.role == "primary")
            .and_then(|n| n.ip_addresses.first())
            .map(|cidr| strip_cidr(cidr).to_string())
            .ok_or(AddressError::NoPrimaryAddress)
    }

    /// Address of the secondary attachment whose network name matches
    /// `network` (with or without a namespace prefix).
    pub fn network_address_by_name(&self, network: &str) -> Result<String, AddressError> {
        let entries = self.network_status_entries()?;
        entries
            .iter()
            .find(|e| e.name == network || e.name.ends_with(&format!("/{network}")))
            .and_then(|e| e.ips.first())
            .map(|ip| strip_cidr(ip).to_string())
            .ok_or_else(|| AddressError::NetworkNotFound(network.to_string()))
    }

    /// Address of the secondary attachment bound to `interface`.
    pub fn network_address_by_interface(&self, interface: &str) -> Result<String, AddressError> {
        let entries = self.network_status_entries()?;
        entries
            .iter()
            .find(|e| e.interface == interface)
            .and_then(|e| e.ips.first())
            .map(|ip| strip_cidr(ip).to_string())
            .ok_or_else(|| AddressError::InterfaceNotFound(interface.to_string()))
    }

    fn network_status_entries(&self) -> Result<Vec<NetworkStatusEntry>, AddressError> {
        let raw = self
            .network_status
            .as_deref()
            .ok_or(AddressError::MissingAnnotation("network-status"))?;
        Ok(serde_json::from_str(raw)?)
    }
}

/// Ready pods per role for one workload flavor.
#[derive(Debug, Clone, Default)]
pub struct RolePods {
    /// Same-node clients.
    pub client: Vec<Pod>,
    /// Clients scheduled on a different node than the server.
    pub client_across: Vec<Pod>,
    /// Host-network clients.
    pub client_host: Vec<Pod>,
    pub server: Vec<Pod>,
    pub server_host: Vec<Pod>,
}

/// Role map for container workloads and their VM-flavored equivalents.
#[derive(Debug, Clone, Default)]
pub struct PodSets {
    pub containers: RolePods,
    pub vms: RolePods,
}

/// Primary user-defined network topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum UdnMode {
    Layer2,
    Layer3,
}

/// Bridged secondary network attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Interface name of the bridge attachment inside the workload.
    pub interface: String,
    /// Pre-supplied static address (CIDR notation) for VM workloads, where
    /// the bridge address is not discoverable at runtime.
    pub static_address: Option<String>,
}

/// `device:gid-index` parameter for the RDMA bandwidth driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdmaDevice {
    pub device: String,
    pub gid_index: u32,
}

impl RdmaDevice {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidRdmaDevice(raw.to_string());

        let (device, gid) = raw.split_once(':').ok_or_else(invalid)?;
        if device.is_empty() {
            return Err(invalid());
        }
        let gid_index: u32 = gid.parse().map_err(|_| invalid())?;

        Ok(Self {
            device: device.to_string(),
            gid_index,
        })
    }
}

/// Run-wide network-topology context. Built once from CLI-level
/// configuration plus the provisioning collaborator's discovered values;
/// read-only during execution. At most one of `udn`, `cudn`, `bridge` and
/// `external_server` is set.
#[derive(Debug, Clone, Default)]
pub struct TopologyState {
    /// Client and server scheduled on the same node.
    pub node_local: bool,
    /// Host-network flavor active for the current combination.
    pub host_network: bool,
    pub across_az: bool,
    /// Workloads are virtual machines instead of containers.
    pub vm: bool,
    /// Network binding mode label for VM workloads on a UDN.
    pub vm_binding: Option<String>,
    pub udn: Option<UdnMode>,
    /// Cluster-scoped user-defined network name (secondary role).
    pub cudn: Option<String>,
    pub bridge: Option<BridgeConfig>,
    /// Fixed server address outside the cluster; overrides all discovery.
    pub external_server: Option<String>,
    pub rdma_device: Option<RdmaDevice>,

    pub pods: PodSets,
    /// Cluster-internal service address per driver name.
    pub services: BTreeMap<String, String>,
    pub server_node: String,
    pub client_node: String,
    pub mtu: u32,
}

impl TopologyState {
    /// Rejects mode combinations that cannot coexist in one run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let exclusive = [
            self.udn.is_some(),
            self.cudn.is_some(),
            self.bridge.is_some(),
            self.external_server.is_some(),
        ];
        if exclusive.iter().filter(|set| **set).count() > 1 {
            return Err(ConfigError::ConflictingNetworkModes);
        }

        if self.vm
            && let Some(bridge) = &self.bridge
            && bridge.static_address.is_none()
        {
            return Err(ConfigError::MissingBridgeAddress);
        }

        Ok(())
    }

    /// Copy of the topology with the host-network flag set for one
    /// combination.
    #[must_use]
    pub fn with_host_network(&self, host_network: bool) -> Self {
        let mut topo = self.clone();
        topo.host_network = host_network;
        topo
    }

    /// Role map for the active workload flavor.
    pub fn role_pods(&self) -> &RolePods {
        if self.vm { &self.pods.vms } else { &self.pods.containers }
    }
}
