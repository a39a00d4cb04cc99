//! Endpoint resolution: which server address to target and which client
//! pods drive the load for one scenario x network-mode x driver
//! combination. Pure selection over already-provisioned inputs.

use tracing::warn;

use crate::config::ScenarioConfig;
use crate::error::{Error, Result};
use crate::topology::{Pod, TopologyState};

/// Resolver output for one combination.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEndpoint {
    pub server_addr: String,
    pub client_pods: Vec<Pod>,
    /// Display label for the active network variant; empty for the default
    /// pod network.
    pub annotation: String,
}

/// Resolve `(server address, client pod set, annotation)`.
///
/// Address selection is a strict priority chain: external server, then
/// service, then primary UDN, then cluster UDN, then bridge, then the
/// pod/host default. Client selection is independent of the address chain.
pub fn resolve(
    topo: &TopologyState,
    cfg: &ScenarioConfig,
    driver: &str,
) -> Result<ResolvedEndpoint> {
    let (server_addr, annotation) = resolve_server(topo, cfg, driver)?;
    let client_pods = select_clients(topo).to_vec();

    if client_pods.is_empty() {
        return Err(Error::EmptyPodSet {
            role: client_role_name(topo),
        });
    }

    Ok(ResolvedEndpoint {
        server_addr,
        client_pods,
        annotation,
    })
}

fn resolve_server(
    topo: &TopologyState,
    cfg: &ScenarioConfig,
    driver: &str,
) -> Result<(String, String)> {
    // 1. A fixed external server overrides everything.
    if let Some(external) = &topo.external_server {
        return Ok((external.clone(), "external".to_string()));
    }

    // 2. Service mode targets the driver's own service address; distinct
    // services exist per driver.
    if cfg.service {
        let addr = topo
            .services
            .get(driver)
            .ok_or_else(|| Error::MissingService {
                driver: driver.to_string(),
            })?;
        return Ok((addr.clone(), "svc".to_string()));
    }

    // 3. Primary user-defined network: address comes from the server's
    // primary-network status annotation. Extraction failure is fatal.
    if let Some(mode) = topo.udn {
        let server = first_server(topo)?;
        let addr = server
            .primary_network_address()
            .map_err(|err| extraction_error(server, err))?;

        let annotation = match (topo.vm, &topo.vm_binding) {
            (true, Some(binding)) => format!("udn-{mode}-{binding}"),
            _ => format!("udn-{mode}"),
        };
        return Ok((addr, annotation));
    }

    // 4. Cluster-scoped user-defined network (secondary role): looked up by
    // network name. Extraction failure is fatal.
    if let Some(network) = &topo.cudn {
        let server = first_server(topo)?;
        let addr = server
            .network_address_by_name(network)
            .map_err(|err| extraction_error(server, err))?;
        return Ok((addr, network.clone()));
    }

    if let Some(bridge) = &topo.bridge {
        // 6. VM bridge addresses are pre-supplied statically, network
        // prefix stripped.
        if topo.vm {
            let static_addr = bridge
                .static_address
                .as_deref()
                .ok_or(crate::config::ConfigError::MissingBridgeAddress)
                .map_err(Error::from)?;
            let addr = static_addr.split('/').next().unwrap_or(static_addr);
            return Ok((addr.to_string(), "bridge".to_string()));
        }

        // 5. Container bridge addresses are discovered from the bridge
        // interface's network-status entry; extraction failure falls back
        // to the pod's primary address.
        let server = first_server(topo)?;
        let addr = match server.network_address_by_interface(&bridge.interface) {
            Ok(addr) => addr,
            Err(err) => {
                warn!(
                    pod = %server.name,
                    interface = %bridge.interface,
                    %err,
                    "bridge address extraction failed, falling back to pod address"
                );
                server.ip.clone()
            }
        };
        return Ok((addr, "bridge".to_string()));
    }

    // 7. Default: the server pod's primary address; host-network mode off
    // the local node targets the host-network server variant instead.
    let role = topo.role_pods();
    let server = if topo.host_network && !topo.node_local {
        role.server_host
            .first()
            .ok_or(Error::EmptyPodSet { role: "server-host" })?
    } else {
        role.server
            .first()
            .ok_or(Error::EmptyPodSet { role: "server" })?
    };
    Ok((server.ip.clone(), String::new()))
}

/// Client pod selection, independent of address resolution. VM mode swaps
/// in the VM-flavored role map at every branch.
fn select_clients(topo: &TopologyState) -> &[Pod] {
    let role = topo.role_pods();

    let mut clients: &[Pod] = &role.client;
    if !topo.node_local && topo.external_server.is_none() {
        clients = &role.client_across;
    }
    if topo.host_network && !topo.node_local {
        clients = &role.client_host;
    }
    clients
}

fn client_role_name(topo: &TopologyState) -> &'static str {
    if topo.host_network && !topo.node_local {
        "client-host"
    } else if !topo.node_local && topo.external_server.is_none() {
        "client-across"
    } else {
        "client"
    }
}

fn first_server(topo: &TopologyState) -> Result<&Pod> {
    topo.role_pods()
        .server
        .first()
        .ok_or(Error::EmptyPodSet { role: "server" })
}

fn extraction_error(pod: &Pod, err: crate::topology::AddressError) -> Error {
    Error::AddressExtraction {
        pod: pod.name.clone(),
        reason: err.to_string(),
    }
}
