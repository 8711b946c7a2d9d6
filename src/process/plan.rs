//! Desired-state planning.
//!
//! Every router and host of a [`Topology`] gets a [`NodePlan`]: the
//! interface setup steps that bring its addresses and VLANs up, followed by
//! the daemons it runs. Switches and bridges are left to the emulation
//! backend and get no plan.
//!
//! ## Sub-interface naming
//!
//! VLAN sub-interfaces are named `<parent>.<vlan>`. When that would exceed
//! the 15-byte Linux limit the node prefix is dropped (`eth0.100.200`
//! instead of `dth5-eth0.100.200`); interface names only need to be unique
//! inside the node's namespace.

use super::types::{DaemonKind, DaemonPaths, DaemonSpec, InterfaceAction, IpFamily, NodePlan, Plan, VlanProtocol};
use crate::routing::{bgpd_file_name, zebra_file_name};
use crate::topology::{
    AddressBinding, Addressing, Bonding, DhcpFamily, HostProfile, Node, NodeRole, Service, Topology,
};
use crate::utils::validation::{kernel_interface_name, MAX_IFNAME_LEN};
use log::debug;
use std::time::Duration;

fn vlan_interface_name(parent: &str, vlan: u16) -> String {
    let full = format!("{}.{}", parent, vlan);
    if full.len() <= MAX_IFNAME_LEN {
        return full;
    }
    let short = parent.rsplit_once('-').map_or(parent, |(_, rest)| rest);
    format!("{}.{}", short, vlan)
}

/// Emit the steps for a list of bindings on `base`
///
/// # Returns
///
/// The interface each binding ended up on, in binding order, or `base`
/// alone when there are no bindings.
fn configure_bindings(base: &str, bindings: &[AddressBinding], actions: &mut Vec<InterfaceAction>) -> Vec<String> {
    let mut targets = Vec::new();
    for binding in bindings {
        let target = match (binding.outer_vlan, binding.vlan) {
            (Some(outer), inner) => {
                let outer_name = vlan_interface_name(base, outer);
                actions.push(InterfaceAction::AddVlan {
                    parent: base.to_string(),
                    name: outer_name.clone(),
                    vlan: outer,
                    protocol: VlanProtocol::Dot1Ad,
                });
                match inner {
                    Some(inner) => {
                        let inner_name = vlan_interface_name(&outer_name, inner);
                        actions.push(InterfaceAction::AddVlan {
                            parent: outer_name,
                            name: inner_name.clone(),
                            vlan: inner,
                            protocol: VlanProtocol::Dot1Q,
                        });
                        inner_name
                    }
                    None => outer_name,
                }
            }
            (None, Some(vlan)) => {
                let name = vlan_interface_name(base, vlan);
                actions.push(InterfaceAction::AddVlan {
                    parent: base.to_string(),
                    name: name.clone(),
                    vlan,
                    protocol: VlanProtocol::Dot1Q,
                });
                name
            }
            (None, None) => base.to_string(),
        };

        for address in &binding.addresses {
            actions.push(InterfaceAction::AddAddress { interface: target.clone(), address: *address });
        }
        targets.push(target);
    }

    if targets.is_empty() {
        targets.push(base.to_string());
    }
    targets
}

fn daemon(node: &Node, kind: DaemonKind, interfaces: Vec<String>, paths: &DaemonPaths) -> DaemonSpec {
    DaemonSpec {
        node: node.name.clone(),
        kind,
        binary: paths.binary(kind),
        interfaces,
        config_file: None,
        pid_file: paths.pid_file(kind, &node.name),
        lease_file: paths.lease_file(kind, &node.name),
        server: None,
    }
}

fn plan_host(node: &Node, profile: &HostProfile, paths: &DaemonPaths, plan: &mut NodePlan) {
    let Some(first) = node.interfaces.first() else {
        return;
    };
    let actions = &mut plan.interface_setup;

    // A DHCPv6-only client keeps the link-local address the kernel assigned
    let flush_family = match profile.addressing {
        Addressing::Dhcp { family: DhcpFamily::V6 } => Some(IpFamily::V4),
        _ => None,
    };

    let bonded = profile.bonding == Bonding::BalanceXor && node.interfaces.len() >= 2;
    let primary = if bonded {
        let members: Vec<String> = node.interfaces[..2].iter().map(|i| i.name.clone()).collect();
        for member in &members {
            actions.push(InterfaceAction::Flush { interface: member.clone(), family: None });
        }
        let bond = kernel_interface_name(&node.name, "bond0");
        actions.push(InterfaceAction::AddBond { name: bond.clone(), members });
        bond
    } else {
        actions.push(InterfaceAction::Flush { interface: first.name.clone(), family: flush_family });
        first.name.clone()
    };

    if let Some(mac) = first.mac {
        actions.push(InterfaceAction::SetMac { interface: primary.clone(), mac });
    }
    let primary_targets = configure_bindings(&primary, &first.bindings, actions);
    let target = primary_targets[0].clone();

    let mut all_targets = primary_targets;
    for intf in node.interfaces.iter().skip(if bonded { 2 } else { 1 }) {
        if let Some(mac) = intf.mac {
            actions.push(InterfaceAction::SetMac { interface: intf.name.clone(), mac });
        }
        all_targets.extend(configure_bindings(&intf.name, &intf.bindings, actions));
    }

    match &profile.addressing {
        Addressing::Static { gateway: Some(gateway), .. } => {
            actions.push(InterfaceAction::DefaultRoute { via: *gateway });
        }
        Addressing::Dhcp { family } => {
            if family.has_v4() {
                plan.daemons.push(daemon(node, DaemonKind::Dhclient, vec![target.clone()], paths));
            }
            if family.has_v6() {
                plan.daemons.push(daemon(node, DaemonKind::Dhclient6, vec![target.clone()], paths));
            }
        }
        Addressing::Static { gateway: None, .. } | Addressing::None => {}
    }

    for service in &profile.services {
        match service {
            Service::DhcpServer { family, config_file } => {
                let (kind, default_config) = if family.has_v6() {
                    if let Some(mac) = first.mac {
                        plan.interface_setup.push(InterfaceAction::AddLinkLocal {
                            interface: target.clone(),
                            address: mac.ipv6_link_local(),
                        });
                    }
                    (DaemonKind::Dhcpd6, &paths.dhcpd6_config)
                } else {
                    (DaemonKind::Dhcpd, &paths.dhcpd_config)
                };
                let mut spec = daemon(node, kind, vec![target.clone()], paths);
                spec.config_file = Some(config_file.clone().unwrap_or_else(|| default_config.clone()));
                plan.daemons.push(spec);
            }
            Service::DhcpRelay { server, gateway } => {
                plan.interface_setup.push(InterfaceAction::DefaultRoute { via: *gateway });
                let mut spec = daemon(node, DaemonKind::Dhcrelay, all_targets.clone(), paths);
                spec.server = Some(*server);
                plan.daemons.push(spec);
            }
        }
    }

    if profile.addressing != Addressing::None || !profile.services.is_empty() {
        plan.interface_setup.push(InterfaceAction::DisableOffload { interface: target });
    }
}

fn plan_interfaces(node: &Node, plan: &mut NodePlan) {
    for intf in &node.interfaces {
        if let Some(mac) = intf.mac {
            plan.interface_setup.push(InterfaceAction::SetMac { interface: intf.name.clone(), mac });
        }
        configure_bindings(&intf.name, &intf.bindings, &mut plan.interface_setup);
    }
}

fn plan_routing(node: &Node, paths: &DaemonPaths, plan: &mut NodePlan) {
    let mut zebra = daemon(node, DaemonKind::Zebra, Vec::new(), paths);
    zebra.config_file = Some(paths.config_dir.join(zebra_file_name(&node.name)));
    let mut bgpd = daemon(node, DaemonKind::Bgpd, Vec::new(), paths);
    bgpd.config_file = Some(paths.config_dir.join(bgpd_file_name(&node.name)));
    // bgpd talks to zebra, so zebra goes first
    plan.daemons.push(zebra);
    plan.daemons.push(bgpd);
}

/// Plan a single node, `None` for switches and bridges
pub fn plan_node(node: &Node, paths: &DaemonPaths) -> Option<NodePlan> {
    if matches!(node.role, NodeRole::Switch | NodeRole::Bridge) {
        return None;
    }

    let mut plan = NodePlan {
        node: node.name.clone(),
        in_namespace: node.in_namespace,
        interface_setup: Vec::new(),
        daemons: Vec::new(),
    };
    match &node.host {
        Some(profile) => plan_host(node, profile, paths, &mut plan),
        None => plan_interfaces(node, &mut plan),
    }
    if node.bgp.is_some() {
        plan_routing(node, paths, &mut plan);
    }
    Some(plan)
}

/// Plan every node of a topology, in topology order
pub fn plan_topology(topology: &Topology, paths: &DaemonPaths, ready_timeout: Duration) -> Plan {
    let nodes: Vec<NodePlan> = topology.nodes.iter().filter_map(|node| plan_node(node, paths)).collect();
    debug!(
        "Planned {} nodes with {} daemons",
        nodes.len(),
        nodes.iter().map(|n| n.daemons.len()).sum::<usize>()
    );
    Plan { ready_timeout, nodes }
}
