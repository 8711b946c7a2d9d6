//! Topology builder.
//!
//! Declarations are recorded in the order they are issued. Addresses and
//! VLANs are allocated at declaration time, so the result of a build only
//! depends on the declaration sequence. [`TopologyBuilder::build`] then
//! realizes every node in declaration order followed by every link, and
//! can only run once per builder.
//!
//! # Examples
//!
//! ```
//! use routinglab::ip::AddressPolicy;
//! use routinglab::topology::{PeeringOptions, Topology, TopologyBuilder};
//!
//! let mut builder = TopologyBuilder::new(AddressPolicy::default()).unwrap();
//! let a = builder.declare_autonomous_system(65001, vec!["10.1.0.0/16".parse().unwrap()], 1).unwrap();
//! let b = builder.declare_autonomous_system(65000, vec![], 1).unwrap();
//! builder.add_peering(a, b, PeeringOptions::vlan()).unwrap();
//!
//! let mut topology = Topology::new();
//! builder.build(&mut topology).unwrap();
//! assert_eq!(topology.nodes.len(), 2);
//! assert_eq!(topology.links.len(), 1);
//! assert!(builder.build(&mut topology).is_err());
//! ```

use super::autonomous_system::{AsHandle, AsKind, AutonomousSystem, Peering, PeeringEnd, PeeringOptions};
use super::control::{ClusterSpec, ControllerCluster};
use super::error::{BuildError, ConfigurationError};
use super::graph::{Topology, TopologySink};
use super::host::{Addressing, HostProfile, VlanMode};
use super::types::{
    AddressBinding, BgpNeighbor, BgpSpeaker, Interface, Link, LinkEnd, Node, NodeRole, SwitchParams, ZebraSettings,
};
use crate::ip::{peering_addresses, stub_addresses, AddressPolicy, AddressRegistry, AsRegistry, PeeringAllocator};
use crate::utils::{default_dpid, normalize_dpid, validate_node_name, MacAddr};
use ipnet::IpNet;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};

/// Kind of switch node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    /// Fabric switch under controller management
    #[default]
    OpenFlow,
    /// Standalone learning bridge
    Bridge,
}

/// Declaration of a switch
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwitchSpec {
    #[serde(default)]
    pub kind: SwitchKind,
    /// Derived from the first number in the switch name when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl SwitchSpec {
    pub fn openflow() -> Self {
        Self::default()
    }

    pub fn bridge() -> Self {
        Self { kind: SwitchKind::Bridge, ..Default::default() }
    }
}

/// Pre-declared interface of a stand-alone router
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterfaceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddr>,
    #[serde(default)]
    pub bindings: Vec<AddressBinding>,
}

/// Declaration of a stand-alone BGP router
///
/// Interfaces are consumed in order by the links attached to the router.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouterSpec {
    pub asn: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_id: Option<Ipv4Addr>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceSpec>,
    #[serde(default)]
    pub neighbors: Vec<BgpNeighbor>,
    #[serde(default)]
    pub networks: Vec<IpNet>,
    #[serde(default)]
    pub zebra: ZebraSettings,
}

/// Builds a [`Topology`] from AS, peering, host and link declarations
#[derive(Debug)]
pub struct TopologyBuilder {
    allocator: PeeringAllocator,
    registry: AddressRegistry,
    systems: AsRegistry,
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    /// Interfaces already attached to a link, per node
    attached: Vec<usize>,
    links: Vec<Link>,
    peerings: Vec<Peering>,
    built: bool,
}

impl TopologyBuilder {
    pub fn new(policy: AddressPolicy) -> Result<Self, BuildError> {
        Ok(Self {
            allocator: PeeringAllocator::new(policy)?,
            registry: AddressRegistry::new(),
            systems: AsRegistry::new(),
            nodes: Vec::new(),
            node_index: HashMap::new(),
            attached: Vec::new(),
            links: Vec::new(),
            peerings: Vec::new(),
            built: false,
        })
    }

    pub fn policy(&self) -> &AddressPolicy {
        self.allocator.policy()
    }

    /// Peerings in declaration order
    pub fn peerings(&self) -> &[Peering] {
        &self.peerings
    }

    pub fn autonomous_system(&self, handle: AsHandle) -> Result<&AutonomousSystem, BuildError> {
        Ok(self.systems.get(handle.asn())?)
    }

    pub fn autonomous_systems(&self) -> impl Iterator<Item = &AutonomousSystem> {
        self.systems.iter()
    }

    pub fn addresses(&self) -> &AddressRegistry {
        &self.registry
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Declare an external AS with `routers` plain BGP routers
    ///
    /// Routers are named `as<asn>r<index>` with a 1-based index and
    /// advertise every prefix in `routes`.
    pub fn declare_autonomous_system(
        &mut self,
        asn: u32,
        routes: Vec<IpNet>,
        routers: usize,
    ) -> Result<AsHandle, BuildError> {
        self.declare(asn, AsKind::Basic, routes, routers)
    }

    /// Declare the SDN-controlled AS
    ///
    /// Its routers are BGP speakers whose zebra pushes routes over FPM to
    /// the first controller.
    pub fn declare_sdn_autonomous_system(
        &mut self,
        asn: u32,
        routes: Vec<IpNet>,
        speakers: usize,
        controllers: Vec<IpAddr>,
    ) -> Result<AsHandle, BuildError> {
        self.declare(asn, AsKind::Sdn { controllers }, routes, speakers)
    }

    fn declare(&mut self, asn: u32, kind: AsKind, routes: Vec<IpNet>, routers: usize) -> Result<AsHandle, BuildError> {
        self.ensure_open()?;
        if routers == 0 {
            return Err(ConfigurationError::NoRouters { asn }.into());
        }
        if self.systems.contains(asn) {
            return Err(ConfigurationError::DuplicateAs(asn).into());
        }

        let system = AutonomousSystem::new(asn, kind, routes, routers);
        // Generated router names skip the length cap, their interfaces fall back to `eth<N>`
        let names: Vec<&str> = system.routers.iter().map(String::as_str).collect();
        self.check_unique_names(&names)?;

        // Stub addresses are reserved up front so that later peerings avoid them
        for (gateway, host) in system.ipv4_routes().filter_map(|route| stub_addresses(&route).ok()) {
            self.registry.reserve(IpNet::V4(gateway));
            self.registry.reserve(IpNet::V4(host));
        }

        for router in &system.routers {
            let mut node = Node::new(router.clone(), NodeRole::Router);
            node.bgp = Some(BgpSpeaker::new(asn, system.routes.clone()));
            node.zebra = Some(ZebraSettings { fpm: system.fpm_controller(), default_route: None });
            self.insert_node(node);
        }

        info!("Declared AS {} with {} router(s)", asn, routers);
        let handle = system.handle();
        self.systems.insert(system)?;
        Ok(handle)
    }

    /// Declare a BGP peering between two autonomous systems
    ///
    /// A fresh interface is allocated on the chosen router of each AS and
    /// linked directly to the other. Both sides share a subnet from the
    /// peering pool: side A gets the first host address, side B the second.
    /// With `use_vlan` the bindings are additionally tagged with the next
    /// VLAN of this AS pair.
    pub fn add_peering(&mut self, a: AsHandle, b: AsHandle, options: PeeringOptions) -> Result<(), BuildError> {
        self.ensure_open()?;
        if a == b {
            return Err(ConfigurationError::SelfPeering(a.asn()).into());
        }
        let router_a = self.systems.get(a.asn())?.router(options.router_a)?.to_string();
        let router_b = self.systems.get(b.asn())?.router(options.router_b)?.to_string();

        // Neither pool is consumed unless both allocations succeed
        if options.use_vlan {
            self.allocator.peek_vlan(a.asn(), b.asn())?;
        }
        let subnet = self.allocator.next_subnet(a.asn(), b.asn(), &self.registry)?;
        let vlan = if options.use_vlan { Some(self.allocator.next_vlan(a.asn(), b.asn())?) } else { None };
        let (addr_a, addr_b) = peering_addresses(&subnet);

        let idx_a = self.node_idx(&router_a)?;
        let idx_b = self.node_idx(&router_b)?;
        let port_a = self.next_port(idx_a);
        let port_b = self.next_port(idx_b);

        for (idx, port, address, peer_address, remote_as) in [
            (idx_a, port_a, addr_a, addr_b, b.asn()),
            (idx_b, port_b, addr_b, addr_a, a.asn()),
        ] {
            let binding = AddressBinding { vlan, outer_vlan: None, addresses: vec![IpNet::V4(address)] };
            self.nodes[idx].interfaces[port].bindings.push(binding);
            self.claim_interface(idx, port);
            if let Some(bgp) = self.nodes[idx].bgp.as_mut() {
                bgp.neighbors.push(BgpNeighbor::new(IpAddr::V4(peer_address.addr()), remote_as));
            }
        }
        self.connect(idx_a, port_a, idx_b, port_b);

        let end = |idx: usize, port: usize, asn: u32, address| PeeringEnd {
            asn,
            router: self.nodes[idx].name.clone(),
            interface: self.nodes[idx].interfaces[port].name.clone(),
            address,
        };
        let peering = Peering { a: end(idx_a, port_a, a.asn(), addr_a), b: end(idx_b, port_b, b.asn(), addr_b), vlan, subnet };
        debug!(
            "Peering {} <-> {} on {} ({})",
            peering.a.interface,
            peering.b.interface,
            subnet,
            vlan.map_or_else(|| "untagged".to_string(), |v| format!("vlan {}", v))
        );
        self.peerings.push(peering);
        Ok(())
    }

    /// Link an AS router to a node outside the AS, typically a fabric switch
    pub fn attach_external_link(&mut self, handle: AsHandle, router_index: usize, external: &str) -> Result<(), BuildError> {
        self.ensure_open()?;
        let router = self.systems.get(handle.asn())?.router(router_index)?.to_string();
        self.add_link(&router, external)
    }

    /// Put a stub host behind an AS router
    ///
    /// For every IPv4 route of the AS, the router interface gets the last
    /// usable address and the host the first one. The host's default
    /// gateway is the router address on the first route.
    pub fn add_routed_network(&mut self, handle: AsHandle, router_index: usize, host: &str) -> Result<(), BuildError> {
        self.ensure_open()?;
        let system = self.systems.get(handle.asn())?;
        let router = system.router(router_index)?.to_string();
        let invalid = |reason: String| ConfigurationError::InvalidHost { name: host.to_string(), reason };

        let mut gateways = Vec::new();
        let mut hosts = Vec::new();
        for route in system.ipv4_routes() {
            let (gateway, address) = stub_addresses(&route).map_err(invalid)?;
            gateways.push(IpNet::V4(gateway));
            hosts.push(IpNet::V4(address));
        }
        let gateway = match gateways.first() {
            Some(gateway) => gateway.addr(),
            None => return Err(invalid(format!("AS {} advertises no IPv4 route", handle.asn())).into()),
        };

        self.add_host(host, HostProfile::routed(hosts, Some(gateway)))?;
        let router_idx = self.node_idx(&router)?;
        let host_idx = self.node_idx(host)?;
        let router_port = self.next_port(router_idx);
        let host_port = self.next_port(host_idx);
        self.nodes[router_idx].interfaces[router_port].bindings.push(AddressBinding::untagged(gateways));
        self.claim_interface(router_idx, router_port);
        self.connect(router_idx, router_port, host_idx, host_port);
        Ok(())
    }

    /// Declare an OpenFlow switch or a standalone bridge
    pub fn add_switch(&mut self, name: &str, spec: SwitchSpec) -> Result<(), BuildError> {
        self.ensure_open()?;
        self.check_new_names(&[name])?;
        let invalid = |reason: String| ConfigurationError::InvalidSwitch { name: name.to_string(), reason };

        let dpid = spec.dpid.as_deref().map(normalize_dpid).transpose().map_err(invalid)?;
        let (role, dpid) = match spec.kind {
            SwitchKind::OpenFlow => {
                let dpid = dpid
                    .or_else(|| default_dpid(name))
                    .ok_or_else(|| invalid("no DPID given and none can be derived from the name".to_string()))?;
                (NodeRole::Switch, Some(dpid))
            }
            SwitchKind::Bridge => (NodeRole::Bridge, dpid),
        };

        let mut node = Node::new(name, role);
        node.switch = Some(SwitchParams { dpid, latitude: spec.latitude, longitude: spec.longitude });
        self.insert_node(node);
        debug!("Declared {:?} {}", role, name);
        Ok(())
    }

    /// Declare a host
    ///
    /// Static addresses are placed on the host's first interface (or its
    /// bond) when the topology is built.
    pub fn add_host(&mut self, name: &str, profile: HostProfile) -> Result<(), BuildError> {
        self.ensure_open()?;
        self.check_new_names(&[name])?;
        profile
            .validate()
            .map_err(|reason| ConfigurationError::InvalidHost { name: name.to_string(), reason })?;

        if let Addressing::Static { ips, .. } = &profile.addressing {
            let owner = format!("{}/{}", name, Interface::name_for(name, 0));
            for ip in ips {
                self.registry.claim(*ip, &owner);
            }
        }

        let mut node = Node::new(name, NodeRole::Host);
        node.host = Some(profile);
        self.insert_node(node);
        debug!("Declared host {}", name);
        Ok(())
    }

    /// Declare a stand-alone BGP router with explicit interfaces
    pub fn add_router(&mut self, name: &str, spec: RouterSpec) -> Result<(), BuildError> {
        self.ensure_open()?;
        self.check_new_names(&[name])?;

        let mut node = Node::new(name, NodeRole::Router);
        for (index, intf) in spec.interfaces.into_iter().enumerate() {
            node.interfaces.push(Interface {
                name: Interface::name_for(name, index),
                mac: intf.mac,
                bindings: intf.bindings,
            });
        }
        node.bgp = Some(BgpSpeaker {
            asn: spec.asn,
            router_id: spec.router_id,
            networks: spec.networks,
            neighbors: spec.neighbors,
        });
        node.zebra = Some(spec.zebra);

        let idx = self.insert_node(node);
        for port in 0..self.nodes[idx].interfaces.len() {
            self.claim_interface(idx, port);
        }
        debug!("Declared router {} in AS {}", name, spec.asn);
        Ok(())
    }

    /// Link two declared nodes on their next free interfaces
    pub fn add_link(&mut self, a: &str, b: &str) -> Result<(), BuildError> {
        self.ensure_open()?;
        if a == b {
            return Err(ConfigurationError::SelfLink(a.to_string()).into());
        }
        let idx_a = self.node_idx(a)?;
        let idx_b = self.node_idx(b)?;
        let port_a = self.next_port(idx_a);
        let port_b = self.next_port(idx_b);
        self.connect(idx_a, port_a, idx_b, port_b);
        Ok(())
    }

    /// Declare a controller cluster on its own control bridge
    pub fn add_controller_cluster(&mut self, spec: &ClusterSpec) -> Result<ControllerCluster, BuildError> {
        self.ensure_open()?;
        let cluster = spec.layout()?;

        let mut names = vec![cluster.control_bridge.as_str(), cluster.root_host.as_str()];
        names.extend(cluster.data_bridge.as_deref());
        names.extend(cluster.instances.iter().map(|i| i.name.as_str()));
        self.check_new_names(&names)?;

        let control_idx = self.insert_node(Self::bridge_node(&cluster.control_bridge));
        let data_idx = cluster.data_bridge.as_deref().map(|name| self.insert_node(Self::bridge_node(name)));

        for instance in &cluster.instances {
            let mut node = Node::new(instance.name.clone(), NodeRole::Host);
            node.host = Some(HostProfile::default());
            let idx = self.insert_node(node);
            self.attach_addressed(idx, control_idx, IpNet::V4(instance.control_address));
            if let (Some(data_idx), Some(address)) = (data_idx, instance.data_address) {
                self.attach_addressed(idx, data_idx, IpNet::V4(address));
            }
        }

        let mut root = Node::new(cluster.root_host.clone(), NodeRole::Host);
        root.in_namespace = false;
        root.host = Some(HostProfile::default());
        let root_idx = self.insert_node(root);
        self.attach_addressed(root_idx, control_idx, IpNet::V4(cluster.root_address));

        info!(
            "Declared controller cluster with {} instance(s) on {}",
            cluster.instances.len(),
            cluster.control_bridge
        );
        Ok(cluster)
    }

    /// Realize every declared node and link into `sink`
    ///
    /// Nodes are emitted in declaration order, then links. Nothing is
    /// emitted when the declarations cannot be realized, and a second call
    /// fails with [`BuildError::AlreadyBuilt`] without touching `sink`.
    pub fn build<S: TopologySink + ?Sized>(&mut self, sink: &mut S) -> Result<(), BuildError> {
        self.ensure_open()?;
        let nodes = self.realize_nodes()?;

        let node_count = nodes.len();
        for node in nodes {
            sink.add_node(node);
        }
        for link in &self.links {
            sink.add_link(link.clone());
        }
        self.built = true;

        info!(
            "Built topology with {} nodes, {} links and {} peerings",
            node_count,
            self.links.len(),
            self.peerings.len()
        );
        Ok(())
    }

    /// Build into a fresh in-memory [`Topology`]
    pub fn build_topology(&mut self) -> Result<Topology, BuildError> {
        let mut topology = Topology::new();
        self.build(&mut topology)?;
        Ok(topology)
    }

    fn ensure_open(&self) -> Result<(), BuildError> {
        if self.built {
            return Err(BuildError::AlreadyBuilt);
        }
        Ok(())
    }

    /// Validate a batch of new user-chosen node names before any of them is inserted
    fn check_new_names(&self, names: &[&str]) -> Result<(), ConfigurationError> {
        for name in names {
            validate_node_name(name).map_err(ConfigurationError::InvalidName)?;
        }
        self.check_unique_names(names)
    }

    fn check_unique_names(&self, names: &[&str]) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for name in names {
            if self.node_index.contains_key(*name) || !seen.insert(*name) {
                return Err(ConfigurationError::DuplicateName(name.to_string()));
            }
        }
        Ok(())
    }

    fn insert_node(&mut self, node: Node) -> usize {
        let idx = self.nodes.len();
        self.node_index.insert(node.name.clone(), idx);
        self.nodes.push(node);
        self.attached.push(0);
        idx
    }

    fn bridge_node(name: &str) -> Node {
        let mut node = Node::new(name, NodeRole::Bridge);
        node.switch = Some(SwitchParams::default());
        node
    }

    fn node_idx(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.node_index
            .get(name)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownNode(name.to_string()))
    }

    /// Index of the next interface of a node not yet attached to a link
    ///
    /// Pre-declared interfaces are used first, then new ones are appended.
    fn next_port(&mut self, idx: usize) -> usize {
        let port = self.attached[idx];
        if port == self.nodes[idx].interfaces.len() {
            self.nodes[idx].push_interface();
        }
        self.attached[idx] += 1;
        port
    }

    fn connect(&mut self, idx_a: usize, port_a: usize, idx_b: usize, port_b: usize) {
        let end = |idx: usize, port: usize| LinkEnd {
            node: self.nodes[idx].name.clone(),
            interface: self.nodes[idx].interfaces[port].name.clone(),
        };
        let link = Link { a: end(idx_a, port_a), b: end(idx_b, port_b) };
        debug!("Link {}:{} <-> {}:{}", link.a.node, link.a.interface, link.b.node, link.b.interface);
        self.links.push(link);
    }

    /// Link a node to a bridge with a single address on the node's side
    fn attach_addressed(&mut self, idx: usize, bridge_idx: usize, address: IpNet) {
        let port = self.next_port(idx);
        let bridge_port = self.next_port(bridge_idx);
        self.nodes[idx].interfaces[port].bindings.push(AddressBinding::untagged(vec![address]));
        self.claim_interface(idx, port);
        self.connect(idx, port, bridge_idx, bridge_port);
    }

    fn claim_interface(&mut self, idx: usize, port: usize) {
        let intf = &self.nodes[idx].interfaces[port];
        let owner = format!("{}/{}", self.nodes[idx].name, intf.name);
        for address in intf.addresses() {
            self.registry.claim(*address, &owner);
        }
    }

    /// Copies of the declared nodes with host profiles and router ids applied
    fn realize_nodes(&self) -> Result<Vec<Node>, ConfigurationError> {
        let mut nodes = self.nodes.clone();
        for node in &mut nodes {
            if let Some(profile) = node.host.clone() {
                Self::apply_host_profile(node, &profile)?;
            }
            let first_ipv4 = node.first_ipv4();
            if let Some(bgp) = node.bgp.as_mut() {
                if bgp.router_id.is_none() {
                    bgp.router_id = first_ipv4;
                }
                if bgp.router_id.is_none() {
                    warn!("Router {} has no IPv4 address to use as router id", node.name);
                }
            }
        }
        Ok(nodes)
    }

    fn apply_host_profile(node: &mut Node, profile: &HostProfile) -> Result<(), ConfigurationError> {
        let required = profile.required_links();
        if node.interfaces.len() < required {
            if required > 1 {
                return Err(ConfigurationError::InvalidHost {
                    name: node.name.clone(),
                    reason: format!("bonding needs {} links, found {}", required, node.interfaces.len()),
                });
            }
            warn!("Host {} is not linked to anything", node.name);
            return Ok(());
        }

        let primary = &mut node.interfaces[0];
        if profile.mac.is_some() {
            primary.mac = profile.mac;
        }

        let addresses = match &profile.addressing {
            Addressing::Static { ips, .. } => ips.clone(),
            Addressing::Dhcp { .. } | Addressing::None => Vec::new(),
        };
        let binding = match profile.vlan {
            VlanMode::Untagged => AddressBinding::untagged(addresses),
            VlanMode::Tagged { vlan } => AddressBinding::tagged(vlan, addresses),
            VlanMode::DoubleTagged { outer, inner } => AddressBinding {
                vlan: Some(inner),
                outer_vlan: Some(outer),
                addresses,
            },
        };
        if binding != AddressBinding::default() {
            primary.bindings.insert(0, binding);
        }
        Ok(())
    }
}
