//! Topology type definitions.
//!
//! Nodes, interfaces and links of the realized fabric, plus the routing
//! metadata that router configuration files are rendered from.

use super::host::HostProfile;
use crate::utils::{kernel_interface_name, MacAddr};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Role of a node in the emulated fabric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Router,
    Host,
    /// OpenFlow switch managed by the controller
    Switch,
    /// Standalone learning bridge
    Bridge,
}

/// One (vlan, addresses) pair on an interface
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddressBinding {
    /// 802.1Q tag; `None` binds to the untagged interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    /// 802.1ad service tag wrapped around `vlan`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outer_vlan: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<IpNet>,
}

impl AddressBinding {
    pub fn untagged(addresses: Vec<IpNet>) -> Self {
        Self { addresses, ..Default::default() }
    }

    pub fn tagged(vlan: u16, addresses: Vec<IpNet>) -> Self {
        Self { vlan: Some(vlan), addresses, ..Default::default() }
    }
}

/// A connection point on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<AddressBinding>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), mac: None, bindings: Vec::new() }
    }

    /// Canonical name of the `index`-th interface of `node`
    pub fn name_for(node: &str, index: usize) -> String {
        kernel_interface_name(node, &format!("eth{}", index))
    }

    /// VLAN tag of the first tagged binding
    pub fn vlan(&self) -> Option<u16> {
        self.bindings.iter().find_map(|b| b.vlan)
    }

    /// Every address on the interface, across all bindings
    pub fn addresses(&self) -> impl Iterator<Item = &IpNet> {
        self.bindings.iter().flat_map(|b| b.addresses.iter())
    }

    pub fn first_ipv4(&self) -> Option<Ipv4Addr> {
        self.addresses().find_map(|net| match net.addr() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
    }

    pub fn has_address(&self, ip: &IpAddr) -> bool {
        self.addresses().any(|net| net.addr() == *ip)
    }
}

/// One end of a link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEnd {
    pub node: String,
    pub interface: String,
}

/// Undirected edge between two interfaces on two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub a: LinkEnd,
    pub b: LinkEnd,
}

impl Link {
    pub fn touches(&self, node: &str) -> bool {
        self.a.node == node || self.b.node == node
    }
}

/// BGP session towards a neighbor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpNeighbor {
    pub address: IpAddr,
    pub remote_as: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl BgpNeighbor {
    pub fn new(address: IpAddr, remote_as: u32) -> Self {
        Self { address, remote_as, port: None }
    }
}

/// BGP speaker running on a router node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BgpSpeaker {
    pub asn: u32,
    /// Defaults to the first IPv4 address of the router when the topology is built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_id: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<IpNet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub neighbors: Vec<BgpNeighbor>,
}

impl BgpSpeaker {
    pub fn new(asn: u32, networks: Vec<IpNet>) -> Self {
        Self { asn, router_id: None, networks, neighbors: Vec::new() }
    }
}

/// zebra settings of a router node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZebraSettings {
    /// Controller receiving routes over FPM
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fpm: Option<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_route: Option<IpAddr>,
}

/// Switch-only attributes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SwitchParams {
    /// 16 hex digit datapath id, OpenFlow switches only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

fn default_in_namespace() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// A router, host, switch or bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub role: NodeRole,
    /// `false` for hosts living in the root network namespace
    #[serde(default = "default_in_namespace", skip_serializing_if = "is_true")]
    pub in_namespace: bool,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch: Option<SwitchParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgp: Option<BgpSpeaker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zebra: Option<ZebraSettings>,
}

impl Node {
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            role,
            in_namespace: true,
            interfaces: Vec::new(),
            switch: None,
            host: None,
            bgp: None,
            zebra: None,
        }
    }

    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    /// Append a fresh `<node>-eth<N>` interface and return its index
    pub fn push_interface(&mut self) -> usize {
        let index = self.interfaces.len();
        self.interfaces.push(Interface::new(Interface::name_for(&self.name, index)));
        index
    }

    pub fn first_ipv4(&self) -> Option<Ipv4Addr> {
        self.interfaces.iter().find_map(Interface::first_ipv4)
    }

    pub fn is_router(&self) -> bool {
        self.role == NodeRole::Router
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_naming() {
        let mut node = Node::new("h1", NodeRole::Host);
        assert_eq!(node.push_interface(), 0);
        assert_eq!(node.push_interface(), 1);
        assert_eq!(node.interfaces[1].name, "h1-eth1");
        assert!(node.interface("h1-eth0").is_some());
        assert!(node.interface("h1-eth2").is_none());
    }

    #[test]
    fn test_long_node_names_use_short_interface_names() {
        let mut node = Node::new("as4200000000r1", NodeRole::Router);
        node.push_interface();
        assert_eq!(node.interfaces[0].name, "eth0");
    }

    #[test]
    fn test_first_ipv4_skips_ipv6() {
        let mut intf = Interface::new("r1-eth0");
        intf.bindings.push(AddressBinding::untagged(vec!["2000::1/64".parse().unwrap()]));
        intf.bindings.push(AddressBinding::tagged(20, vec!["10.0.2.254/24".parse().unwrap()]));
        assert_eq!(intf.first_ipv4(), Some(Ipv4Addr::new(10, 0, 2, 254)));
        assert_eq!(intf.vlan(), Some(20));
        assert!(intf.has_address(&"2000::1".parse().unwrap()));
    }

    #[test]
    fn test_root_namespace_flag_serialization() {
        let mut node = Node::new("root", NodeRole::Host);
        let yaml = serde_yaml::to_string(&node).unwrap();
        assert!(!yaml.contains("in_namespace"));

        node.in_namespace = false;
        let yaml = serde_yaml::to_string(&node).unwrap();
        assert!(yaml.contains("in_namespace: false"));
        let parsed: Node = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, node);
    }
}
