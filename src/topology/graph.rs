//! Realized topology graph.
//!
//! [`TopologySink`] is the boundary towards the emulation backend: the
//! builder issues one `add_node` per node followed by one `add_link` per
//! link. [`Topology`] is the in-memory sink, serialized to YAML or JSON for
//! backends living outside the process.

use super::types::{Interface, Link, Node, NodeRole};
use serde::{Deserialize, Serialize};

/// Receiver of node and link creation calls
pub trait TopologySink {
    fn add_node(&mut self, node: Node);
    fn add_link(&mut self, link: Link);
}

/// Node and link graph produced by a build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl TopologySink for Topology {
    fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    fn add_link(&mut self, link: Link) {
        self.links.push(link);
    }
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn interface(&self, node: &str, interface: &str) -> Option<&Interface> {
        self.node(node).and_then(|n| n.interface(interface))
    }

    /// Nodes carrying a BGP speaker, in realization order
    pub fn routers(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.bgp.is_some())
    }

    pub fn nodes_with_role(&self, role: NodeRole) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.role == role)
    }

    pub fn links_of<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| l.touches(node))
    }

    pub fn interface_count(&self) -> usize {
        self.nodes.iter().map(|n| n.interfaces.len()).sum()
    }

    /// Node and interface at the other end of `interface` on `node`
    pub fn peer_of(&self, node: &str, interface: &str) -> Option<(&Node, &Interface)> {
        let link = self.links.iter().find(|l| {
            (l.a.node == node && l.a.interface == interface) || (l.b.node == node && l.b.interface == interface)
        })?;
        let far = if link.a.node == node && link.a.interface == interface { &link.b } else { &link.a };
        let far_node = self.node(&far.node)?;
        Some((far_node, far_node.interface(&far.interface)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::types::LinkEnd;

    fn two_hosts() -> Topology {
        let mut topology = Topology::new();
        for name in ["h1", "h2"] {
            let mut node = Node::new(name, NodeRole::Host);
            node.push_interface();
            topology.add_node(node);
        }
        topology.add_link(Link {
            a: LinkEnd { node: "h1".into(), interface: "h1-eth0".into() },
            b: LinkEnd { node: "h2".into(), interface: "h2-eth0".into() },
        });
        topology
    }

    #[test]
    fn test_peer_lookup() {
        let topology = two_hosts();
        let (node, intf) = topology.peer_of("h1", "h1-eth0").unwrap();
        assert_eq!(node.name, "h2");
        assert_eq!(intf.name, "h2-eth0");
        assert!(topology.peer_of("h1", "h1-eth1").is_none());
    }

    #[test]
    fn test_counts() {
        let topology = two_hosts();
        assert_eq!(topology.interface_count(), 2);
        assert_eq!(topology.links_of("h2").count(), 1);
        assert_eq!(topology.nodes_with_role(NodeRole::Host).count(), 2);
        assert_eq!(topology.routers().count(), 0);
    }
}
