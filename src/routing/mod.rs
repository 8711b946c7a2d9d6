//! Routing-daemon configuration.
//!
//! Router configuration files are rendered from a realized [`Topology`]
//! alone, in a pass independent of the build. Each node carrying a BGP
//! speaker gets a `bgpd` and a `zebra` file.

pub mod generators;

pub use generators::{RouterBgp, RouterBgpNeighbor, Target, Zebra, FPM_PORT};

use crate::topology::{Node, Topology};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Name of the bgpd configuration file of `router`
pub fn bgpd_file_name(router: &str) -> String {
    format!("{}-bgpd.conf", router)
}

/// Name of the zebra configuration file of `router`
pub fn zebra_file_name(router: &str) -> String {
    format!("{}-zebra.conf", router)
}

/// Settings shared by every rendered file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    #[serde(default)]
    pub target: Target,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_password() -> String {
    "quagga".to_string()
}

fn default_log_dir() -> String {
    "/var/log/quagga".to_string()
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { target: Target::default(), password: default_password(), log_dir: default_log_dir() }
    }
}

/// Rendered configuration of one router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub router: String,
    pub bgpd: String,
    pub zebra: String,
}

impl RouterConfig {
    pub fn bgpd_file_name(&self) -> String {
        bgpd_file_name(&self.router)
    }

    pub fn zebra_file_name(&self) -> String {
        zebra_file_name(&self.router)
    }
}

/// Render the bgpd file of a router node
///
/// Returns `None` for nodes without a BGP speaker.
pub fn render_bgpd(node: &Node, options: &RenderOptions) -> Option<String> {
    let speaker = node.bgp.as_ref()?;

    let mut bgp = RouterBgp::new(speaker.asn);
    match speaker.router_id.or_else(|| node.first_ipv4()) {
        Some(id) => {
            bgp.router_id(id);
        }
        None => warn!("No router id for {}, leaving it to bgpd", node.name),
    }
    for neighbor in &speaker.neighbors {
        let mut n = RouterBgpNeighbor::new(neighbor.address);
        n.remote_as(neighbor.remote_as);
        if let Some(port) = neighbor.port {
            n.port(port);
        }
        bgp.neighbor(n);
    }
    for network in &speaker.networks {
        bgp.network(*network);
    }

    let mut out = format!("! bgpd configuration for {}\n!\n", node.name);
    out.push_str(&format!("hostname {}\npassword {}\n!\n", node.name, options.password));
    out.push_str(&bgp.build(options.target));
    Some(out)
}

/// Render the zebra file of a router node
pub fn render_zebra(node: &Node, options: &RenderOptions) -> Option<String> {
    node.bgp.as_ref()?;

    let mut zebra = Zebra::new(node.name.clone());
    zebra
        .password(options.password.clone())
        .log_file(format!("{}/zebra-{}.log", options.log_dir.trim_end_matches('/'), node.name));
    if let Some(settings) = &node.zebra {
        if let Some(gateway) = settings.default_route {
            zebra.default_route(gateway);
        }
        if let Some(server) = settings.fpm {
            zebra.fpm(server);
        }
    }
    Some(zebra.build(options.target))
}

/// Render the configuration of every router, in topology order
pub fn render_router_configs(topology: &Topology, options: &RenderOptions) -> Vec<RouterConfig> {
    topology
        .routers()
        .filter_map(|node| {
            let bgpd = render_bgpd(node, options)?;
            let zebra = render_zebra(node, options)?;
            debug!("Rendered {:?} configuration for {}", options.target, node.name);
            Some(RouterConfig { router: node.name.clone(), bgpd, zebra })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{BgpNeighbor, BgpSpeaker, NodeRole, ZebraSettings};

    fn speaker_node() -> Node {
        let mut node = Node::new("bgp1", NodeRole::Router);
        let mut speaker = BgpSpeaker::new(65001, vec!["10.0.1.0/24".parse().unwrap()]);
        speaker.router_id = Some("10.0.1.254".parse().unwrap());
        let mut neighbor = BgpNeighbor::new("10.0.1.1".parse().unwrap(), 65002);
        neighbor.port = Some(2000);
        speaker.neighbors.push(neighbor);
        node.bgp = Some(speaker);
        node.zebra = Some(ZebraSettings {
            fpm: Some("192.168.56.11".parse().unwrap()),
            default_route: Some("172.16.0.1".parse().unwrap()),
        });
        node
    }

    #[test]
    fn test_render_bgpd() {
        let out = render_bgpd(&speaker_node(), &RenderOptions::default()).unwrap();
        assert!(out.starts_with("! bgpd configuration for bgp1\n"));
        assert!(out.contains("hostname bgp1\npassword quagga\n"));
        assert!(out.contains("router bgp 65001\n  bgp router-id 10.0.1.254\n"));
        assert!(out.contains("  neighbor 10.0.1.1 remote-as 65002\n  neighbor 10.0.1.1 port 2000\n"));
        assert!(out.contains("  network 10.0.1.0/24\n"));
    }

    #[test]
    fn test_render_zebra() {
        let out = render_zebra(&speaker_node(), &RenderOptions::default()).unwrap();
        assert_eq!(
            out,
            "hostname bgp1\npassword quagga\nlog file /var/log/quagga/zebra-bgp1.log\n!\nip route 0.0.0.0/0 172.16.0.1\n!\nfpm connection ip 192.168.56.11 port 2620\n"
        );
    }

    #[test]
    fn test_non_routers_are_skipped() {
        let host = Node::new("h1", NodeRole::Host);
        assert!(render_bgpd(&host, &RenderOptions::default()).is_none());
        assert!(render_zebra(&host, &RenderOptions::default()).is_none());
    }

    #[test]
    fn test_file_names() {
        assert_eq!(bgpd_file_name("as65001r1"), "as65001r1-bgpd.conf");
        assert_eq!(zebra_file_name("as65001r1"), "as65001r1-zebra.conf");
    }
}
