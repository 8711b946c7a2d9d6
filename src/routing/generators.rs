//! Builders for Quagga and FRR configuration snippets.
//!
//! Every builder renders to a `String` for a given [`Target`]. The two
//! targets only differ in a handful of places: FRR wraps advertised networks
//! in an explicit address family, needs eBGP sessions to run without
//! policies and talks to FPM through the `dplane_fpm_nl` module.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::net::{IpAddr, Ipv4Addr};

/// TCP port zebra connects to on the FPM server
pub const FPM_PORT: u16 = 2620;

/// Routing suite the configuration is rendered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Quagga,
    Frr,
}

/// BGP neighbor configuration builder
#[derive(Debug, Clone)]
pub struct RouterBgpNeighbor {
    address: IpAddr,
    remote_as: Option<u32>,
    port: Option<u16>,
    description: Option<String>,
}

impl RouterBgpNeighbor {
    pub fn new(address: IpAddr) -> Self {
        Self { address, remote_as: None, port: None, description: None }
    }

    pub fn remote_as(&mut self, asn: u32) -> &mut Self {
        self.remote_as = Some(asn);
        self
    }

    /// Non-standard TCP port of the neighbor
    pub fn port(&mut self, port: u16) -> &mut Self {
        self.port = Some(port);
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Render the neighbor lines
    ///
    /// ```
    /// # use routinglab::routing::generators::{RouterBgpNeighbor, Target};
    /// let mut neighbor = RouterBgpNeighbor::new("10.0.0.2".parse().unwrap());
    /// neighbor.remote_as(65000).port(2000);
    /// assert_eq!(
    ///     neighbor.build(Target::Quagga),
    ///     "  neighbor 10.0.0.2 remote-as 65000\n  neighbor 10.0.0.2 port 2000\n"
    /// );
    /// ```
    pub fn build(&self, _target: Target) -> String {
        let mut out = String::new();
        let ip = self.address;
        if let Some(asn) = self.remote_as {
            let _ = writeln!(out, "  neighbor {ip} remote-as {asn}");
        }
        if let Some(description) = &self.description {
            let _ = writeln!(out, "  neighbor {ip} description {description}");
        }
        if let Some(port) = self.port {
            let _ = writeln!(out, "  neighbor {ip} port {port}");
        }
        out
    }
}

impl From<&mut RouterBgpNeighbor> for RouterBgpNeighbor {
    fn from(neighbor: &mut RouterBgpNeighbor) -> Self {
        neighbor.clone()
    }
}

/// `router bgp` stanza builder
///
/// ```
/// # use routinglab::routing::generators::{RouterBgp, RouterBgpNeighbor, Target};
/// let mut bgp = RouterBgp::new(65001);
/// bgp.router_id("10.0.0.1".parse().unwrap())
///     .network("10.1.0.0/16".parse().unwrap())
///     .neighbor(RouterBgpNeighbor::new("10.0.0.2".parse().unwrap()).remote_as(65000));
/// assert_eq!(
///     bgp.build(Target::Frr),
///     "\
/// router bgp 65001
///   bgp router-id 10.0.0.1
///   no bgp ebgp-requires-policy
///   neighbor 10.0.0.2 remote-as 65000
///   address-family ipv4 unicast
///     network 10.1.0.0/16
///   exit-address-family
/// exit
/// "
/// );
/// ```
#[derive(Debug, Clone)]
pub struct RouterBgp {
    asn: u32,
    router_id: Option<Ipv4Addr>,
    neighbors: Vec<RouterBgpNeighbor>,
    networks: Vec<IpNet>,
}

impl RouterBgp {
    pub fn new(asn: u32) -> Self {
        Self { asn, router_id: None, neighbors: Vec::new(), networks: Vec::new() }
    }

    pub fn router_id(&mut self, id: Ipv4Addr) -> &mut Self {
        self.router_id = Some(id);
        self
    }

    /// Advertise a prefix
    pub fn network(&mut self, network: IpNet) -> &mut Self {
        self.networks.push(network);
        self
    }

    pub fn neighbor(&mut self, neighbor: impl Into<RouterBgpNeighbor>) -> &mut Self {
        self.neighbors.push(neighbor.into());
        self
    }

    pub fn build(&self, target: Target) -> String {
        let mut out = format!("router bgp {}\n", self.asn);
        if let Some(id) = self.router_id {
            let _ = writeln!(out, "  bgp router-id {id}");
        }
        if target == Target::Frr {
            out.push_str("  no bgp ebgp-requires-policy\n");
        }
        for neighbor in &self.neighbors {
            out.push_str(&neighbor.build(target));
        }

        let (v4, v6): (Vec<&IpNet>, Vec<&IpNet>) = self.networks.iter().partition(|n| matches!(n, IpNet::V4(_)));
        match target {
            Target::Quagga => {
                for network in v4 {
                    let _ = writeln!(out, "  network {network}");
                }
            }
            Target::Frr if !v4.is_empty() => {
                out.push_str("  address-family ipv4 unicast\n");
                for network in v4 {
                    let _ = writeln!(out, "    network {network}");
                }
                out.push_str("  exit-address-family\n");
            }
            Target::Frr => {}
        }

        let v6_neighbors: Vec<IpAddr> =
            self.neighbors.iter().map(RouterBgpNeighbor::address).filter(IpAddr::is_ipv6).collect();
        if !v6.is_empty() || !v6_neighbors.is_empty() {
            out.push_str("  address-family ipv6 unicast\n");
            for network in v6 {
                let _ = writeln!(out, "    network {network}");
            }
            for ip in v6_neighbors {
                let _ = writeln!(out, "    neighbor {ip} activate");
            }
            out.push_str("  exit-address-family\n");
        }

        out.push_str(match target {
            Target::Quagga => "!\n",
            Target::Frr => "exit\n",
        });
        out
    }
}

/// zebra configuration builder
///
/// ```
/// # use routinglab::routing::generators::{Target, Zebra};
/// let mut zebra = Zebra::new("as65000r1");
/// zebra.fpm("192.168.1.1".parse().unwrap());
/// assert_eq!(
///     zebra.build(Target::Quagga),
///     "\
/// hostname as65000r1
/// password quagga
/// !
/// fpm connection ip 192.168.1.1 port 2620
/// "
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Zebra {
    hostname: String,
    password: String,
    log_file: Option<String>,
    default_route: Option<IpAddr>,
    fpm: Option<IpAddr>,
}

impl Zebra {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            password: "quagga".to_string(),
            log_file: None,
            default_route: None,
            fpm: None,
        }
    }

    pub fn password(&mut self, password: impl Into<String>) -> &mut Self {
        self.password = password.into();
        self
    }

    pub fn log_file(&mut self, path: impl Into<String>) -> &mut Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn default_route(&mut self, gateway: IpAddr) -> &mut Self {
        self.default_route = Some(gateway);
        self
    }

    /// Push routes to the controller at `server` over FPM
    pub fn fpm(&mut self, server: IpAddr) -> &mut Self {
        self.fpm = Some(server);
        self
    }

    pub fn build(&self, target: Target) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "hostname {}", self.hostname);
        let _ = writeln!(out, "password {}", self.password);
        if let Some(log_file) = &self.log_file {
            let _ = writeln!(out, "log file {log_file}");
        }
        if let Some(gateway) = self.default_route {
            out.push_str("!\n");
            match gateway {
                IpAddr::V4(gw) => {
                    let _ = writeln!(out, "ip route 0.0.0.0/0 {gw}");
                }
                IpAddr::V6(gw) => {
                    let _ = writeln!(out, "ipv6 route ::/0 {gw}");
                }
            }
        }
        if let Some(server) = self.fpm {
            out.push_str("!\n");
            match target {
                Target::Quagga => {
                    let _ = writeln!(out, "fpm connection ip {server} port {FPM_PORT}");
                }
                Target::Frr => {
                    let _ = writeln!(out, "fpm address {server} port {FPM_PORT}");
                }
            }
        }
        out
    }
}
