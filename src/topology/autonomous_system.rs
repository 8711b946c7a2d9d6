//! Autonomous systems and peerings.

use super::error::ConfigurationError;
use ipnet::{IpNet, Ipv4Net};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Reference to a declared autonomous system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AsHandle(u32);

impl AsHandle {
    pub(crate) fn new(asn: u32) -> Self {
        Self(asn)
    }

    pub fn asn(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}

/// What kind of routing domain an AS is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsKind {
    /// External AS with plain BGP routers
    Basic,
    /// SDN-controlled AS whose routers are BGP speakers feeding the controllers
    Sdn { controllers: Vec<IpAddr> },
}

/// A declared autonomous system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutonomousSystem {
    pub asn: u32,
    pub kind: AsKind,
    /// Prefixes advertised by every router of the AS
    pub routes: Vec<IpNet>,
    /// Router node names, router index 1 first
    pub routers: Vec<String>,
}

impl AutonomousSystem {
    pub fn new(asn: u32, kind: AsKind, routes: Vec<IpNet>, router_count: usize) -> Self {
        let routers = (1..=router_count).map(|index| Self::router_name(asn, index)).collect();
        Self { asn, kind, routes, routers }
    }

    /// Node name of the router with 1-based `index`
    ///
    /// # Examples
    /// ```
    /// use routinglab::topology::AutonomousSystem;
    ///
    /// assert_eq!(AutonomousSystem::router_name(65001, 1), "as65001r1");
    /// ```
    pub fn router_name(asn: u32, index: usize) -> String {
        format!("as{}r{}", asn, index)
    }

    pub fn handle(&self) -> AsHandle {
        AsHandle::new(self.asn)
    }

    /// Look up a router by its 1-based index
    pub fn router(&self, index: usize) -> Result<&str, ConfigurationError> {
        index
            .checked_sub(1)
            .and_then(|i| self.routers.get(i))
            .map(String::as_str)
            .ok_or(ConfigurationError::RouterIndexOutOfRange {
                asn: self.asn,
                index,
                routers: self.routers.len(),
            })
    }

    /// IPv4 routes, the ones that get stub networks
    pub fn ipv4_routes(&self) -> impl Iterator<Item = Ipv4Net> + '_ {
        self.routes.iter().filter_map(|route| match route {
            IpNet::V4(v4) => Some(*v4),
            IpNet::V6(_) => None,
        })
    }

    /// FPM target for the routers of an SDN AS
    pub fn fpm_controller(&self) -> Option<IpAddr> {
        match &self.kind {
            AsKind::Sdn { controllers } => controllers.first().copied(),
            AsKind::Basic => None,
        }
    }
}

/// Router choice and tagging for a peering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeeringOptions {
    /// 1-based router index in the first AS
    pub router_a: usize,
    /// 1-based router index in the second AS
    pub router_b: usize,
    pub use_vlan: bool,
}

impl Default for PeeringOptions {
    fn default() -> Self {
        Self { router_a: 1, router_b: 1, use_vlan: false }
    }
}

impl PeeringOptions {
    pub fn vlan() -> Self {
        Self { use_vlan: true, ..Default::default() }
    }

    pub fn routers(mut self, router_a: usize, router_b: usize) -> Self {
        self.router_a = router_a;
        self.router_b = router_b;
        self
    }
}

/// One side of a realized peering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeeringEnd {
    pub asn: u32,
    pub router: String,
    pub interface: String,
    pub address: Ipv4Net,
}

/// A BGP adjacency between two AS border routers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peering {
    pub a: PeeringEnd,
    pub b: PeeringEnd,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    pub subnet: Ipv4Net,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_lookup_is_one_based() {
        let system = AutonomousSystem::new(65000, AsKind::Basic, vec![], 2);
        assert_eq!(system.router(1).unwrap(), "as65000r1");
        assert_eq!(system.router(2).unwrap(), "as65000r2");
        assert_eq!(
            system.router(0).unwrap_err(),
            ConfigurationError::RouterIndexOutOfRange { asn: 65000, index: 0, routers: 2 }
        );
        assert!(system.router(3).is_err());
    }

    #[test]
    fn test_fpm_controller() {
        let controller: IpAddr = "192.168.56.11".parse().unwrap();
        let sdn = AutonomousSystem::new(65000, AsKind::Sdn { controllers: vec![controller] }, vec![], 1);
        assert_eq!(sdn.fpm_controller(), Some(controller));
        let basic = AutonomousSystem::new(65001, AsKind::Basic, vec![], 1);
        assert_eq!(basic.fpm_controller(), None);
    }

    #[test]
    fn test_ipv4_routes() {
        let routes = vec!["10.1.0.0/16".parse().unwrap(), "2001:db8::/32".parse().unwrap()];
        let system = AutonomousSystem::new(65001, AsKind::Basic, routes, 1);
        assert_eq!(system.ipv4_routes().count(), 1);
    }
}
