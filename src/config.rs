//! Declarative topology configuration.
//!
//! The YAML schema maps one-to-one onto [`crate::topology::TopologyBuilder`]
//! calls: every list is replayed in a fixed order by the orchestrator.

use crate::ip::{generate_routes, AddressPolicy};
use crate::process::DaemonPaths;
use crate::routing::RenderOptions;
use crate::topology::{
    Addressing, BgpNeighbor, Bonding, ClusterSpec, HostProfile, InterfaceSpec, RouterSpec, Service, SwitchKind,
    SwitchSpec, VlanMode, ZebraSettings,
};
use crate::utils::MacAddr;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Complete topology description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub addressing: AddressPolicy,
    #[serde(default)]
    pub daemons: DaemonPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controllers: Option<ClusterSpec>,
    #[serde(default)]
    pub switches: Vec<SwitchConfig>,
    #[serde(default)]
    pub autonomous_systems: Vec<AsConfig>,
    #[serde(default)]
    pub routers: Vec<RouterConfig>,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub peerings: Vec<PeeringConfig>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

impl Config {
    /// Validate the configuration
    ///
    /// Checks what can be checked without building: node names, address
    /// collisions and pool exhaustion are reported by the builder.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.general.ready_timeout.is_zero() {
            return Err(ValidationError::InvalidGeneral("ready_timeout must be greater than zero".to_string()));
        }
        self.addressing
            .validate()
            .map_err(|e| ValidationError::InvalidAddressing(e.to_string()))?;

        if self.controllers.is_none()
            && self.switches.is_empty()
            && self.autonomous_systems.is_empty()
            && self.routers.is_empty()
            && self.hosts.is_empty()
        {
            return Err(ValidationError::InvalidGeneral("the topology declares no nodes".to_string()));
        }

        let mut asns = HashSet::new();
        for system in &self.autonomous_systems {
            if system.asn == 0 {
                return Err(ValidationError::InvalidAutonomousSystem("AS number 0 is reserved".to_string()));
            }
            if !asns.insert(system.asn) {
                return Err(ValidationError::InvalidAutonomousSystem(format!(
                    "AS {} is declared more than once",
                    system.asn
                )));
            }
            if system.routers == 0 {
                return Err(ValidationError::InvalidAutonomousSystem(format!(
                    "AS {} needs at least one router",
                    system.asn
                )));
            }
            system.routes()?;
            if system.sdn && system.controllers.is_empty() && self.controllers.is_none() {
                return Err(ValidationError::InvalidAutonomousSystem(format!(
                    "SDN AS {} has no controllers and no controller cluster is declared",
                    system.asn
                )));
            }
        }

        for peering in &self.peerings {
            for asn in [peering.a, peering.b] {
                if !asns.contains(&asn) {
                    return Err(ValidationError::InvalidPeering(format!(
                        "AS {} is not declared",
                        asn
                    )));
                }
            }
            if peering.a == peering.b {
                return Err(ValidationError::InvalidPeering(format!("AS {} cannot peer with itself", peering.a)));
            }
        }

        let host_links = self.hosts.iter().flat_map(|h| h.links.iter().map(move |l| (h.name.as_str(), l.as_str())));
        let links = self.links.iter().map(|l| (l.a.as_str(), l.b.as_str()));
        for (a, b) in host_links.chain(links) {
            if a.is_empty() || b.is_empty() {
                return Err(ValidationError::InvalidLink("link endpoints cannot be empty".to_string()));
            }
            if a == b {
                return Err(ValidationError::InvalidLink(format!("'{}' cannot be linked to itself", a)));
            }
        }

        Ok(())
    }

    /// Get the general configuration
    pub fn general(&self) -> &GeneralConfig {
        &self.general
    }
}

/// Settings that apply to the whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub routing: RenderOptions,
    /// How long the supervisor waits for each daemon to come up
    #[serde(with = "humantime_serde", default = "default_ready_timeout")]
    pub ready_timeout: Duration,
    /// Driver announced for every OpenFlow switch in the controller config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_driver: Option<String>,
}

fn default_ready_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            routing: RenderOptions::default(),
            ready_timeout: default_ready_timeout(),
            device_driver: None,
        }
    }
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchConfig {
    pub name: String,
    #[serde(default)]
    pub kind: SwitchKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl SwitchConfig {
    pub fn spec(&self) -> SwitchSpec {
        SwitchSpec {
            kind: self.kind,
            dpid: self.dpid.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// `count` routes carved out of `base`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedRoutes {
    pub base: IpNet,
    pub count: usize,
}

/// Link from an AS router to a node outside the AS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsLinkConfig {
    #[serde(default = "one")]
    pub router: usize,
    pub to: String,
}

/// Stub host behind an AS router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedNetworkConfig {
    #[serde(default = "one")]
    pub router: usize,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsConfig {
    pub asn: u32,
    #[serde(default = "one")]
    pub routers: usize,
    #[serde(default)]
    pub routes: Vec<IpNet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_routes: Option<GeneratedRoutes>,
    /// Routers are BGP speakers of the SDN-controlled AS
    #[serde(default)]
    pub sdn: bool,
    /// FPM targets; defaults to the controller cluster when empty
    #[serde(default)]
    pub controllers: Vec<IpAddr>,
    #[serde(default)]
    pub links: Vec<AsLinkConfig>,
    #[serde(default)]
    pub routed_networks: Vec<RoutedNetworkConfig>,
}

impl AsConfig {
    /// Explicit routes followed by the generated ones
    pub fn routes(&self) -> Result<Vec<IpNet>, ValidationError> {
        let mut routes = self.routes.clone();
        if let Some(generated) = &self.generated_routes {
            let extra = generate_routes(generated.base, generated.count).map_err(|e| {
                ValidationError::InvalidAutonomousSystem(format!("AS {}: {}", self.asn, e))
            })?;
            routes.extend(extra);
        }
        Ok(routes)
    }
}

/// Stand-alone BGP router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub name: String,
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

impl RouterConfig {
    pub fn spec(&self) -> RouterSpec {
        RouterSpec {
            asn: self.asn,
            router_id: self.router_id,
            interfaces: self.interfaces.clone(),
            neighbors: self.neighbors.clone(),
            networks: self.networks.clone(),
            zebra: self.zebra.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddr>,
    #[serde(default)]
    pub addressing: Addressing,
    #[serde(default)]
    pub vlan: VlanMode,
    #[serde(default)]
    pub bonding: Bonding,
    #[serde(default)]
    pub services: Vec<Service>,
    /// Nodes this host is linked to, in interface order
    #[serde(default)]
    pub links: Vec<String>,
}

impl HostConfig {
    pub fn profile(&self) -> HostProfile {
        HostProfile {
            mac: self.mac,
            addressing: self.addressing.clone(),
            vlan: self.vlan,
            bonding: self.bonding,
            services: self.services.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeeringConfig {
    pub a: u32,
    pub b: u32,
    #[serde(default = "one")]
    pub router_a: usize,
    #[serde(default = "one")]
    pub router_b: usize,
    #[serde(default)]
    pub vlan: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: String,
    pub b: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid addressing configuration: {0}")]
    InvalidAddressing(String),
    #[error("Invalid autonomous system: {0}")]
    InvalidAutonomousSystem(String),
    #[error("Invalid peering: {0}")]
    InvalidPeering(String),
    #[error("Invalid link: {0}")]
    InvalidLink(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Target;
    use crate::topology::DhcpFamily;

    const SAMPLE: &str = r#"
general:
  ready_timeout: 10s
  device_driver: ofdpa-ovs
  routing:
    target: frr
addressing:
  vlan_base: 100
controllers:
  instances: 1
  basename: onos
switches:
  - name: s1
  - name: as6sw
    kind: bridge
autonomous_systems:
  - asn: 65000
    sdn: true
    links:
      - to: s1
  - asn: 65001
    generated_routes:
      base: 192.168.0.0/16
      count: 2
    routed_networks:
      - host: h1
peerings:
  - a: 65001
    b: 65000
    vlan: true
hosts:
  - name: h2
    addressing:
      dhcp:
        family: dual
    vlan:
      tagged:
        vlan: 20
    links: [s1]
"#;

    #[test]
    fn test_parse_sample() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.general.ready_timeout, Duration::from_secs(10));
        assert_eq!(config.general.routing.target, Target::Frr);
        assert_eq!(config.general.routing.password, "quagga");
        assert_eq!(config.addressing.vlan_base, 100);
        assert_eq!(config.switches[1].kind, SwitchKind::Bridge);
        assert_eq!(config.autonomous_systems[0].links[0].router, 1);
        assert_eq!(config.autonomous_systems[1].routes().unwrap().len(), 2);
        assert_eq!(config.peerings[0].router_b, 1);

        let profile = config.hosts[0].profile();
        assert_eq!(profile.addressing, Addressing::Dhcp { family: DhcpFamily::Dual });
        assert_eq!(profile.vlan, VlanMode::Tagged { vlan: 20 });
    }

    #[test]
    fn test_empty_topology_rejected() {
        let config: Config = serde_yaml::from_str("general: {}").unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidGeneral(_))));
    }

    #[test]
    fn test_peering_with_unknown_as_rejected() {
        let yaml = "autonomous_systems: [{asn: 1}]\npeerings: [{a: 1, b: 2}]";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidPeering(_))));
    }

    #[test]
    fn test_sdn_as_needs_controllers() {
        let config: Config = serde_yaml::from_str("autonomous_systems: [{asn: 65000, sdn: true}]").unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidAutonomousSystem(_))));
    }

    #[test]
    fn test_bad_generated_routes() {
        let yaml = "autonomous_systems: [{asn: 1, generated_routes: {base: 10.0.0.0/31, count: 4}}]";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidAutonomousSystem(_))));
    }

    #[test]
    fn test_self_link_rejected() {
        let yaml = "switches: [{name: s1}]\nlinks: [{a: s1, b: s1}]";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.validate(), Err(ValidationError::InvalidLink(_))));
    }
}
