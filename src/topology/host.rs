//! Host capability profiles.
//!
//! A host is described by a handful of orthogonal capabilities instead of a
//! class per combination: how it gets its addresses, how its primary
//! interface is tagged, whether its first two links are bonded, and which
//! DHCP services it runs.

use crate::utils::MacAddr;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Address family of a DHCP client or server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DhcpFamily {
    V4,
    V6,
    /// Both a DHCPv4 and a DHCPv6 client on the same interface
    Dual,
}

impl DhcpFamily {
    pub fn has_v4(&self) -> bool {
        matches!(self, DhcpFamily::V4 | DhcpFamily::Dual)
    }

    pub fn has_v6(&self) -> bool {
        matches!(self, DhcpFamily::V6 | DhcpFamily::Dual)
    }
}

/// How the primary interface obtains its addresses
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    /// Addresses come from interface bindings set elsewhere
    #[default]
    None,
    Static {
        ips: Vec<IpNet>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gateway: Option<IpAddr>,
    },
    Dhcp {
        family: DhcpFamily,
    },
}

/// Tagging applied to the primary interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VlanMode {
    #[default]
    Untagged,
    Tagged {
        vlan: u16,
    },
    /// 802.1ad service tag carrying an 802.1Q customer tag
    DoubleTagged {
        outer: u16,
        inner: u16,
    },
}

/// Link aggregation over the first two interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bonding {
    #[default]
    None,
    BalanceXor,
}

/// Daemons a host runs besides its address assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    DhcpServer {
        #[serde(default = "default_server_family")]
        family: DhcpFamily,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        config_file: Option<PathBuf>,
    },
    DhcpRelay {
        server: IpAddr,
        gateway: IpAddr,
    },
}

fn default_server_family() -> DhcpFamily {
    DhcpFamily::V4
}

/// Complete description of a host
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HostProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddr>,
    #[serde(default)]
    pub addressing: Addressing,
    #[serde(default)]
    pub vlan: VlanMode,
    #[serde(default)]
    pub bonding: Bonding,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

impl HostProfile {
    /// Host with static addresses and an optional default gateway
    pub fn routed(ips: Vec<IpNet>, gateway: Option<IpAddr>) -> Self {
        Self {
            addressing: Addressing::Static { ips, gateway },
            ..Default::default()
        }
    }

    /// Host that leases its addresses over DHCP
    pub fn dhcp_client(family: DhcpFamily) -> Self {
        Self {
            addressing: Addressing::Dhcp { family },
            ..Default::default()
        }
    }

    pub fn with_mac(mut self, mac: MacAddr) -> Self {
        self.mac = Some(mac);
        self
    }

    pub fn with_vlan(mut self, vlan: VlanMode) -> Self {
        self.vlan = vlan;
        self
    }

    pub fn with_bonding(mut self, bonding: Bonding) -> Self {
        self.bonding = bonding;
        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    /// Number of links the profile needs before it can be realized
    pub fn required_links(&self) -> usize {
        match self.bonding {
            Bonding::BalanceXor => 2,
            Bonding::None => 1,
        }
    }

    /// Check capability combinations that cannot be realized
    pub fn validate(&self) -> Result<(), String> {
        for service in &self.services {
            if let Service::DhcpServer { family, .. } = service {
                if *family == DhcpFamily::Dual {
                    return Err("a DHCP server serves exactly one address family".to_string());
                }
                if family.has_v6() && self.mac.is_none() {
                    return Err("a DHCPv6 server needs a MAC address for its link-local address".to_string());
                }
            }
        }
        match self.vlan {
            VlanMode::Tagged { vlan } if !(1..=4094).contains(&vlan) => {
                Err(format!("VLAN {} is out of range", vlan))
            }
            VlanMode::DoubleTagged { outer, inner }
                if !(1..=4094).contains(&outer) || !(1..=4094).contains(&inner) =>
            {
                Err(format!("VLAN pair {}/{} is out of range", outer, inner))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dhcp6_server_needs_mac() {
        let profile = HostProfile::routed(vec!["2000::3fd/120".parse().unwrap()], None)
            .with_service(Service::DhcpServer { family: DhcpFamily::V6, config_file: None });
        assert!(profile.validate().is_err());

        let profile = profile.with_mac("00:99:66:00:00:01".parse().unwrap());
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_vlan_range_checked() {
        let profile = HostProfile::dhcp_client(DhcpFamily::V4).with_vlan(VlanMode::Tagged { vlan: 5000 });
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_required_links() {
        let bonded = HostProfile::dhcp_client(DhcpFamily::V4).with_bonding(Bonding::BalanceXor);
        assert_eq!(bonded.required_links(), 2);
        assert_eq!(HostProfile::default().required_links(), 1);
    }

    #[test]
    fn test_profile_from_yaml() {
        let yaml = r#"
mac: "00:aa:00:00:00:05"
addressing:
  static:
    ips: ["10.0.2.3/24"]
    gateway: 10.0.2.254
vlan:
  double_tagged:
    outer: 100
    inner: 200
"#;
        let profile: HostProfile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(profile.vlan, VlanMode::DoubleTagged { outer: 100, inner: 200 });
        assert!(matches!(profile.addressing, Addressing::Static { ref ips, gateway: Some(_) } if ips.len() == 1));
        assert_eq!(profile.bonding, Bonding::None);
    }
}
