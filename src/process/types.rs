//! Process type definitions.
//!
//! This file contains the desired-state description handed to the process
//! supervisor: which daemons run on which node, with which interfaces and
//! files, and how each node's interfaces are set up before they start.

use crate::utils::MacAddr;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv6Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Daemons the supervisor can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonKind {
    Zebra,
    Bgpd,
    Dhclient,
    Dhclient6,
    Dhcpd,
    Dhcpd6,
    Dhcrelay,
}

impl DaemonKind {
    /// Get the string representation of the daemon kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonKind::Zebra => "zebra",
            DaemonKind::Bgpd => "bgpd",
            DaemonKind::Dhclient => "dhclient",
            DaemonKind::Dhclient6 => "dhclient6",
            DaemonKind::Dhcpd => "dhcpd",
            DaemonKind::Dhcpd6 => "dhcpd6",
            DaemonKind::Dhcrelay => "dhcrelay",
        }
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpFamily {
    V4,
    V6,
}

/// VLAN tagging protocol of a sub-interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VlanProtocol {
    #[serde(rename = "802.1Q")]
    Dot1Q,
    #[serde(rename = "802.1ad")]
    Dot1Ad,
}

/// Interface setup step, applied in order before any daemon starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InterfaceAction {
    /// Remove addresses, all families when `family` is unset
    Flush {
        interface: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        family: Option<IpFamily>,
    },
    SetMac {
        interface: String,
        mac: MacAddr,
    },
    /// `balance-xor` bond with miimon 100 and the layer2+3 hash policy
    AddBond {
        name: String,
        members: Vec<String>,
    },
    AddVlan {
        parent: String,
        name: String,
        vlan: u16,
        protocol: VlanProtocol,
    },
    AddAddress {
        interface: String,
        address: IpNet,
    },
    /// IPv6 link-local address derived from the interface MAC
    AddLinkLocal {
        interface: String,
        address: Ipv6Addr,
    },
    DefaultRoute {
        via: IpAddr,
    },
    /// Turn off rx, tx and scatter-gather offload
    DisableOffload {
        interface: String,
    },
}

/// A daemon to run on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonSpec {
    pub node: String,
    pub kind: DaemonKind,
    pub binary: PathBuf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub pid_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_file: Option<PathBuf>,
    /// Upstream DHCP server of a relay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<IpAddr>,
}

impl DaemonSpec {
    /// Human readable "<daemon> on <node>"
    pub fn label(&self) -> String {
        format!("{} on {}", self.kind.as_str(), self.node)
    }
}

fn is_true(value: &bool) -> bool {
    *value
}

fn default_in_namespace() -> bool {
    true
}

/// Desired state of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePlan {
    pub node: String,
    #[serde(default = "default_in_namespace", skip_serializing_if = "is_true")]
    pub in_namespace: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interface_setup: Vec<InterfaceAction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daemons: Vec<DaemonSpec>,
}

/// Desired state of every node, in topology order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// How long the supervisor waits for each daemon to come up
    #[serde(with = "humantime_serde")]
    pub ready_timeout: Duration,
    pub nodes: Vec<NodePlan>,
}

impl Plan {
    /// All daemons in start order
    pub fn daemons(&self) -> impl DoubleEndedIterator<Item = &DaemonSpec> {
        self.nodes.iter().flat_map(|n| n.daemons.iter())
    }

    pub fn node(&self, name: &str) -> Option<&NodePlan> {
        self.nodes.iter().find(|n| n.node == name)
    }
}

/// Binary and state file locations of the supervised daemons
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonPaths {
    #[serde(default = "default_zebra")]
    pub zebra: PathBuf,
    #[serde(default = "default_bgpd")]
    pub bgpd: PathBuf,
    #[serde(default = "default_dhclient")]
    pub dhclient: PathBuf,
    #[serde(default = "default_dhcpd")]
    pub dhcpd: PathBuf,
    #[serde(default = "default_dhcrelay")]
    pub dhcrelay: PathBuf,
    /// Directory holding the rendered router configuration files
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,
    #[serde(default = "default_lease_dir")]
    pub lease_dir: PathBuf,
    #[serde(default = "default_dhcpd_config")]
    pub dhcpd_config: PathBuf,
    #[serde(default = "default_dhcpd6_config")]
    pub dhcpd6_config: PathBuf,
}

fn default_zebra() -> PathBuf {
    PathBuf::from("/usr/lib/quagga/zebra")
}

fn default_bgpd() -> PathBuf {
    PathBuf::from("/usr/lib/quagga/bgpd")
}

fn default_dhclient() -> PathBuf {
    PathBuf::from("/sbin/dhclient")
}

fn default_dhcpd() -> PathBuf {
    PathBuf::from("/usr/sbin/dhcpd")
}

fn default_dhcrelay() -> PathBuf {
    PathBuf::from("/usr/sbin/dhcrelay")
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("configs")
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("/run")
}

fn default_lease_dir() -> PathBuf {
    PathBuf::from("/var/lib/dhcp")
}

fn default_dhcpd_config() -> PathBuf {
    PathBuf::from("./dhcpd.conf")
}

fn default_dhcpd6_config() -> PathBuf {
    PathBuf::from("./dhcpd6.conf")
}

impl Default for DaemonPaths {
    fn default() -> Self {
        Self {
            zebra: default_zebra(),
            bgpd: default_bgpd(),
            dhclient: default_dhclient(),
            dhcpd: default_dhcpd(),
            dhcrelay: default_dhcrelay(),
            config_dir: default_config_dir(),
            run_dir: default_run_dir(),
            lease_dir: default_lease_dir(),
            dhcpd_config: default_dhcpd_config(),
            dhcpd6_config: default_dhcpd6_config(),
        }
    }
}

impl DaemonPaths {
    pub fn binary(&self, kind: DaemonKind) -> PathBuf {
        match kind {
            DaemonKind::Zebra => self.zebra.clone(),
            DaemonKind::Bgpd => self.bgpd.clone(),
            DaemonKind::Dhclient | DaemonKind::Dhclient6 => self.dhclient.clone(),
            DaemonKind::Dhcpd | DaemonKind::Dhcpd6 => self.dhcpd.clone(),
            DaemonKind::Dhcrelay => self.dhcrelay.clone(),
        }
    }

    /// Pid file of `kind` on `node`
    pub fn pid_file(&self, kind: DaemonKind, node: &str) -> PathBuf {
        self.run_dir.join(format!("{}-{}.pid", kind.as_str(), node))
    }

    /// Lease file of the DHCP daemons, `None` for the others
    pub fn lease_file(&self, kind: DaemonKind, node: &str) -> Option<PathBuf> {
        let name = match kind {
            DaemonKind::Dhclient => format!("dhcpclient-{}.lease", node),
            DaemonKind::Dhclient6 => format!("dhcpclient6-{}.lease", node),
            DaemonKind::Dhcpd => format!("dhcpd-{}.leases", node),
            DaemonKind::Dhcpd6 => format!("dhcpd6-{}.leases", node),
            DaemonKind::Zebra | DaemonKind::Bgpd | DaemonKind::Dhcrelay => return None,
        };
        Some(self.lease_dir.join(name))
    }
}
