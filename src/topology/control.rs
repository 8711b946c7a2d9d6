//! SDN controller cluster layout.
//!
//! Controllers sit on a dedicated control bridge. A host in the root
//! network namespace joins the same bridge at the highest usable address,
//! which lets switches started outside the emulation reach the
//! controllers. An optional data subnet adds a second bridge with one extra
//! interface per controller.

use super::error::ConfigurationError;
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Declaration of a controller cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default = "default_control_subnet")]
    pub control_subnet: Ipv4Net,
    #[serde(default = "default_instances")]
    pub instances: usize,
    #[serde(default = "default_basename")]
    pub basename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_subnet: Option<Ipv4Net>,
    #[serde(default = "default_control_bridge")]
    pub control_bridge: String,
    #[serde(default = "default_data_bridge")]
    pub data_bridge: String,
    #[serde(default = "default_root_host")]
    pub root_host: String,
}

fn default_control_subnet() -> Ipv4Net {
    Ipv4Net::new(Ipv4Addr::new(192, 168, 1, 0), 24).unwrap_or_default()
}

fn default_instances() -> usize {
    1
}

fn default_basename() -> String {
    "ONOS".to_string()
}

fn default_control_bridge() -> String {
    "cs0".to_string()
}

fn default_data_bridge() -> String {
    "cs1".to_string()
}

fn default_root_host() -> String {
    "root".to_string()
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            control_subnet: default_control_subnet(),
            instances: default_instances(),
            basename: default_basename(),
            data_subnet: None,
            control_bridge: default_control_bridge(),
            data_bridge: default_data_bridge(),
            root_host: default_root_host(),
        }
    }
}

/// Addresses of one controller instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerInstance {
    pub name: String,
    pub control_address: Ipv4Net,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_address: Option<Ipv4Net>,
}

/// Resolved names and addresses of a controller cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerCluster {
    pub control_bridge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_bridge: Option<String>,
    pub instances: Vec<ControllerInstance>,
    pub root_host: String,
    pub root_address: Ipv4Net,
}

impl ControllerCluster {
    /// Control-network addresses of the controllers, in instance order
    pub fn controller_addresses(&self) -> Vec<Ipv4Addr> {
        self.instances.iter().map(|i| i.control_address.addr()).collect()
    }
}

/// `network + offset` with the subnet's prefix length
fn nth_address(subnet: &Ipv4Net, offset: u32) -> Option<Ipv4Net> {
    let ip = u32::from(subnet.network()).checked_add(offset)?;
    Ipv4Net::new(Ipv4Addr::from(ip), subnet.prefix_len()).ok()
}

fn usable_hosts(subnet: &Ipv4Net) -> u64 {
    (1u64 << (32 - u32::from(subnet.prefix_len()))).saturating_sub(2)
}

impl ClusterSpec {
    /// Resolve instance names and addresses
    pub fn layout(&self) -> Result<ControllerCluster, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidHost { name: self.basename.clone(), reason };

        if self.instances == 0 {
            return Err(invalid("a controller cluster needs at least one instance".to_string()));
        }
        // Controllers plus the root-namespace host
        if self.instances as u64 + 1 > usable_hosts(&self.control_subnet) {
            return Err(invalid(format!(
                "control subnet {} cannot hold {} controllers and the root host",
                self.control_subnet, self.instances
            )));
        }
        if let Some(data) = &self.data_subnet {
            if self.instances as u64 > usable_hosts(data) {
                return Err(invalid(format!("data subnet {} cannot hold {} controllers", data, self.instances)));
            }
        }

        let mut instances = Vec::with_capacity(self.instances);
        for i in 1..=self.instances as u32 {
            let control_address = nth_address(&self.control_subnet, i)
                .ok_or_else(|| invalid(format!("no control address for instance {}", i)))?;
            let data_address = match &self.data_subnet {
                Some(data) => {
                    Some(nth_address(data, i).ok_or_else(|| invalid(format!("no data address for instance {}", i)))?)
                }
                None => None,
            };
            instances.push(ControllerInstance {
                name: format!("{}{}", self.basename, i),
                control_address,
                data_address,
            });
        }

        let highest = u32::from(self.control_subnet.broadcast()) - 1;
        let root_address = Ipv4Net::new(Ipv4Addr::from(highest), self.control_subnet.prefix_len())
            .map_err(|e| invalid(e.to_string()))?;

        Ok(ControllerCluster {
            control_bridge: self.control_bridge.clone(),
            data_bridge: self.data_subnet.map(|_| self.data_bridge.clone()),
            instances,
            root_host: self.root_host.clone(),
            root_address,
        })
    }
}
