//! Controller network configuration.
//!
//! Describes every OpenFlow switch of the fabric to the SDN controller,
//! keyed by its `of:<dpid>` device id.

use crate::topology::{NodeRole, Topology};
use crate::utils::device_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicDeviceConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub basic: BasicDeviceConfig,
}

/// Network configuration document pushed to the controller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub devices: BTreeMap<String, DeviceConfig>,
}

impl NetworkConfig {
    /// Collect the OpenFlow switches of `topology`
    ///
    /// `driver` is attached to every device when set.
    pub fn from_topology(topology: &Topology, driver: Option<&str>) -> Self {
        let devices = topology
            .nodes_with_role(NodeRole::Switch)
            .filter_map(|node| {
                let params = node.switch.as_ref()?;
                let dpid = params.dpid.as_deref()?;
                let basic = BasicDeviceConfig {
                    name: node.name.clone(),
                    driver: driver.map(str::to_string),
                    latitude: params.latitude,
                    longitude: params.longitude,
                };
                Some((device_id(dpid), DeviceConfig { basic }))
            })
            .collect();
        Self { devices }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
