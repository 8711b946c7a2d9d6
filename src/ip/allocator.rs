//! Peering VLAN and subnet allocation.
//!
//! VLAN IDs are counted per unordered AS pair starting at a fixed base, so
//! the n-th VLAN peering between two ASes always gets `base + n - 1`.
//! Subnets come from a single pool shared by every peering in the build and
//! are handed out in address order, skipping any subnet that already holds
//! a statically declared address.

use super::registry::AddressRegistry;
use crate::topology::error::{BuildError, ConfigurationError, PoolKind};
use crate::utils::validation::{validate_peering_pool, validate_vlan_range};
use ipnet::{Ipv4Net, Ipv4Subnets};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Bases and sizes of the peering pools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPolicy {
    #[serde(default = "default_vlan_base")]
    pub vlan_base: u16,
    #[serde(default = "default_vlan_max")]
    pub vlan_max: u16,
    #[serde(default = "default_peering_pool")]
    pub peering_pool: Ipv4Net,
    #[serde(default = "default_peering_prefix_len")]
    pub peering_prefix_len: u8,
}

fn default_vlan_base() -> u16 {
    1
}

fn default_vlan_max() -> u16 {
    4094
}

fn default_peering_pool() -> Ipv4Net {
    Ipv4Net::new(Ipv4Addr::new(10, 0, 0, 0), 16).unwrap_or_default()
}

fn default_peering_prefix_len() -> u8 {
    30
}

impl Default for AddressPolicy {
    fn default() -> Self {
        Self {
            vlan_base: default_vlan_base(),
            vlan_max: default_vlan_max(),
            peering_pool: default_peering_pool(),
            peering_prefix_len: default_peering_prefix_len(),
        }
    }
}

impl AddressPolicy {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_vlan_range(self.vlan_base, self.vlan_max).map_err(ConfigurationError::InvalidPolicy)?;
        validate_peering_pool(&self.peering_pool, self.peering_prefix_len)
            .map_err(ConfigurationError::InvalidPolicy)
    }
}

/// Split a peering subnet into the addresses of side A and side B
///
/// Side A takes the first host address and side B the second.
pub fn peering_addresses(subnet: &Ipv4Net) -> (Ipv4Net, Ipv4Net) {
    let network = u32::from(subnet.network());
    let len = subnet.prefix_len();
    // Prefix lengths are capped at /30 by the policy, so both addresses are valid.
    let side = |offset: u32| Ipv4Net::new(Ipv4Addr::from(network + offset), len).unwrap_or(*subnet);
    (side(1), side(2))
}

fn pair_key(as_a: u32, as_b: u32) -> (u32, u32) {
    (as_a.min(as_b), as_a.max(as_b))
}

/// Hands out peering VLANs and subnets in declaration order
#[derive(Debug)]
pub struct PeeringAllocator {
    policy: AddressPolicy,
    /// Next VLAN per (lower ASN, higher ASN)
    vlan_counters: HashMap<(u32, u32), u16>,
    subnets: Ipv4Subnets,
    issued: Vec<Ipv4Net>,
}

impl PeeringAllocator {
    pub fn new(policy: AddressPolicy) -> Result<Self, ConfigurationError> {
        policy.validate()?;
        let subnets = policy
            .peering_pool
            .subnets(policy.peering_prefix_len)
            .map_err(|e| ConfigurationError::InvalidPolicy(e.to_string()))?;

        Ok(Self {
            policy,
            vlan_counters: HashMap::new(),
            subnets,
            issued: Vec::new(),
        })
    }

    pub fn policy(&self) -> &AddressPolicy {
        &self.policy
    }

    /// VLAN ID the next peering between `as_a` and `as_b` would get, without taking it
    pub fn peek_vlan(&self, as_a: u32, as_b: u32) -> Result<u16, BuildError> {
        let next = self
            .vlan_counters
            .get(&pair_key(as_a, as_b))
            .copied()
            .unwrap_or(self.policy.vlan_base);
        if next > self.policy.vlan_max {
            return Err(BuildError::AllocationExhausted { pool: PoolKind::Vlan, as_a, as_b });
        }
        Ok(next)
    }

    /// Next VLAN ID for a peering between `as_a` and `as_b`
    pub fn next_vlan(&mut self, as_a: u32, as_b: u32) -> Result<u16, BuildError> {
        let vlan = self.peek_vlan(as_a, as_b)?;
        self.vlan_counters.insert(pair_key(as_a, as_b), vlan + 1);
        debug!("Allocated VLAN {} for AS {} <-> AS {}", vlan, as_a, as_b);
        Ok(vlan)
    }

    /// Next free subnet of the peering pool
    ///
    /// Subnets containing an address held in `registry` are skipped and never
    /// offered again.
    pub fn next_subnet(&mut self, as_a: u32, as_b: u32, registry: &AddressRegistry) -> Result<Ipv4Net, BuildError> {
        for subnet in self.subnets.by_ref() {
            if registry.overlaps(&subnet) {
                debug!("Skipping peering subnet {} which holds a declared address", subnet);
                continue;
            }
            self.issued.push(subnet);
            debug!("Allocated subnet {} for AS {} <-> AS {}", subnet, as_a, as_b);
            return Ok(subnet);
        }

        Err(BuildError::AllocationExhausted { pool: PoolKind::Subnet, as_a, as_b })
    }

    /// Subnets handed out so far, in allocation order
    pub fn issued_subnets(&self) -> &[Ipv4Net] {
        &self.issued
    }
}
