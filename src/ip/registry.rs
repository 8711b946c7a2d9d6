//! Address ownership registry.
//!
//! Every address placed on an interface is recorded here together with the
//! interface that owns it. Peering subnets are checked against the registry
//! so that the pool never hands out a subnet that collides with a statically
//! declared address.

use ipnet::{IpNet, Ipv4Net};
use log::warn;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

/// Registry of every address declared in a topology
#[derive(Debug, Default)]
pub struct AddressRegistry {
    /// Address -> owning interface ("node/interface")
    owners: HashMap<IpAddr, String>,
    /// Claimed addresses in registration order
    claimed: Vec<IpNet>,
    /// Addresses that will be claimed later, kept out of the peering pool
    reserved: HashSet<IpAddr>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `address` as owned by `owner`.
    ///
    /// Reusing an address on a different owner is legal (separate ASes often
    /// number their stub networks identically) but is logged, since it is
    /// usually a typo in hand-written topologies.
    ///
    /// # Returns
    ///
    /// The previous owner if the address was already held by someone else.
    pub fn claim(&mut self, address: IpNet, owner: &str) -> Option<String> {
        let ip = address.addr();
        let previous = match self.owners.get(&ip) {
            Some(existing) if existing != owner => Some(existing.clone()),
            Some(_) => return None,
            None => None,
        };

        if let Some(existing) = &previous {
            warn!("Address {} on {} is already assigned to {}", ip, owner, existing);
        } else {
            self.owners.insert(ip, owner.to_string());
        }
        self.claimed.push(address);
        previous
    }

    /// Keep `address` out of the peering pool before its owner exists
    pub fn reserve(&mut self, address: IpNet) {
        self.reserved.insert(address.addr());
    }

    pub fn is_claimed(&self, ip: &IpAddr) -> bool {
        self.owners.contains_key(ip)
    }

    /// Get the interface that owns a given address
    pub fn owner_of(&self, ip: &IpAddr) -> Option<&str> {
        self.owners.get(ip).map(String::as_str)
    }

    /// Whether any registered or reserved IPv4 address falls inside `subnet`
    pub fn overlaps(&self, subnet: &Ipv4Net) -> bool {
        self.owners.keys().chain(&self.reserved).any(|ip| match ip {
            IpAddr::V4(v4) => subnet.contains(v4),
            IpAddr::V6(_) => false,
        })
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// All claimed prefixes in registration order
    pub fn claimed(&self) -> &[IpNet] {
        &self.claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_and_lookup() {
        let mut registry = AddressRegistry::new();
        let addr: IpNet = "10.0.0.1/30".parse().unwrap();
        assert_eq!(registry.claim(addr, "as1r1/as1r1-eth0"), None);
        assert_eq!(registry.owner_of(&addr.addr()), Some("as1r1/as1r1-eth0"));
        assert!(registry.is_claimed(&addr.addr()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_claim_reports_previous_owner() {
        let mut registry = AddressRegistry::new();
        let addr: IpNet = "192.168.1.1/24".parse().unwrap();
        registry.claim(addr, "h1/h1-eth0");
        assert_eq!(registry.claim(addr, "h1/h1-eth0"), None);
        assert_eq!(registry.claim(addr, "h2/h2-eth0"), Some("h1/h1-eth0".to_string()));
        assert_eq!(registry.owner_of(&addr.addr()), Some("h1/h1-eth0"));
    }

    #[test]
    fn test_overlaps() {
        let mut registry = AddressRegistry::new();
        registry.claim("10.0.0.5/24".parse().unwrap(), "h1/h1-eth0");
        registry.claim("2000::1/64".parse().unwrap(), "h1/h1-eth0");
        assert!(registry.overlaps(&"10.0.0.4/30".parse().unwrap()));
        assert!(!registry.overlaps(&"10.0.0.0/30".parse().unwrap()));
    }

    #[test]
    fn test_reserved_addresses_overlap_without_owner() {
        let mut registry = AddressRegistry::new();
        registry.reserve("10.0.0.1/24".parse().unwrap());
        assert!(registry.overlaps(&"10.0.0.0/30".parse().unwrap()));
        assert!(!registry.is_claimed(&"10.0.0.1".parse().unwrap()));
        assert!(registry.is_empty());
    }
}
