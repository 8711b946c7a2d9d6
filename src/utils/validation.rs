//! Declaration validation utilities.
//!
//! This module provides the name and prefix checks shared by the topology
//! builder and the YAML configuration layer.

use ipnet::Ipv4Net;
use regex::Regex;
use std::sync::OnceLock;

/// Longest user-chosen node name, leaving room for `-eth<NN>` within IFNAMSIZ
pub const MAX_NODE_NAME_LEN: usize = 10;

/// Linux IFNAMSIZ minus the terminating NUL
pub const MAX_IFNAME_LEN: usize = 15;

fn node_name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("static regex"))
}

/// Validate a node name
///
/// Node names become the prefix of every interface name on the node
/// (`<node>-eth<N>`), and Linux caps interface names at 15 bytes.
///
/// # Examples
/// ```
/// use routinglab::utils::validation::validate_node_name;
///
/// assert!(validate_node_name("as65001r1").is_ok());
/// assert!(validate_node_name("1router").is_err());
/// assert!(validate_node_name("a-very-long-name").is_err());
/// ```
pub fn validate_node_name(name: &str) -> Result<(), String> {
    if !node_name_regex().is_match(name) {
        return Err(format!(
            "node name '{}' must start with a letter and contain only letters, digits, '-' or '_'",
            name
        ));
    }
    if name.len() > MAX_NODE_NAME_LEN {
        return Err(format!(
            "node name '{}' is longer than {} characters",
            name, MAX_NODE_NAME_LEN
        ));
    }
    Ok(())
}

/// Kernel name of a node-local interface
///
/// Interfaces are named `<node>-<suffix>`. Generated node names such as
/// `as4200000000r1` can be too long for that, in which case the bare
/// suffix is used; it only has to be unique inside the node's namespace.
///
/// # Examples
/// ```
/// use routinglab::utils::validation::kernel_interface_name;
///
/// assert_eq!(kernel_interface_name("as65001r1", "eth0"), "as65001r1-eth0");
/// assert_eq!(kernel_interface_name("as4200000000r1", "eth0"), "eth0");
/// ```
pub fn kernel_interface_name(node: &str, suffix: &str) -> String {
    let full = format!("{}-{}", node, suffix);
    if full.len() <= MAX_IFNAME_LEN {
        full
    } else {
        suffix.to_string()
    }
}

/// Validate that a peering pool can be carved into subnets of `prefix_len`
///
/// Every peering subnet needs two usable host addresses, so the prefix
/// length is capped at /30.
pub fn validate_peering_pool(pool: &Ipv4Net, prefix_len: u8) -> Result<(), String> {
    if prefix_len > 30 {
        return Err(format!(
            "peering prefix length /{} leaves no room for two host addresses",
            prefix_len
        ));
    }
    if prefix_len < pool.prefix_len() {
        return Err(format!(
            "peering prefix length /{} is shorter than the pool {}",
            prefix_len, pool
        ));
    }
    Ok(())
}

/// Validate a VLAN range
pub fn validate_vlan_range(base: u16, max: u16) -> Result<(), String> {
    if base == 0 || max > 4094 || base > max {
        return Err(format!(
            "VLAN range {}..={} must lie within 1..=4094",
            base, max
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_names() {
        assert!(validate_node_name("h1").is_ok());
        assert!(validate_node_name("bgp_1").is_ok());
        assert!(validate_node_name("dth5").is_ok());
        assert!(validate_node_name("").is_err());
        assert!(validate_node_name("h 1").is_err());
        assert!(validate_node_name("-h1").is_err());
        assert!(validate_node_name("abcdefghijk").is_err());
    }

    #[test]
    fn test_kernel_interface_name_fits_ifnamsiz() {
        assert_eq!(kernel_interface_name("abcdefghij", "eth1"), "abcdefghij-eth1");
        assert_eq!(kernel_interface_name("abcdefghij", "bond0"), "bond0");
        assert_eq!(kernel_interface_name("as65001r100", "eth12"), "eth12");
    }

    #[test]
    fn test_peering_pool() {
        let pool: Ipv4Net = "10.0.0.0/16".parse().unwrap();
        assert!(validate_peering_pool(&pool, 30).is_ok());
        assert!(validate_peering_pool(&pool, 24).is_ok());
        assert!(validate_peering_pool(&pool, 31).is_err());
        assert!(validate_peering_pool(&pool, 8).is_err());
    }

    #[test]
    fn test_vlan_range() {
        assert!(validate_vlan_range(1, 4094).is_ok());
        assert!(validate_vlan_range(0, 10).is_err());
        assert!(validate_vlan_range(10, 5).is_err());
        assert!(validate_vlan_range(1, 4095).is_err());
    }
}
