//! Route prefix helpers.

use ipnet::{IpNet, Ipv4Net};
use std::net::Ipv4Addr;

/// Split `base` into `count` equal subnets.
///
/// Uses the smallest prefix length that fits `count` subnets and returns
/// the first `count` of them in address order.
///
/// # Examples
///
/// ```
/// use routinglab::ip::generate_routes;
///
/// let routes = generate_routes("192.168.0.0/16".parse().unwrap(), 3).unwrap();
/// let routes: Vec<String> = routes.iter().map(|r| r.to_string()).collect();
/// assert_eq!(routes, ["192.168.0.0/18", "192.168.64.0/18", "192.168.128.0/18"]);
/// ```
pub fn generate_routes(base: IpNet, count: usize) -> Result<Vec<IpNet>, String> {
    if count == 0 {
        return Err("route count must be at least 1".to_string());
    }
    let base = base.trunc();
    let extra_bits = usize::BITS - (count - 1).leading_zeros();
    let new_len = u32::from(base.prefix_len()) + extra_bits;
    if new_len > u32::from(base.max_prefix_len()) {
        return Err(format!("{} cannot be split into {} subnets", base, count));
    }

    let subnets = base
        .subnets(new_len as u8)
        .map_err(|e| format!("{} cannot be split into {} subnets: {}", base, count, e))?;
    Ok(subnets.take(count).collect())
}

/// Addresses of a stub network behind a router.
///
/// # Returns
///
/// `(gateway, host)`: the last usable address of `route` for the router and
/// the first usable one for the host, both with the route's prefix length.
pub fn stub_addresses(route: &Ipv4Net) -> Result<(Ipv4Net, Ipv4Net), String> {
    if route.prefix_len() > 30 {
        return Err(format!("{} has no room for a router and a host", route));
    }
    let network = u32::from(route.network());
    let broadcast = u32::from(route.broadcast());
    let with_len = |ip: u32| Ipv4Net::new(Ipv4Addr::from(ip), route.prefix_len()).map_err(|e| e.to_string());

    Ok((with_len(broadcast - 1)?, with_len(network + 1)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_route_is_base() {
        let routes = generate_routes("10.1.0.0/16".parse().unwrap(), 1).unwrap();
        assert_eq!(routes, vec!["10.1.0.0/16".parse::<IpNet>().unwrap()]);
    }

    #[test]
    fn test_power_of_two_count() {
        let routes = generate_routes("10.0.0.0/8".parse().unwrap(), 4).unwrap();
        assert_eq!(routes.len(), 4);
        assert!(routes.iter().all(|r| r.prefix_len() == 10));
        assert_eq!(routes[3].to_string(), "10.192.0.0/10");
    }

    #[test]
    fn test_host_bits_are_truncated() {
        let routes = generate_routes("10.1.2.3/16".parse().unwrap(), 2).unwrap();
        assert_eq!(routes[0].to_string(), "10.1.0.0/17");
    }

    #[test]
    fn test_invalid_counts() {
        assert!(generate_routes("10.0.0.0/31".parse().unwrap(), 3).is_err());
        assert!(generate_routes("10.0.0.0/8".parse().unwrap(), 0).is_err());
    }

    #[test]
    fn test_ipv6_routes() {
        let routes = generate_routes("2001:db8::/32".parse().unwrap(), 2).unwrap();
        assert_eq!(routes[1].to_string(), "2001:db8:8000::/33");
    }

    #[test]
    fn test_stub_addresses() {
        let (gateway, host) = stub_addresses(&"192.168.1.0/24".parse().unwrap()).unwrap();
        assert_eq!(gateway.to_string(), "192.168.1.254/24");
        assert_eq!(host.to_string(), "192.168.1.1/24");

        assert!(stub_addresses(&"192.168.1.0/31".parse().unwrap()).is_err());
    }
}
