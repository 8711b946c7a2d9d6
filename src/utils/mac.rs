//! MAC address handling.
//!
//! Hosts and router interfaces may be pinned to a MAC address. The DHCPv6
//! server additionally needs the EUI-64 link-local address derived from it.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// A 48-bit Ethernet MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Derive the IPv6 link-local address (EUI-64) for this MAC.
    ///
    /// The universal/local bit of the first octet is inverted and `ff:fe` is
    /// inserted between the third and fourth octets.
    ///
    /// ```
    /// use routinglab::utils::mac::MacAddr;
    ///
    /// let mac: MacAddr = "00:99:66:00:00:01".parse().unwrap();
    /// assert_eq!(mac.ipv6_link_local().to_string(), "fe80::299:66ff:fe00:1");
    /// ```
    pub fn ipv6_link_local(&self) -> Ipv6Addr {
        let b = self.0;
        Ipv6Addr::new(
            0xfe80,
            0,
            0,
            0,
            u16::from_be_bytes([b[0] ^ 0x02, b[1]]),
            u16::from_be_bytes([b[2], 0xff]),
            u16::from_be_bytes([0xfe, b[3]]),
            u16::from_be_bytes([b[4], b[5]]),
        )
    }
}

impl FromStr for MacAddr {
    type Err = String;

    /// Accepts `00:aa:00:00:00:01`, `00-aa-00-00-00-01`, `00aa.0000.0001` and bare hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .chars()
            .filter(|c| !matches!(c, ':' | '-' | '.' | ' '))
            .collect();
        if digits.len() != 12 {
            return Err(format!("invalid MAC address '{}'", s));
        }
        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[2 * i..2 * i + 2], 16)
                .map_err(|_| format!("invalid MAC address '{}'", s))?;
        }
        Ok(MacAddr(bytes))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl Serialize for MacAddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_separators() {
        let colon: MacAddr = "00:AA:00:00:00:01".parse().unwrap();
        let dash: MacAddr = "00-aa-00-00-00-01".parse().unwrap();
        let dotted: MacAddr = "00aa.0000.0001".parse().unwrap();
        assert_eq!(colon, dash);
        assert_eq!(colon, dotted);
        assert_eq!(colon.to_string(), "00:aa:00:00:00:01");
    }

    #[test]
    fn test_parse_invalid() {
        assert!("00:aa:00:00:00".parse::<MacAddr>().is_err());
        assert!("zz:aa:00:00:00:01".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_link_local_flips_universal_bit() {
        let mac: MacAddr = "02:00:00:00:00:01".parse().unwrap();
        assert_eq!(mac.ipv6_link_local().to_string(), "fe80::ff:fe00:1");
    }

    #[test]
    fn test_serde_as_string() {
        let mac: MacAddr = serde_yaml::from_str("\"00:88:00:00:00:02\"").unwrap();
        assert_eq!(mac.0, [0, 0x88, 0, 0, 0, 2]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"00:88:00:00:00:02\"");
    }
}
