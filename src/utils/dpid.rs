//! OpenFlow datapath identifiers.

use regex::Regex;
use std::sync::OnceLock;

fn digits_regex() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

/// Normalize a user supplied DPID to 16 lower-case hex digits.
///
/// Colons are stripped and the value is left-padded, so `"226"`,
/// `"00:00:00:00:00:00:02:26"` and `"0000000000000226"` are all the same datapath.
pub fn normalize_dpid(dpid: &str) -> Result<String, String> {
    let hex: String = dpid.chars().filter(|c| *c != ':').collect();
    if hex.is_empty() || hex.len() > 16 {
        return Err(format!("DPID '{}' must have between 1 and 16 hex digits", dpid));
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("DPID '{}' is not hexadecimal", dpid));
    }
    Ok(format!("{:0>16}", hex.to_ascii_lowercase()))
}

/// Derive a DPID from the first decimal number in a switch name (`s204` -> `00000000000000cc`).
pub fn default_dpid(name: &str) -> Option<String> {
    let digits = digits_regex().find(name)?;
    let value: u64 = digits.as_str().parse().ok()?;
    Some(format!("{:016x}", value))
}

/// Controller device identifier for an OpenFlow switch
pub fn device_id(dpid: &str) -> String {
    format!("of:{}", dpid)
}
