//! Shared utilities: MAC addresses, DPIDs, declaration validation.

pub mod dpid;
pub mod mac;
pub mod validation;

pub use dpid::{default_dpid, device_id, normalize_dpid};
pub use mac::MacAddr;
pub use validation::{kernel_interface_name, validate_node_name, validate_peering_pool, validate_vlan_range};
