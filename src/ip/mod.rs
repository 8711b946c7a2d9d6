//! Deterministic address management.
//!
//! Peering VLANs and subnets are handed out from fixed pools in declaration
//! order, so the same declarations always produce the same addresses. This
//! lets router configuration files be rendered in a separate pass and still
//! match the interface addresses of the emulated fabric.

pub mod allocator;
pub mod as_manager;
pub mod registry;
pub mod routes;

pub use allocator::{peering_addresses, AddressPolicy, PeeringAllocator};
pub use as_manager::AsRegistry;
pub use registry::AddressRegistry;
pub use routes::{generate_routes, stub_addresses};
