//! Network topology module.
//!
//! This module contains the fabric data model, autonomous system and
//! peering bookkeeping, host capability profiles, the controller cluster
//! layout and the builder that turns declarations into a [`Topology`].

pub mod autonomous_system;
pub mod builder;
pub mod control;
pub mod error;
pub mod graph;
pub mod host;
pub mod types;

// Re-export key types for easier access
pub use autonomous_system::{AsHandle, AsKind, AutonomousSystem, Peering, PeeringEnd, PeeringOptions};
pub use builder::{InterfaceSpec, RouterSpec, SwitchKind, SwitchSpec, TopologyBuilder};
pub use control::{ClusterSpec, ControllerCluster, ControllerInstance};
pub use error::{BuildError, ConfigurationError, PoolKind};
pub use graph::{Topology, TopologySink};
pub use host::{Addressing, Bonding, DhcpFamily, HostProfile, Service, VlanMode};
pub use types::{
    AddressBinding, BgpNeighbor, BgpSpeaker, Interface, Link, LinkEnd, Node, NodeRole, SwitchParams, ZebraSettings,
};
