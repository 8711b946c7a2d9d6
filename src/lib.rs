//! # Routinglab - Deterministic topology builder for emulated BGP/SDN fabrics
//!
//! This library turns a declarative description of autonomous systems,
//! switches, hosts and controllers into an emulated network topology,
//! together with everything needed to bring it up: per-router Quagga/FRR
//! configuration files, an ordered process plan for the per-node daemons
//! and a controller network configuration document.
//!
//! ## Architecture
//!
//! - `config`: Typed YAML configuration structures and validation
//! - `config_loader`: Configuration file loading and CLI overrides
//! - `ip`: Address registry, peering pool and VLAN allocation
//! - `topology`: Fabric data model, host profiles and the topology builder
//! - `routing`: bgpd/zebra configuration generation
//! - `process`: Interface setup and daemon lifecycle planning
//! - `netcfg`: Controller device configuration
//! - `utils`: MAC addresses, datapath ids and name validation
//! - `orchestrator`: High-level orchestration of output generation
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use routinglab::{config_loader, orchestrator};
//! use std::path::Path;
//!
//! let config = config_loader::load_config(Path::new("fabric.yaml"))?;
//! let summary = orchestrator::generate(&config, Path::new("routinglab_output"), false)?;
//! println!("{} routers configured", summary.routers);
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! controllers:
//!   instances: 1
//! switches:
//!   - name: s1
//! autonomous_systems:
//!   - asn: 65000
//!     sdn: true
//!     links:
//!       - to: s1
//!   - asn: 65001
//!     routes: [10.1.0.0/16]
//! peerings:
//!   - a: 65001
//!     b: 65000
//!     vlan: true
//! ```
//!
//! ## Error Handling
//!
//! Builder operations return typed [`topology::BuildError`]s. The loader and
//! orchestrator wrap them with `color_eyre` context.

pub mod config;
pub mod config_loader;
pub mod ip;
pub mod netcfg;
pub mod orchestrator;
pub mod process;
pub mod routing;
pub mod topology;
pub mod utils;
