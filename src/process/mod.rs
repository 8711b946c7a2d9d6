//! Process planning module.
//!
//! This module turns a realized topology into the desired state of every
//! node (interface setup and daemons) and defines the supervisor interface
//! used to bring that state up and down.

pub mod plan;
pub mod supervisor;
pub mod types;

// Re-export commonly used items for convenience
pub use plan::{plan_node, plan_topology};
pub use supervisor::{launch, shutdown, ProcessSupervisor, SupervisorError};
pub use types::{DaemonKind, DaemonPaths, DaemonSpec, InterfaceAction, IpFamily, NodePlan, Plan, VlanProtocol};
