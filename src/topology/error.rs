//! Topology construction errors.
//!
//! All errors are raised synchronously while declaring or building a
//! topology. None of them is retried: a failed build aborts the session.

use std::fmt;

/// Invalid declarations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("duplicate node name '{0}'")]
    DuplicateName(String),

    #[error("invalid node name: {0}")]
    InvalidName(String),

    #[error("AS {0} is declared more than once")]
    DuplicateAs(u32),

    #[error("AS {0} has not been declared")]
    UnknownAs(u32),

    #[error("AS {asn} needs at least one router")]
    NoRouters { asn: u32 },

    #[error("router index {index} is out of range for AS {asn} with {routers} router(s)")]
    RouterIndexOutOfRange { asn: u32, index: usize, routers: usize },

    #[error("AS {0} cannot peer with itself")]
    SelfPeering(u32),

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("node '{0}' cannot be linked to itself")]
    SelfLink(String),

    #[error("malformed prefix '{prefix}': {reason}")]
    MalformedPrefix { prefix: String, reason: String },

    #[error("invalid address policy: {0}")]
    InvalidPolicy(String),

    #[error("invalid switch '{name}': {reason}")]
    InvalidSwitch { name: String, reason: String },

    #[error("invalid host '{name}': {reason}")]
    InvalidHost { name: String, reason: String },
}

/// The pool an allocation was drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Vlan,
    Subnet,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Vlan => write!(f, "VLAN"),
            PoolKind::Subnet => write!(f, "subnet"),
        }
    }
}

/// Errors returned by [`crate::topology::TopologyBuilder`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("topology has already been built")]
    AlreadyBuilt,

    #[error("{pool} pool exhausted while peering AS {as_a} with AS {as_b}")]
    AllocationExhausted { pool: PoolKind, as_a: u32, as_b: u32 },
}
