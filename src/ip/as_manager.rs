//! Autonomous system registry.
//!
//! Keeps the declared autonomous systems keyed by AS number while
//! preserving declaration order, which is the order routers are realized in.

use crate::topology::autonomous_system::AutonomousSystem;
use crate::topology::error::ConfigurationError;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AsRegistry {
    systems: Vec<AutonomousSystem>,
    by_asn: HashMap<u32, usize>,
}

impl AsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new AS, rejecting a second declaration of the same number
    pub fn insert(&mut self, system: AutonomousSystem) -> Result<&AutonomousSystem, ConfigurationError> {
        if self.by_asn.contains_key(&system.asn) {
            return Err(ConfigurationError::DuplicateAs(system.asn));
        }
        let index = self.systems.len();
        self.by_asn.insert(system.asn, index);
        self.systems.push(system);
        Ok(&self.systems[index])
    }

    pub fn get(&self, asn: u32) -> Result<&AutonomousSystem, ConfigurationError> {
        self.by_asn
            .get(&asn)
            .map(|&index| &self.systems[index])
            .ok_or(ConfigurationError::UnknownAs(asn))
    }

    pub fn contains(&self, asn: u32) -> bool {
        self.by_asn.contains_key(&asn)
    }

    /// Systems in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &AutonomousSystem> {
        self.systems.iter()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}
