//! Live assignments indexed by key and by address.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;

use super::ports::PortSet;

/// One key's hold on an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub key: String,
    pub address: IpAddr,
    pub pool: String,
    pub ports: PortSet,
    /// Empty means the address may not be shared
    pub sharing_key: String,
    /// Set when a configuration change left the address outside every pool
    pub orphaned: bool,
}

impl Assignment {
    /// True if a repeat request carries the same ports and sharing key
    pub fn same_request(&self, ports: &PortSet, sharing_key: &str) -> bool {
        self.ports == *ports && self.sharing_key == sharing_key
    }
}

/// Key -> assignment, plus address -> keys holding it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationTable {
    by_key: HashMap<String, Assignment>,
    by_address: BTreeMap<IpAddr, BTreeSet<String>>,
}

impl AllocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Assignment> {
        self.by_key.get(key)
    }

    /// Live (non-orphaned) assignments on an address
    pub fn holders(&self, address: &IpAddr) -> Vec<&Assignment> {
        self.by_address
            .get(address)
            .into_iter()
            .flatten()
            .filter_map(|key| self.by_key.get(key))
            .filter(|a| !a.orphaned)
            .collect()
    }

    /// Keys on an address, orphaned ones included
    pub fn keys_on(&self, address: &IpAddr) -> Vec<String> {
        self.by_address
            .get(address)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Record an assignment. Any previous assignment for the same key is
    /// dropped from the address index first.
    pub fn insert(&mut self, assignment: Assignment) {
        self.remove(&assignment.key);
        self.by_address
            .entry(assignment.address)
            .or_default()
            .insert(assignment.key.clone());
        self.by_key.insert(assignment.key.clone(), assignment);
    }

    /// Remove a key's assignment. The address leaves the reverse index once
    /// its last key is gone.
    pub fn remove(&mut self, key: &str) -> Option<Assignment> {
        let assignment = self.by_key.remove(key)?;
        if let Some(keys) = self.by_address.get_mut(&assignment.address) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_address.remove(&assignment.address);
            }
        }
        Some(assignment)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Assignment> {
        self.by_key.values_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.by_key.values()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
