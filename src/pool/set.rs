//! The validated collection of pools for one configuration epoch.

use std::collections::HashMap;
use std::net::IpAddr;

use super::{Pool, PoolDefinition};
use crate::error::AllocError;

/// Pools in configured order, with no two ranges overlapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolSet {
    pools: Vec<Pool>,
    by_name: HashMap<String, usize>,
}

impl PoolSet {
    /// Validate a list of definitions.
    ///
    /// Fails on the first duplicate name, unparsable range, or overlap,
    /// naming the offending pool (the later of an overlapping pair).
    pub fn from_definitions(definitions: &[PoolDefinition]) -> Result<Self, AllocError> {
        let mut pools: Vec<Pool> = Vec::with_capacity(definitions.len());
        let mut by_name = HashMap::with_capacity(definitions.len());

        for definition in definitions {
            if by_name.contains_key(&definition.name) {
                return Err(AllocError::InvalidPoolConfig {
                    pool: definition.name.clone(),
                    reason: "duplicate pool name".to_string(),
                });
            }

            let pool = Pool::from_definition(definition)?;

            if let Some(existing) = pools.iter().find(|p| p.overlaps(&pool)) {
                return Err(AllocError::InvalidPoolConfig {
                    pool: definition.name.clone(),
                    reason: format!(
                        "range {} overlaps pool {:?} ({})",
                        pool.range(),
                        existing.name(),
                        existing.range()
                    ),
                });
            }

            by_name.insert(definition.name.clone(), pools.len());
            pools.push(pool);
        }

        Ok(PoolSet { pools, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Pool> {
        self.by_name.get(name).map(|&i| &self.pools[i])
    }

    /// The pool whose range contains `addr`. At most one can match.
    pub fn pool_for(&self, addr: &IpAddr) -> Option<&Pool> {
        self.pools.iter().find(|p| p.contains(addr))
    }

    /// Pools in configured order
    pub fn iter(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter()
    }

    /// Pools eligible for any-pool allocation, in configured order
    pub fn auto_assignable(&self) -> impl Iterator<Item = &Pool> {
        self.pools.iter().filter(|p| p.auto_assign())
    }

    pub fn definitions(&self) -> Vec<PoolDefinition> {
        self.pools.iter().map(|p| p.definition().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}
