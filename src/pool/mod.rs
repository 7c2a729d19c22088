//! Address pools.
//!
//! A pool is a named [`AddressRange`] that administrators configure and
//! services reference by name. Pools are grouped into a validated
//! [`PoolSet`] per configuration epoch.

pub mod range;
pub mod set;

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::AllocError;

pub use range::{AddressIter, AddressRange, Family};
pub use set::PoolSet;

fn default_auto_assign() -> bool {
    true
}

/// Remote announcement settings attached to a pool definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceSpec {
    /// Group URL on the remote gateway
    pub url: String,
}

/// One pool as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDefinition {
    pub name: String,
    /// Range text: CIDR, `start-end`, or a single address
    pub pool: String,
    /// Eligible for any-pool allocation. Pools with this unset only serve
    /// explicit address or pool-name requests.
    #[serde(default = "default_auto_assign")]
    pub auto_assign: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce: Option<AnnounceSpec>,
}

impl PoolDefinition {
    pub fn new(name: &str, pool: &str) -> Self {
        PoolDefinition {
            name: name.to_string(),
            pool: pool.to_string(),
            auto_assign: true,
            announce: None,
        }
    }

    /// Mark the pool as explicit-request only
    pub fn explicit_only(mut self) -> Self {
        self.auto_assign = false;
        self
    }
}

/// A validated pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    definition: PoolDefinition,
    range: AddressRange,
}

impl Pool {
    /// Parse a definition into a pool. The pool name is carried on failure.
    pub fn from_definition(definition: &PoolDefinition) -> Result<Self, AllocError> {
        if definition.name.trim().is_empty() {
            return Err(AllocError::InvalidPoolConfig {
                pool: definition.name.clone(),
                reason: "pool name cannot be empty".to_string(),
            });
        }
        let range =
            AddressRange::parse(&definition.pool).map_err(|e| AllocError::InvalidPoolConfig {
                pool: definition.name.clone(),
                reason: e.to_string(),
            })?;
        Ok(Pool {
            definition: definition.clone(),
            range,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn range(&self) -> &AddressRange {
        &self.range
    }

    pub fn auto_assign(&self) -> bool {
        self.definition.auto_assign
    }

    pub fn definition(&self) -> &PoolDefinition {
        &self.definition
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.range.contains(addr)
    }

    pub fn size(&self) -> u128 {
        self.range.size()
    }

    pub fn iter(&self) -> AddressIter {
        self.range.iter()
    }

    pub fn overlaps(&self, other: &Pool) -> bool {
        self.range.overlaps(&other.range)
    }
}
