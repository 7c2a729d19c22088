//! The allocator facade.
//!
//! Holds the active pool set and the allocation table behind one lock, so
//! every operation's read-then-write sequence runs as a single critical
//! section. Three strategies are offered, in decreasing order of caller
//! specificity: an explicit address, a named pool, or any auto-assignable
//! pool in configured order.

use parking_lot::Mutex;
use serde::Serialize;
use std::net::IpAddr;

use super::ports::PortSet;
use super::sharing::blocking_holder;
use super::table::{AllocationTable, Assignment};
use crate::error::AllocError;
use crate::pool::{Pool, PoolDefinition, PoolSet};

/// A successful allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub pool: String,
    pub address: IpAddr,
}

#[derive(Debug, Default)]
struct State {
    /// `None` until the first successful configuration
    pools: Option<PoolSet>,
    table: AllocationTable,
}

/// Check a key's existing assignment against a repeat request.
///
/// `fits` says whether the held address satisfies the request's strategy.
fn recheck_existing(
    existing: &Assignment,
    ports: &PortSet,
    sharing_key: &str,
    fits: bool,
) -> Result<Allocation, AllocError> {
    if existing.orphaned || !fits {
        return Err(AllocError::KeyAlreadyAssigned {
            key: existing.key.clone(),
            address: existing.address,
        });
    }
    if !existing.same_request(ports, sharing_key) {
        return Err(AllocError::AssignmentMismatch {
            key: existing.key.clone(),
            address: existing.address,
        });
    }
    Ok(Allocation {
        pool: existing.pool.clone(),
        address: existing.address,
    })
}

/// First address of `pool`, ascending, that admits the request
fn first_fit(
    table: &AllocationTable,
    pool: &Pool,
    ports: &PortSet,
    sharing_key: &str,
) -> Option<IpAddr> {
    pool.iter()
        .find(|addr| blocking_holder(&table.holders(addr), ports, sharing_key).is_none())
}

impl State {
    fn pools(&self) -> Result<&PoolSet, AllocError> {
        self.pools.as_ref().ok_or(AllocError::MissingConfig)
    }

    fn record(&mut self, key: &str, allocation: &Allocation, ports: &PortSet, sharing_key: &str) {
        self.table.insert(Assignment {
            key: key.to_string(),
            address: allocation.address,
            pool: allocation.pool.clone(),
            ports: ports.clone(),
            sharing_key: sharing_key.to_string(),
            orphaned: false,
        });
        log::debug!(
            "Assigned {} from pool {} to {} (ports {}, sharing key {:?})",
            allocation.address, allocation.pool, key, ports, sharing_key
        );
    }
}

/// Address pool allocator shared by every reconciliation worker
#[derive(Debug, Default)]
pub struct Allocator {
    state: Mutex<State>,
}

impl Allocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pool configuration.
    ///
    /// Either the whole list validates and replaces the active set, or
    /// nothing changes. Surviving assignments are re-homed to whichever new
    /// pool contains them; the rest are flagged orphaned until released.
    pub fn set_pools(&self, definitions: &[PoolDefinition]) -> Result<(), AllocError> {
        let pools = PoolSet::from_definitions(definitions)?;

        let mut state = self.state.lock();
        let mut orphaned = 0;
        for assignment in state.table.iter_mut() {
            match pools.pool_for(&assignment.address) {
                Some(pool) => {
                    if assignment.orphaned {
                        log::info!(
                            "Assignment of {} to {} is back in pool {}",
                            assignment.address,
                            assignment.key,
                            pool.name()
                        );
                    }
                    assignment.pool = pool.name().to_string();
                    assignment.orphaned = false;
                }
                None => {
                    if !assignment.orphaned {
                        log::warn!(
                            "Address {} held by {} is no longer in any pool, keeping it",
                            assignment.address, assignment.key
                        );
                    }
                    assignment.orphaned = true;
                    orphaned += 1;
                }
            }
        }

        log::info!("Configured {} pools ({} orphaned assignments)", pools.len(), orphaned);
        state.pools = Some(pools);
        Ok(())
    }

    /// Active pool definitions, or `None` before the first configuration
    pub fn pools(&self) -> Option<Vec<PoolDefinition>> {
        self.state.lock().pools.as_ref().map(|p| p.definitions())
    }

    /// Assign a specific address to `key`.
    ///
    /// Repeating an identical request is a no-op.
    pub fn assign(
        &self,
        key: &str,
        address: IpAddr,
        ports: &PortSet,
        sharing_key: &str,
    ) -> Result<Allocation, AllocError> {
        let mut state = self.state.lock();
        let pool = state
            .pools()?
            .pool_for(&address)
            .ok_or(AllocError::AddressNotInPool(address))?
            .name()
            .to_string();

        if let Some(existing) = state.table.get(key) {
            return recheck_existing(existing, ports, sharing_key, existing.address == address);
        }

        if let Some(holder) = blocking_holder(&state.table.holders(&address), ports, sharing_key) {
            return Err(AllocError::SharingConflict {
                address,
                holder: holder.key.clone(),
            });
        }

        let allocation = Allocation { pool, address };
        state.record(key, &allocation, ports, sharing_key);
        Ok(allocation)
    }

    /// Allocate the lowest admissible address of the named pool.
    ///
    /// Explicit-only pools are eligible here. Shared addresses count as
    /// candidates, so a full pool may still admit a compatible request.
    pub fn allocate_from_pool(
        &self,
        key: &str,
        pool_name: &str,
        ports: &PortSet,
        sharing_key: &str,
    ) -> Result<Allocation, AllocError> {
        let mut state = self.state.lock();
        let pool = state
            .pools()?
            .get(pool_name)
            .ok_or_else(|| AllocError::PoolNotFound(pool_name.to_string()))?;

        if let Some(existing) = state.table.get(key) {
            return recheck_existing(existing, ports, sharing_key, pool.contains(&existing.address));
        }

        let address = first_fit(&state.table, pool, ports, sharing_key)
            .ok_or_else(|| AllocError::PoolExhausted(pool_name.to_string()))?;

        let allocation = Allocation {
            pool: pool_name.to_string(),
            address,
        };
        state.record(key, &allocation, ports, sharing_key);
        Ok(allocation)
    }

    /// Allocate from the first auto-assignable pool, in configured order,
    /// that admits the request.
    pub fn allocate(
        &self,
        key: &str,
        ports: &PortSet,
        sharing_key: &str,
    ) -> Result<Allocation, AllocError> {
        let mut state = self.state.lock();
        let pools = state.pools()?;

        if let Some(existing) = state.table.get(key) {
            return recheck_existing(existing, ports, sharing_key, true);
        }

        let allocation = pools
            .auto_assignable()
            .find_map(|pool| {
                first_fit(&state.table, pool, ports, sharing_key).map(|address| Allocation {
                    pool: pool.name().to_string(),
                    address,
                })
            })
            .ok_or(AllocError::NoAddressAvailable)?;

        state.record(key, &allocation, ports, sharing_key);
        Ok(allocation)
    }

    /// Release `key`'s assignment. Returns true if one was removed.
    pub fn unassign(&self, key: &str) -> bool {
        match self.state.lock().table.remove(key) {
            Some(released) => {
                log::debug!("Released {} from {}", released.address, key);
                true
            }
            None => false,
        }
    }

    pub fn assignment(&self, key: &str) -> Option<Assignment> {
        self.state.lock().table.get(key).cloned()
    }

    /// All assignments, sorted by key
    pub fn assignments(&self) -> Vec<Assignment> {
        let state = self.state.lock();
        let mut all: Vec<Assignment> = state.table.iter().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }

    pub fn keys_on(&self, address: &IpAddr) -> Vec<String> {
        self.state.lock().table.keys_on(address)
    }

    /// Assignments whose address fell out of every pool
    pub fn orphaned(&self) -> Vec<Assignment> {
        self.assignments().into_iter().filter(|a| a.orphaned).collect()
    }

    /// Number of distinct addresses in use within a pool
    pub fn pool_usage(&self, pool_name: &str) -> Result<usize, AllocError> {
        let state = self.state.lock();
        let pool = state
            .pools()?
            .get(pool_name)
            .ok_or_else(|| AllocError::PoolNotFound(pool_name.to_string()))?;
        let mut used: Vec<IpAddr> = state
            .table
            .iter()
            .filter(|a| !a.orphaned && pool.contains(&a.address))
            .map(|a| a.address)
            .collect();
        used.sort();
        used.dedup();
        Ok(used.len())
    }
}
