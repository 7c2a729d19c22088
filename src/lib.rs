//! # Poolalloc - Address pool allocator for load-balanced services
//!
//! This library assigns routable addresses to load-balanced services from
//! administrator-defined pools, and keeps those assignments consistent as
//! services are created, updated, and deleted.
//!
//! ## Architecture
//!
//! - `pool`: address ranges, pools, and the validated pool set
//! - `alloc`: port sets, sharing rules, the allocation table, and the
//!   [`Allocator`](alloc::Allocator) facade
//! - `controller`: the reconciliation driver that maps service events onto
//!   allocator calls and proposes status patches
//! - `config` / `config_loader`: YAML configuration types and loading
//! - `error`: typed failures shared by all of the above
//!
//! ## Allocation Strategies
//!
//! A service gets its address by, in order of preference:
//!
//! 1. **Explicit address**: the service names the address it wants
//! 2. **Named pool**: the service names a pool through an annotation
//! 3. **Any pool**: pools are tried in configured order, addresses in
//!    ascending order, so results are reproducible given identical inputs
//!
//! Several services may share one address when they carry the same
//! non-empty sharing key and expose disjoint ports.
//!
//! ## Example Usage
//!
//! ```rust
//! use poolalloc::alloc::{Allocator, Port, PortSet};
//! use poolalloc::pool::PoolDefinition;
//!
//! let allocator = Allocator::new();
//! allocator.set_pools(&[PoolDefinition::new("default", "1.2.3.0/30")])?;
//!
//! let web: PortSet = [Port::tcp(80)].into_iter().collect();
//! let got = allocator.allocate("prod/web", &web, "")?;
//! assert_eq!(got.address.to_string(), "1.2.3.0");
//! assert_eq!(got.pool, "default");
//! # Ok::<(), poolalloc::error::AllocError>(())
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! groups:
//!   - name: default
//!     pool: 192.168.1.0/24
//!   - name: reserved
//!     pool: 192.168.2.10-192.168.2.20
//!     auto_assign: false
//! ```

pub mod alloc;
pub mod config;
pub mod config_loader;
pub mod controller;
pub mod error;
pub mod pool;
