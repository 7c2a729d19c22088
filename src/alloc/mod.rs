//! Address allocation and sharing.
//!
//! This module tracks which keys hold which addresses, decides whether a
//! request may share an address with its current holders, and exposes the
//! [`Allocator`] facade that ties pools and assignments together.

pub mod allocator;
pub mod ports;
pub mod sharing;
pub mod table;

// Re-export commonly used types
pub use allocator::{Allocation, Allocator};
pub use ports::{Port, PortSet, Protocol};
pub use sharing::blocking_holder;
pub use table::{AllocationTable, Assignment};
