//! Error types for pool configuration and address allocation.
//!
//! Every allocator operation returns one of these as a typed failure; the
//! controller decides how each kind maps onto a reconciliation outcome.

use std::net::IpAddr;

/// Errors raised while parsing an address range from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Invalid range format: {0:?}")]
    InvalidRangeFormat(String),

    #[error("Range {0:?} mixes IPv4 and IPv6 bounds")]
    MixedFamilies(String),

    #[error("Range {0:?} has start after end")]
    Inverted(String),
}

/// Failures reported by the allocator and the controller around it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("Invalid pool configuration for {pool:?}: {reason}")]
    InvalidPoolConfig { pool: String, reason: String },

    #[error("No pool configuration present")]
    MissingConfig,

    #[error("Controller not synced")]
    NotSynced,

    #[error("Invalid address {0:?}")]
    InvalidAddress(String),

    #[error("Address {0} is not in any configured pool")]
    AddressNotInPool(IpAddr),

    #[error("Unknown pool {0:?}")]
    PoolNotFound(String),

    #[error("No addresses available in pool {0:?}")]
    PoolExhausted(String),

    #[error("No available addresses in any eligible pool")]
    NoAddressAvailable,

    #[error("Address {address} is in use by {holder:?} and cannot be shared")]
    SharingConflict { address: IpAddr, holder: String },

    #[error("{key:?} already holds {address} with different ports or sharing key")]
    AssignmentMismatch { key: String, address: IpAddr },

    #[error("{key:?} is already assigned {address}, release it first")]
    KeyAlreadyAssigned { key: String, address: IpAddr },

    #[error("Failed to announce {service:?}: {reason}")]
    ExternalAnnounceFailure { service: String, reason: String },
}

impl AllocError {
    /// True for failures that stop all allocation until configuration or
    /// sync state changes, as opposed to per-service failures that the next
    /// reconciliation pass may resolve.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AllocError::InvalidPoolConfig { .. } | AllocError::MissingConfig | AllocError::NotSynced
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AllocError::MissingConfig.is_fatal());
        assert!(AllocError::NotSynced.is_fatal());
        assert!(!AllocError::NoAddressAvailable.is_fatal());
        assert!(!AllocError::PoolNotFound("x".to_string()).is_fatal());
    }

    #[test]
    fn test_messages_carry_context() {
        let err = AllocError::SharingConflict {
            address: "10.0.0.1".parse().unwrap(),
            holder: "ns/web".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("10.0.0.1"));
        assert!(msg.contains("ns/web"));
    }
}
