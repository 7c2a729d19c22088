//! Reconciliation driver around the allocator.
//!
//! The controller turns cluster events into allocator calls: configuration
//! changes become pool replacements, services needing an address become one
//! of the three allocation strategies, and deletions become releases. It
//! never writes to services itself; each reconciliation returns the patch
//! the caller should apply.

pub mod announce;
pub mod events;
pub mod service;

use parking_lot::RwLock;
use serde::Serialize;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::alloc::{Allocation, Allocator};
use crate::config::Config;
use crate::error::AllocError;

pub use announce::{AnnounceError, AnnounceLinks, AnnounceTarget, Announcer, DryRunAnnouncer};
pub use events::{Event, EventKind, EventRecorder, LogRecorder, MemoryRecorder};
pub use service::{Service, ServicePatch, ServicePort, ServiceStatus};

use service::{ENDPOINT_ANNOTATION, GROUP_ANNOTATION, SERVICE_ANNOTATION};

/// What the caller should do after handing the controller an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncState {
    /// Event handled, nothing else to do
    Success,
    /// Event failed and should be retried later
    Error,
    /// Re-evaluate every service; freed addresses or new pools may help them
    ReprocessAll,
}

/// Result of reconciling one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalancerOutcome {
    pub state: SyncState,
    /// Status and annotation changes to apply; `None` leaves the service as is
    pub patch: Option<ServicePatch>,
}

impl BalancerOutcome {
    fn unchanged(state: SyncState) -> Self {
        BalancerOutcome { state, patch: None }
    }
}

/// Drives an [`Allocator`] from service and configuration events
pub struct Controller {
    allocator: Allocator,
    synced: AtomicBool,
    recorder: Arc<dyn EventRecorder>,
    announcer: Arc<dyn Announcer>,
    target: RwLock<Option<AnnounceTarget>>,
}

impl Controller {
    pub fn new(allocator: Allocator) -> Self {
        Controller {
            allocator,
            synced: AtomicBool::new(false),
            recorder: Arc::new(LogRecorder),
            announcer: Arc::new(DryRunAnnouncer),
            target: RwLock::new(None),
        }
    }

    /// Use `announcer` for pools that carry announce settings
    pub fn with_announcer(mut self, announcer: Arc<dyn Announcer>) -> Self {
        self.announcer = announcer;
        self
    }

    /// Bind the channel used to report events on services
    pub fn set_client(&mut self, recorder: Arc<dyn EventRecorder>) {
        self.recorder = recorder;
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    /// Apply a new configuration. `None` means no configuration exists.
    pub fn set_config(&self, config: Option<&Config>) -> SyncState {
        let Some(config) = config else {
            log::error!(
                "{}: configuration is missing, no addresses will be allocated",
                AllocError::MissingConfig
            );
            return SyncState::Error;
        };

        let target = match AnnounceTarget::from_config(config) {
            Ok(target) => target,
            Err(e) => {
                log::error!("Rejected configuration: {}", e);
                return SyncState::Error;
            }
        };

        if let Err(e) = self.allocator.set_pools(&config.groups) {
            log::error!("Rejected configuration: {}", e);
            return SyncState::Error;
        }

        if let Some(t) = &target {
            log::info!("Announcing new services to {}", t.group_url);
        }
        *self.target.write() = target;
        log::info!("Configuration updated");
        SyncState::ReprocessAll
    }

    /// Initial state has been loaded; allocation may start
    pub fn mark_synced(&self) {
        self.synced.store(true, Ordering::SeqCst);
        log::info!("Controller synced, can allocate addresses now");
    }

    pub fn shutdown(&self) {
        self.synced.store(false, Ordering::SeqCst);
        log::info!("Controller shutting down");
    }

    /// Release `key`'s address. Always asks for a full reprocess, since the
    /// freed address may satisfy a service that failed earlier.
    pub fn delete_balancer(&self, key: &str) -> SyncState {
        if self.allocator.unassign(key) {
            log::info!("Service {} deleted, address released", key);
        }
        SyncState::ReprocessAll
    }

    /// Reconcile one service that needs an address
    pub fn set_balancer(&self, key: &str, service: &Service) -> BalancerOutcome {
        // Without a cluster address there is no family to allocate for.
        if service.cluster_ip().is_none() {
            log::debug!("Service {} has no valid cluster IP, skipping", key);
            return BalancerOutcome::unchanged(SyncState::Success);
        }

        if let Some(existing) = service.ingress_address() {
            log::debug!("Service {} already has address {}", key, existing);
            return BalancerOutcome::unchanged(SyncState::Success);
        }

        let allocation = match self.allocate_ip(key, service) {
            Ok(allocation) => allocation,
            Err(e) if e.is_fatal() => {
                log::error!("Cannot allocate for {}: {}", key, e);
                return BalancerOutcome::unchanged(SyncState::Error);
            }
            Err(e) => {
                log::warn!("Address allocation failed for {}: {}", key, e);
                self.recorder.warn(
                    key,
                    "AllocationFailed",
                    format!("Failed to allocate IP for {:?}: {}", key, e),
                );
                return BalancerOutcome::unchanged(SyncState::Success);
            }
        };
        log::info!(
            "Allocated {} from pool {} to {}",
            allocation.address, allocation.pool, key
        );
        self.recorder.info(
            key,
            "IPAllocated",
            format!("Assigned IP {:?}", allocation.address.to_string()),
        );

        let mut patch = ServicePatch::allocated(allocation.address, &allocation.pool);

        let target = self.target.read().clone();
        if let Some(target) = target {
            match self.announce(&target, service, allocation.address) {
                Ok(links) => {
                    patch.annotations.insert(GROUP_ANNOTATION.to_string(), links.group);
                    patch.annotations.insert(SERVICE_ANNOTATION.to_string(), links.service);
                    patch
                        .annotations
                        .insert(ENDPOINT_ANNOTATION.to_string(), links.create_endpoint);
                }
                Err(e) => {
                    // The assignment stays; the next pass retries the
                    // announcement against the same address.
                    log::warn!("{}", e);
                    self.recorder.warn(key, "AnnouncementFailed", e.to_string());
                    return BalancerOutcome::unchanged(SyncState::Error);
                }
            }
        }

        BalancerOutcome {
            state: SyncState::Success,
            patch: Some(patch),
        }
    }

    /// Pick a strategy from the service: explicit address, then requested
    /// pool, then any pool. Refused with `NotSynced` until `mark_synced`.
    pub fn allocate_ip(&self, key: &str, service: &Service) -> Result<Allocation, AllocError> {
        if !self.is_synced() {
            return Err(AllocError::NotSynced);
        }

        let ports = service.port_set();
        let sharing_key = service.sharing_key();

        if let Some(requested) = service.requested_address() {
            let address: IpAddr = requested
                .trim()
                .parse()
                .map_err(|_| AllocError::InvalidAddress(requested.to_string()))?;
            return self.allocator.assign(key, address, &ports, &sharing_key);
        }

        if let Some(pool) = service.desired_pool() {
            return self.allocator.allocate_from_pool(key, pool, &ports, &sharing_key);
        }

        self.allocator.allocate(key, &ports, &sharing_key)
    }

    fn announce(
        &self,
        target: &AnnounceTarget,
        service: &Service,
        address: IpAddr,
    ) -> Result<AnnounceLinks, AllocError> {
        self.announcer
            .announce(target, &service.name, address)
            .map_err(|e| AllocError::ExternalAnnounceFailure {
                service: service.name.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolDefinition;

    fn lb_service(name: &str) -> Service {
        let mut svc = Service::new(name);
        svc.cluster_ip = Some("1.2.3.4".to_string());
        svc
    }

    fn configured() -> Controller {
        let controller = Controller::new(Allocator::new());
        let config = Config::new(vec![PoolDefinition::new("default", "1.2.3.0/24")]);
        assert_eq!(controller.set_config(Some(&config)), SyncState::ReprocessAll);
        controller
    }

    #[test]
    fn test_unsynced_controller_refuses() {
        let controller = configured();

        let outcome = controller.set_balancer("test", &lb_service("test"));
        assert_eq!(outcome, BalancerOutcome { state: SyncState::Error, patch: None });
        assert!(controller.allocator().assignments().is_empty());
    }

    #[test]
    fn test_allocate_ip_before_sync() {
        let controller = configured();

        assert_eq!(
            controller.allocate_ip("test", &lb_service("test")),
            Err(AllocError::NotSynced)
        );
        assert!(controller.allocator().assignments().is_empty());

        controller.mark_synced();
        assert!(controller.allocate_ip("test", &lb_service("test")).is_ok());
        assert_eq!(controller.allocator().assignments().len(), 1);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let controller = Controller::new(Allocator::new());
        assert_eq!(controller.set_config(None), SyncState::Error);
        assert_eq!(controller.set_config(Some(&Config::default())), SyncState::ReprocessAll);
    }

    #[test]
    fn test_synced_without_config_stops_allocation() {
        let recorder = Arc::new(MemoryRecorder::new());
        let mut controller = Controller::new(Allocator::new());
        controller.set_client(recorder.clone());
        controller.mark_synced();

        let outcome = controller.set_balancer("test", &lb_service("test"));
        assert_eq!(outcome, BalancerOutcome { state: SyncState::Error, patch: None });
        assert!(recorder.warnings().is_empty());
        assert!(controller.allocator().assignments().is_empty());
    }

    #[test]
    fn test_no_cluster_ip_is_left_alone() {
        let controller = configured();
        controller.mark_synced();

        let outcome = controller.set_balancer("test", &Service::new("test"));
        assert_eq!(outcome, BalancerOutcome { state: SyncState::Success, patch: None });
    }

    #[test]
    fn test_existing_ingress_is_left_alone() {
        let controller = configured();
        controller.mark_synced();

        let mut svc = lb_service("test");
        svc.status.ingress = vec!["9.9.9.9".to_string()];
        assert_eq!(controller.set_balancer("test", &svc).patch, None);
        assert!(controller.allocator().assignments().is_empty());
    }

    #[test]
    fn test_invalid_requested_address() {
        let controller = configured();
        controller.mark_synced();

        let mut svc = lb_service("test");
        svc.load_balancer_ip = Some("1.2.3".to_string());
        assert_eq!(
            controller.allocate_ip("test", &svc),
            Err(AllocError::InvalidAddress("1.2.3".to_string()))
        );
    }

    #[test]
    fn test_shutdown_stops_allocation() {
        let controller = configured();
        controller.mark_synced();
        assert!(controller.is_synced());
        controller.shutdown();
        assert_eq!(controller.set_balancer("test", &lb_service("test")).state, SyncState::Error);
    }
}
