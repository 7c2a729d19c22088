//! Service snapshots and the patches the controller proposes for them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::alloc::{Port, PortSet, Protocol};

/// Value of the managed-by annotation
pub const BRAND: &str = "PureLB";
/// Marks a service as allocated by this controller
pub const BRAND_ANNOTATION: &str = "purelb.io/allocated-by";
/// Pool the address came from
pub const POOL_ANNOTATION: &str = "purelb.io/allocated-from";
/// Opt-in sharing key
pub const SHARING_ANNOTATION: &str = "purelb.io/allow-shared-ip";
/// Requested pool name
pub const DESIRED_POOL_ANNOTATION: &str = "purelb.io/address-pool";
pub const GROUP_ANNOTATION: &str = "acnodal.io/groupURL";
pub const SERVICE_ANNOTATION: &str = "acnodal.io/serviceURL";
pub const ENDPOINT_ANNOTATION: &str = "acnodal.io/endpointcreateURL";

/// A port declared on a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub protocol: Protocol,
    pub port: u16,
}

/// Externally visible load-balancer status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub ingress: Vec<String>,
}

/// The parts of a load-balanced service the controller reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_ip: Option<String>,
    /// Explicitly requested address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_ip: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<ServicePort>,
    #[serde(default)]
    pub status: ServiceStatus,
}

impl Service {
    pub fn new(name: &str) -> Self {
        Service {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Allocation key: `namespace/name`, or just the name without a namespace
    pub fn key(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}", ns, self.name),
            None => self.name.clone(),
        }
    }

    pub fn cluster_ip(&self) -> Option<IpAddr> {
        self.cluster_ip.as_deref().and_then(|ip| ip.trim().parse().ok())
    }

    /// The address already recorded in status, if exactly one valid one is
    pub fn ingress_address(&self) -> Option<IpAddr> {
        match self.status.ingress.as_slice() {
            [only] => only.parse().ok(),
            _ => None,
        }
    }

    pub fn port_set(&self) -> PortSet {
        self.ports.iter().map(|p| Port::new(p.protocol, p.port)).collect()
    }

    /// Sharing key from annotations; empty when sharing was not requested
    pub fn sharing_key(&self) -> String {
        self.annotations.get(SHARING_ANNOTATION).cloned().unwrap_or_default()
    }

    pub fn desired_pool(&self) -> Option<&str> {
        self.annotations
            .get(DESIRED_POOL_ANNOTATION)
            .map(String::as_str)
            .filter(|p| !p.is_empty())
    }

    pub fn requested_address(&self) -> Option<&str> {
        self.load_balancer_ip.as_deref().filter(|ip| !ip.is_empty())
    }
}

/// Changes the controller wants applied to a service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServicePatch {
    pub ingress: Vec<String>,
    pub annotations: BTreeMap<String, String>,
}

impl ServicePatch {
    /// Patch recording an allocation from `pool`
    pub fn allocated(address: IpAddr, pool: &str) -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert(BRAND_ANNOTATION.to_string(), BRAND.to_string());
        annotations.insert(POOL_ANNOTATION.to_string(), pool.to_string());
        ServicePatch {
            ingress: vec![address.to_string()],
            annotations,
        }
    }

    pub fn apply(&self, service: &mut Service) {
        service.status.ingress = self.ingress.clone();
        for (k, v) in &self.annotations {
            service.annotations.insert(k.clone(), v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_yaml() {
        let yaml = r#"
name: web
namespace: prod
cluster_ip: 10.96.0.10
annotations:
  purelb.io/allow-shared-ip: front
  purelb.io/address-pool: edge
ports:
  - port: 80
  - port: 53
    protocol: UDP
"#;
        let svc: Service = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(svc.key(), "prod/web");
        assert_eq!(svc.cluster_ip(), Some("10.96.0.10".parse().unwrap()));
        assert_eq!(svc.sharing_key(), "front");
        assert_eq!(svc.desired_pool(), Some("edge"));
        assert_eq!(svc.port_set().to_string(), "TCP/80,UDP/53");
        assert!(svc.requested_address().is_none());
    }

    #[test]
    fn test_ingress_address_needs_exactly_one() {
        let mut svc = Service::new("web");
        assert!(svc.ingress_address().is_none());
        svc.status.ingress = vec!["10.0.0.1".to_string()];
        assert_eq!(svc.ingress_address(), Some("10.0.0.1".parse().unwrap()));
        svc.status.ingress = vec!["garbage".to_string()];
        assert!(svc.ingress_address().is_none());
        svc.status.ingress = vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()];
        assert!(svc.ingress_address().is_none());
    }

    #[test]
    fn test_patch_apply() {
        let mut svc = Service::new("web");
        svc.annotations.insert("keep".to_string(), "me".to_string());
        ServicePatch::allocated("10.0.0.7".parse().unwrap(), "default").apply(&mut svc);
        assert_eq!(svc.status.ingress, vec!["10.0.0.7".to_string()]);
        assert_eq!(svc.annotations[BRAND_ANNOTATION], BRAND);
        assert_eq!(svc.annotations[POOL_ANNOTATION], "default");
        assert_eq!(svc.annotations["keep"], "me");
    }
}
