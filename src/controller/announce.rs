//! Announcing allocated addresses to a remote gateway.
//!
//! When a pool definition carries an announce URL, every successful
//! allocation is reported to that gateway and the links it returns are
//! recorded on the service. The network client itself sits behind the
//! [`Announcer`] trait.

use serde::Serialize;
use std::net::IpAddr;
use url::Url;

use crate::config::{Config, ValidationError};

/// Errors raised by an announcer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnounceError {
    #[error("Announcement rejected: {0}")]
    Rejected(String),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Where announcements go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceTarget {
    /// Gateway root: the group URL with its path cleared
    pub base_url: Url,
    /// Group URL as configured
    pub group_url: String,
}

impl AnnounceTarget {
    pub fn parse(group_url: &str) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(group_url)?;
        base_url.set_path("");
        Ok(AnnounceTarget {
            base_url,
            group_url: group_url.to_string(),
        })
    }

    /// Target from the last pool definition with announce settings
    pub fn from_config(config: &Config) -> Result<Option<Self>, ValidationError> {
        let Some(group) = config.announce_group() else {
            return Ok(None);
        };
        let Some(spec) = &group.announce else {
            return Ok(None);
        };
        AnnounceTarget::parse(&spec.url)
            .map(Some)
            .map_err(|e| ValidationError::InvalidAnnounceUrl {
                pool: group.name.clone(),
                reason: e.to_string(),
            })
    }
}

/// Links the gateway hands back for an announced service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnounceLinks {
    pub group: String,
    pub service: String,
    pub create_endpoint: String,
}

/// Client for the remote gateway
pub trait Announcer: Send + Sync {
    fn announce(
        &self,
        target: &AnnounceTarget,
        service: &str,
        address: IpAddr,
    ) -> Result<AnnounceLinks, AnnounceError>;
}

/// Derives links from the target without contacting anything
#[derive(Debug, Default)]
pub struct DryRunAnnouncer;

impl Announcer for DryRunAnnouncer {
    fn announce(
        &self,
        target: &AnnounceTarget,
        service: &str,
        address: IpAddr,
    ) -> Result<AnnounceLinks, AnnounceError> {
        let service_url = target.base_url.join(&format!("api/services/{}", service))?;
        let endpoint_url = target.base_url.join(&format!("api/services/{}/endpoints", service))?;
        log::info!("Would announce {} at {} to {}", service, address, target.group_url);
        Ok(AnnounceLinks {
            group: target.group_url.clone(),
            service: service_url.to_string(),
            create_endpoint: endpoint_url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_strips_path() {
        let target = AnnounceTarget::parse("https://egw.example.com:8080/api/groups/42").unwrap();
        assert_eq!(target.base_url.as_str(), "https://egw.example.com:8080/");
        assert_eq!(target.group_url, "https://egw.example.com:8080/api/groups/42");
    }

    #[test]
    fn test_target_rejects_relative_url() {
        assert!(AnnounceTarget::parse("/api/groups/42").is_err());
    }

    #[test]
    fn test_dry_run_links() {
        let target = AnnounceTarget::parse("https://egw.example.com/api/groups/42").unwrap();
        let links = DryRunAnnouncer
            .announce(&target, "web", "10.0.0.1".parse().unwrap())
            .unwrap();
        assert_eq!(links.group, "https://egw.example.com/api/groups/42");
        assert_eq!(links.service, "https://egw.example.com/api/services/web");
        assert_eq!(links.create_endpoint, "https://egw.example.com/api/services/web/endpoints");
    }
}
