use serde::{Deserialize, Serialize};

use crate::controller::announce::AnnounceTarget;
use crate::error::AllocError;
use crate::pool::{PoolDefinition, PoolSet};

/// Top-level configuration structure that mirrors the YAML configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Address pools, in the order any-pool allocation tries them
    #[serde(default)]
    pub groups: Vec<PoolDefinition>,
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid pool configuration: {0}")]
    InvalidPools(#[from] AllocError),
    #[error("Invalid announce URL for pool {pool:?}: {reason}")]
    InvalidAnnounceUrl { pool: String, reason: String },
}

impl Config {
    pub fn new(groups: Vec<PoolDefinition>) -> Self {
        Config { groups }
    }

    /// Validate the configuration without applying it
    pub fn validate(&self) -> Result<(), ValidationError> {
        PoolSet::from_definitions(&self.groups)?;
        AnnounceTarget::from_config(self)?;
        Ok(())
    }

    /// The pool that carries announce settings. The last one wins.
    pub fn announce_group(&self) -> Option<&PoolDefinition> {
        self.groups.iter().rev().find(|g| g.announce.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::AnnounceSpec;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
groups:
  - name: default
    pool: 192.168.1.0/24
  - name: reserved
    pool: 192.168.2.10-192.168.2.20
    auto_assign: false
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.groups.len(), 2);
        assert!(config.groups[0].auto_assign);
        assert!(!config.groups[1].auto_assign);
        assert!(config.validate().is_ok());
        assert!(config.announce_group().is_none());
    }

    #[test]
    fn test_empty_document_is_empty_config() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert!(config.groups.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let overlapping = Config::new(vec![
            PoolDefinition::new("a", "10.0.0.0/24"),
            PoolDefinition::new("b", "10.0.0.0/25"),
        ]);
        assert!(matches!(overlapping.validate(), Err(ValidationError::InvalidPools(_))));

        let mut bad_url = PoolDefinition::new("egw", "10.1.0.0/24");
        bad_url.announce = Some(AnnounceSpec { url: "not a url".to_string() });
        assert!(matches!(
            Config::new(vec![bad_url]).validate(),
            Err(ValidationError::InvalidAnnounceUrl { .. })
        ));
    }

    #[test]
    fn test_last_announce_group_wins() {
        let mut first = PoolDefinition::new("first", "10.0.0.0/24");
        first.announce = Some(AnnounceSpec {
            url: "https://one.example/api/groups/1".to_string(),
        });
        let mut second = PoolDefinition::new("second", "10.0.1.0/24");
        second.announce = Some(AnnounceSpec {
            url: "https://two.example/api/groups/2".to_string(),
        });
        let config = Config::new(vec![first, second, PoolDefinition::new("plain", "10.0.2.0/24")]);
        assert_eq!(config.announce_group().map(|g| g.name.as_str()), Some("second"));
    }
}
