use crate::config::Config;
use crate::controller::Service;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;

/// Load and validate pool configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    config.validate()?;
    info!("Loaded {} pools", config.groups.len());

    Ok(config)
}

/// Load configuration if the file exists.
///
/// A missing file yields `None`, which callers treat as "no configuration"
/// rather than as an empty pool list.
pub fn load_optional_config(config_path: &Path) -> Result<Option<Config>> {
    if !config_path.exists() {
        info!("No configuration at {:?}", config_path);
        return Ok(None);
    }
    load_config(config_path).map(Some)
}

/// Load a list of service snapshots from a YAML file
pub fn load_services(services_path: &Path) -> Result<Vec<Service>> {
    info!("Loading services from: {:?}", services_path);

    let file = File::open(services_path)
        .wrap_err_with(|| format!("Failed to open services '{}'", services_path.display()))?;

    let services: Vec<Service> = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse services '{}'", services_path.display()))?;

    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
groups:
  - name: default
    pool: 1.2.3.0/24
  - name: edge
    pool: 10.0.0.10-10.0.0.20
    announce:
      url: https://egw.example.com/api/groups/1
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.groups.len(), 2);
        assert_eq!(config.announce_group().map(|g| g.name.as_str()), Some("edge"));
    }

    #[test]
    fn test_load_config_rejects_overlap() {
        let yaml = r#"
groups:
  - name: a
    pool: 1.2.3.0/24
  - name: b
    pool: 1.2.3.128/25
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_no_config() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        assert!(load_optional_config(&missing).unwrap().is_none());
        assert!(load_config(&missing).is_err());
    }

    #[test]
    fn test_load_services() {
        let yaml = r#"
- name: web
  cluster_ip: 10.96.0.1
  ports:
    - port: 80
- name: dns
  cluster_ip: 10.96.0.2
  load_balancer_ip: 1.2.3.9
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let services = load_services(temp_file.path()).unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[1].requested_address(), Some("1.2.3.9"));
    }
}
