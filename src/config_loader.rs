//! Configuration file loading.
//!
//! Reads the YAML topology description, validates it and applies the
//! command-line overrides on top.

use crate::config::Config;
use crate::routing::Target;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration file {:?}", config_path))?;

    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration file {:?}", config_path))?;

    config.validate()?;

    info!(
        "Configuration declares {} AS(es), {} switch(es), {} router(s) and {} host(s)",
        config.autonomous_systems.len(),
        config.switches.len(),
        config.routers.len(),
        config.hosts.len()
    );
    Ok(config)
}

/// CLI arguments that override YAML settings
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub target: Option<Target>,
    pub ready_timeout: Option<Duration>,
}

/// Apply CLI overrides to a configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(target) = overrides.target {
        info!("Overriding routing target with {:?}", target);
        config.general.routing.target = target;
    }

    if let Some(timeout) = overrides.ready_timeout {
        info!("Overriding daemon ready timeout with {:?}", timeout);
        config.general.ready_timeout = timeout;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
autonomous_systems:
  - asn: 65001
    routes: [10.1.0.0/16]
  - asn: 65000
peerings:
  - a: 65001
    b: 65000
"#;

    #[test]
    fn test_load_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", YAML).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.autonomous_systems.len(), 2);
        assert_eq!(config.general.routing.target, Target::Quagga);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/topology.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to open configuration file"));
    }

    #[test]
    fn test_load_invalid_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "peerings: [{{a: 1, b: 2}}]\nswitches: [{{name: s1}}]").unwrap();
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config: Config = serde_yaml::from_str(YAML).unwrap();
        let overrides = CliOverrides { target: Some(Target::Frr), ready_timeout: Some(Duration::from_secs(30)) };
        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.general.routing.target, Target::Frr);
        assert_eq!(config.general.ready_timeout, Duration::from_secs(30));

        let zero = CliOverrides { ready_timeout: Some(Duration::ZERO), ..Default::default() };
        assert!(apply_overrides(&mut config, &zero).is_err());
    }
}
