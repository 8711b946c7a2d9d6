//! Topology orchestrator.
//!
//! This module coordinates the overall generation process: it replays a
//! [`Config`] into a [`TopologyBuilder`], builds the topology and renders
//! every output document from the result.
//!
//! ## Replay order
//!
//! Declarations are issued in a fixed order so that interface numbering and
//! address allocation only depend on the configuration file:
//!
//! 1. controller cluster
//! 2. switches
//! 3. autonomous systems
//! 4. stand-alone routers
//! 5. hosts
//! 6. peerings
//! 7. AS router links to external nodes
//! 8. routed stub networks
//! 9. host links
//! 10. generic links

use crate::config::Config;
use crate::netcfg::NetworkConfig;
use crate::process::{plan_topology, DaemonPaths, Plan};
use crate::routing::{render_router_configs, RouterConfig};
use crate::topology::{ControllerCluster, Peering, PeeringOptions, Topology, TopologyBuilder};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{debug, info};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Result of replaying a configuration
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub topology: Topology,
    pub peerings: Vec<Peering>,
    pub cluster: Option<ControllerCluster>,
}

/// Replay `config` into a builder and build the topology
pub fn build_topology(config: &Config) -> Result<BuildOutput> {
    let mut builder =
        TopologyBuilder::new(config.addressing.clone()).wrap_err("Invalid addressing configuration")?;

    let cluster = match &config.controllers {
        Some(spec) => Some(builder.add_controller_cluster(spec).wrap_err("Failed to declare controller cluster")?),
        None => None,
    };

    for switch in &config.switches {
        builder
            .add_switch(&switch.name, switch.spec())
            .wrap_err_with(|| format!("Failed to declare switch {}", switch.name))?;
    }

    let mut handles = Vec::with_capacity(config.autonomous_systems.len());
    for system in &config.autonomous_systems {
        let routes = system.routes()?;
        let handle = if system.sdn || !system.controllers.is_empty() {
            let controllers: Vec<IpAddr> = if system.controllers.is_empty() {
                cluster
                    .as_ref()
                    .map(|c| c.controller_addresses().into_iter().map(IpAddr::V4).collect())
                    .ok_or_else(|| eyre!("SDN AS {} has no controllers", system.asn))?
            } else {
                system.controllers.clone()
            };
            builder.declare_sdn_autonomous_system(system.asn, routes, system.routers, controllers)
        } else {
            builder.declare_autonomous_system(system.asn, routes, system.routers)
        }
        .wrap_err_with(|| format!("Failed to declare AS {}", system.asn))?;
        handles.push(handle);
    }

    for router in &config.routers {
        builder
            .add_router(&router.name, router.spec())
            .wrap_err_with(|| format!("Failed to declare router {}", router.name))?;
    }

    for host in &config.hosts {
        builder
            .add_host(&host.name, host.profile())
            .wrap_err_with(|| format!("Failed to declare host {}", host.name))?;
    }

    let handle_of = |asn: u32| {
        handles
            .iter()
            .copied()
            .find(|h| h.asn() == asn)
            .ok_or_else(|| eyre!("AS {} is not declared", asn))
    };

    for peering in &config.peerings {
        let options = PeeringOptions { router_a: peering.router_a, router_b: peering.router_b, use_vlan: peering.vlan };
        builder
            .add_peering(handle_of(peering.a)?, handle_of(peering.b)?, options)
            .wrap_err_with(|| format!("Failed to declare peering AS {} <-> AS {}", peering.a, peering.b))?;
    }

    for (system, handle) in config.autonomous_systems.iter().zip(&handles) {
        for link in &system.links {
            builder
                .attach_external_link(*handle, link.router, &link.to)
                .wrap_err_with(|| format!("Failed to link AS {} router {} to {}", system.asn, link.router, link.to))?;
        }
    }

    for (system, handle) in config.autonomous_systems.iter().zip(&handles) {
        for network in &system.routed_networks {
            builder
                .add_routed_network(*handle, network.router, &network.host)
                .wrap_err_with(|| format!("Failed to add routed network {} to AS {}", network.host, system.asn))?;
        }
    }

    for host in &config.hosts {
        for target in &host.links {
            builder
                .add_link(&host.name, target)
                .wrap_err_with(|| format!("Failed to link {} to {}", host.name, target))?;
        }
    }

    for link in &config.links {
        builder
            .add_link(&link.a, &link.b)
            .wrap_err_with(|| format!("Failed to link {} to {}", link.a, link.b))?;
    }

    let peerings = builder.peerings().to_vec();
    let topology = builder.build_topology().wrap_err("Failed to build topology")?;
    Ok(BuildOutput { topology, peerings, cluster })
}

/// Counts reported after a generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSummary {
    pub nodes: usize,
    pub links: usize,
    pub peerings: usize,
    pub routers: usize,
    pub daemons: usize,
    pub devices: usize,
}

/// Everything rendered from a configuration
#[derive(Debug, Clone)]
pub struct Generated {
    pub build: BuildOutput,
    pub router_configs: Vec<RouterConfig>,
    pub plan: Plan,
    pub netcfg: NetworkConfig,
}

impl Generated {
    pub fn summary(&self) -> GenerationSummary {
        GenerationSummary {
            nodes: self.build.topology.nodes.len(),
            links: self.build.topology.links.len(),
            peerings: self.build.peerings.len(),
            routers: self.router_configs.len(),
            daemons: self.plan.daemons().count(),
            devices: self.netcfg.devices.len(),
        }
    }
}

/// Daemon paths with a relative config directory anchored at `output_dir`
fn anchored_paths(paths: &DaemonPaths, output_dir: &Path) -> DaemonPaths {
    let mut paths = paths.clone();
    if paths.config_dir.is_relative() {
        paths.config_dir = output_dir.join(&paths.config_dir);
    }
    paths
}

/// Build the topology and render every output document in memory
pub fn render(config: &Config, output_dir: &Path) -> Result<Generated> {
    let build = build_topology(config)?;
    let router_configs = render_router_configs(&build.topology, &config.general.routing);
    let paths = anchored_paths(&config.daemons, output_dir);
    let plan = plan_topology(&build.topology, &paths, config.general.ready_timeout);
    let netcfg = NetworkConfig::from_topology(&build.topology, config.general.device_driver.as_deref());

    Ok(Generated { build, router_configs, plan, netcfg })
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).wrap_err_with(|| format!("Failed to write {:?}", path))?;
    debug!("Wrote {:?}", path);
    Ok(())
}

/// Write every rendered document under `output_dir`
///
/// # Returns
///
/// The files written, in write order.
pub fn write_outputs(config: &Config, generated: &Generated, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let config_dir = anchored_paths(&config.daemons, output_dir).config_dir;
    std::fs::create_dir_all(&config_dir)
        .wrap_err_with(|| format!("Failed to create output directory {:?}", config_dir))?;

    let mut written = Vec::new();
    let mut emit = |path: PathBuf, contents: String| -> Result<()> {
        write_file(&path, &contents)?;
        written.push(path);
        Ok(())
    };

    let topology = &generated.build.topology;
    emit(output_dir.join("topology.yaml"), serde_yaml::to_string(topology)?)?;
    emit(output_dir.join("topology.json"), serde_json::to_string_pretty(topology)?)?;
    emit(output_dir.join("plan.yaml"), serde_yaml::to_string(&generated.plan)?)?;
    emit(output_dir.join("netcfg.json"), generated.netcfg.to_json()?)?;

    for router in &generated.router_configs {
        emit(config_dir.join(router.bgpd_file_name()), router.bgpd.clone())?;
        emit(config_dir.join(router.zebra_file_name()), router.zebra.clone())?;
    }

    info!("Wrote {} files to {:?}", written.len(), output_dir);
    Ok(written)
}

/// Render and, unless `dry_run`, write all outputs for `config`
pub fn generate(config: &Config, output_dir: &Path, dry_run: bool) -> Result<GenerationSummary> {
    let generated = render(config, output_dir)?;
    if dry_run {
        info!("Dry run, nothing written to {:?}", output_dir);
    } else {
        std::fs::create_dir_all(output_dir)
            .wrap_err_with(|| format!("Failed to create output directory {:?}", output_dir))?;
        write_outputs(config, &generated, output_dir)?;
    }
    Ok(generated.summary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(yaml: &str) -> Config {
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        config
    }

    const BGP_DEV: &str = r#"
controllers:
  instances: 1
  control_subnet: 192.168.56.0/24
switches:
  - name: s1
  - name: s7
autonomous_systems:
  - asn: 65000
    sdn: true
    links:
      - to: s7
  - asn: 65001
    routes: [10.1.0.0/16]
    links:
      - to: s1
  - asn: 65002
    routes: [10.2.0.0/16]
    links:
      - to: s1
peerings:
  - {a: 65001, b: 65000, vlan: true}
  - {a: 65002, b: 65000, vlan: true}
"#;

    #[test]
    fn test_build_replays_declarations() {
        let output = build_topology(&config(BGP_DEV)).unwrap();
        assert_eq!(output.peerings.len(), 2);
        assert_eq!(output.peerings[0].vlan, Some(1));
        // Different AS pairs count VLANs independently
        assert_eq!(output.peerings[1].vlan, Some(1));

        let speaker = output.topology.node("as65000r1").unwrap();
        assert_eq!(speaker.zebra.as_ref().unwrap().fpm, Some("192.168.56.1".parse().unwrap()));
        assert_eq!(speaker.interfaces.len(), 3);
        assert!(output.cluster.is_some());
    }

    #[test]
    fn test_unknown_link_target_fails() {
        let cfg = config("switches: [{name: s1}]\nlinks: [{a: s1, b: s9}]");
        let err = build_topology(&cfg).unwrap_err();
        assert!(format!("{:?}", err).contains("s9"));
    }

    #[test]
    fn test_generate_writes_outputs() {
        let dir = TempDir::new().unwrap();
        let summary = generate(&config(BGP_DEV), dir.path(), false).unwrap();

        assert_eq!(summary.routers, 3);
        assert_eq!(summary.devices, 2);
        assert_eq!(summary.daemons, 6);
        for file in ["topology.yaml", "topology.json", "plan.yaml", "netcfg.json"] {
            assert!(dir.path().join(file).exists(), "missing {}", file);
        }
        let bgpd = std::fs::read_to_string(dir.path().join("configs/as65001r1-bgpd.conf")).unwrap();
        assert!(bgpd.contains("router bgp 65001"));
        assert!(bgpd.contains("network 10.1.0.0/16"));

        let plan = std::fs::read_to_string(dir.path().join("plan.yaml")).unwrap();
        assert!(plan.contains("ready_timeout: 5s"));
        assert!(plan.contains(&dir.path().join("configs/as65000r1-zebra.conf").display().to_string()));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        generate(&config(BGP_DEV), &out, true).unwrap();
        assert!(!out.exists());
    }
}
