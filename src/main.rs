use clap::{Parser, ValueEnum};
use color_eyre::Result;
use env_logger::Env;
use log::info;
use routinglab::config_loader::{self, CliOverrides};
use routinglab::orchestrator;
use routinglab::routing::Target;
use std::path::PathBuf;
use std::time::Duration;

/// Routing suite selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TargetArg {
    Quagga,
    Frr,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Quagga => Target::Quagga,
            TargetArg::Frr => Target::Frr,
        }
    }
}

fn parse_timeout(value: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

/// Deterministic topology builder for emulated BGP/SDN fabrics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the topology configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for the topology, plan and router configuration files
    #[arg(short, long, default_value = "routinglab_output")]
    output: PathBuf,

    /// Routing suite to render configurations for
    #[arg(long, value_enum)]
    target: Option<TargetArg>,

    /// How long to wait for each daemon to become ready (e.g. "5s")
    #[arg(long, value_parser = parse_timeout)]
    ready_timeout: Option<Duration>,

    /// Build and render everything without writing files
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    info!("Starting routinglab");
    info!("Configuration file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    let mut config = config_loader::load_config(&args.config)?;
    let overrides = CliOverrides { target: args.target.map(Target::from), ready_timeout: args.ready_timeout };
    config_loader::apply_overrides(&mut config, &overrides)?;

    let summary = orchestrator::generate(&config, &args.output, args.dry_run)?;

    info!(
        "Generated {} nodes, {} links, {} peerings",
        summary.nodes, summary.links, summary.peerings
    );
    info!(
        "{} router configurations, {} daemons, {} controller devices",
        summary.routers, summary.daemons, summary.devices
    );
    info!("Topology generation completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["routinglab", "--config", "fabric.yaml"]);

        assert_eq!(args.config, PathBuf::from("fabric.yaml"));
        assert_eq!(args.output, PathBuf::from("routinglab_output"));
        assert_eq!(args.target, None);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_override_args() {
        let args = Args::parse_from([
            "routinglab",
            "--config",
            "fabric.yaml",
            "--target",
            "frr",
            "--ready-timeout",
            "250ms",
            "--dry-run",
        ]);

        assert_eq!(args.target.map(Target::from), Some(Target::Frr));
        assert_eq!(args.ready_timeout, Some(Duration::from_millis(250)));
        assert!(args.dry_run);
    }

    #[test]
    fn test_bad_timeout_rejected() {
        assert!(Args::try_parse_from(["routinglab", "-c", "x.yaml", "--ready-timeout", "soon"]).is_err());
    }
}
