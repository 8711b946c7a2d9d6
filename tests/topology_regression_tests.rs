#[cfg(test)]
mod topology_regression_tests {
    use std::collections::HashSet;
    use std::io::Write;
    use std::net::IpAddr;
    use std::time::Duration;
    use tempfile::{NamedTempFile, TempDir};

    use routinglab::config_loader::load_config;
    use routinglab::ip::AddressPolicy;
    use routinglab::orchestrator;
    use routinglab::process::{launch, plan_topology, DaemonPaths, DaemonSpec, ProcessSupervisor, SupervisorError};
    use routinglab::routing::{render_router_configs, RenderOptions};
    use routinglab::topology::{BuildError, PeeringOptions, Topology, TopologyBuilder};

    fn builder() -> TopologyBuilder {
        TopologyBuilder::new(AddressPolicy::default()).unwrap()
    }

    fn route(prefix: &str) -> Vec<ipnet::IpNet> {
        vec![prefix.parse().unwrap()]
    }

    /// One link and two new interfaces per peering
    #[test]
    fn test_peering_adds_one_link_and_two_interfaces() {
        let mut b = builder();
        let as1 = b.declare_autonomous_system(65001, route("10.1.0.0/16"), 2).unwrap();
        let as2 = b.declare_autonomous_system(65002, route("10.2.0.0/16"), 1).unwrap();
        let sdn = b.declare_sdn_autonomous_system(65000, vec![], 1, vec!["192.168.1.1".parse().unwrap()]).unwrap();

        let peerings = [
            (as1, sdn, PeeringOptions { use_vlan: true, ..Default::default() }),
            (as2, sdn, PeeringOptions::default()),
            (as1, as2, PeeringOptions { router_a: 2, ..Default::default() }),
        ];
        for (a, z, options) in peerings {
            b.add_peering(a, z, options).unwrap();
        }

        let topology = b.build_topology().unwrap();
        assert_eq!(topology.nodes.len(), 4);
        assert_eq!(topology.links.len(), 3);
        assert_eq!(topology.interface_count(), 6);
        assert_eq!(topology.node("as65001r2").unwrap().interfaces.len(), 1);
    }

    /// VLAN ids for one AS pair start at the base and never repeat
    #[test]
    fn test_vlans_are_monotonic_per_pair() {
        let policy = AddressPolicy { vlan_base: 100, ..Default::default() };
        let mut b = TopologyBuilder::new(policy).unwrap();
        let as1 = b.declare_autonomous_system(65001, vec![], 1).unwrap();
        let as2 = b.declare_autonomous_system(65000, vec![], 1).unwrap();

        for _ in 0..5 {
            b.add_peering(as1, as2, PeeringOptions { use_vlan: true, ..Default::default() }).unwrap();
        }
        let vlans: Vec<u16> = b.peerings().iter().map(|p| p.vlan.unwrap()).collect();
        assert_eq!(vlans, vec![100, 101, 102, 103, 104]);
    }

    /// Pool subnets are unique across the whole build
    #[test]
    fn test_subnets_never_reused() {
        let mut b = builder();
        let handles: Vec<_> = (1..=4).map(|asn| b.declare_autonomous_system(asn, vec![], 2).unwrap()).collect();
        for (i, a) in handles.iter().enumerate() {
            for z in &handles[i + 1..] {
                b.add_peering(*a, *z, PeeringOptions::default()).unwrap();
                b.add_peering(*a, *z, PeeringOptions { router_a: 2, router_b: 2, use_vlan: false }).unwrap();
            }
        }

        let subnets: HashSet<_> = b.peerings().iter().map(|p| p.subnet).collect();
        assert_eq!(subnets.len(), b.peerings().len());
    }

    /// A second build fails and leaves the first output alone
    #[test]
    fn test_second_build_fails() {
        let mut b = builder();
        let as1 = b.declare_autonomous_system(65001, route("10.1.0.0/16"), 1).unwrap();
        let as2 = b.declare_autonomous_system(65000, vec![], 1).unwrap();
        b.add_peering(as1, as2, PeeringOptions::default()).unwrap();

        let mut topology = Topology::new();
        b.build(&mut topology).unwrap();
        let first = topology.clone();

        assert_eq!(b.build(&mut topology), Err(BuildError::AlreadyBuilt));
        assert_eq!(topology, first);
    }

    #[test]
    fn test_minimal_vlan_peering() {
        let mut b = builder();
        let as1 = b.declare_autonomous_system(65001, route("10.1.0.0/16"), 1).unwrap();
        let as2 = b.declare_autonomous_system(65000, vec![], 1).unwrap();
        b.add_peering(as1, as2, PeeringOptions { use_vlan: true, ..Default::default() }).unwrap();

        let topology = b.build_topology().unwrap();
        assert_eq!(topology.nodes.len(), 2);
        assert_eq!(topology.interface_count(), 2);
        assert_eq!(topology.links.len(), 1);

        let interface = &topology.node("as65001r1").unwrap().interfaces[0];
        assert_eq!(interface.vlan(), Some(1));
    }

    #[test]
    fn test_sequential_subnets_in_order() {
        let mut b = builder();
        let as1 = b.declare_autonomous_system(65001, vec![], 1).unwrap();
        let as2 = b.declare_autonomous_system(65002, vec![], 1).unwrap();
        for _ in 0..3 {
            b.add_peering(as1, as2, PeeringOptions::default()).unwrap();
        }

        let subnets: Vec<String> = b.peerings().iter().map(|p| p.subnet.to_string()).collect();
        assert_eq!(subnets, vec!["10.0.0.0/30", "10.0.0.4/30", "10.0.0.8/30"]);
    }

    /// Rendering is deterministic and neighbors point at peer interfaces
    #[test]
    fn test_router_configs_match_topology() {
        let mut b = builder();
        let as1 = b.declare_autonomous_system(65001, route("10.1.0.0/16"), 1).unwrap();
        let as2 = b.declare_autonomous_system(65002, route("10.2.0.0/16"), 1).unwrap();
        let as3 = b.declare_autonomous_system(65003, vec![], 1).unwrap();
        b.add_peering(as1, as2, PeeringOptions::default()).unwrap();
        b.add_peering(as2, as3, PeeringOptions { use_vlan: true, ..Default::default() }).unwrap();
        let topology = b.build_topology().unwrap();

        let options = RenderOptions::default();
        let first = render_router_configs(&topology, &options);
        assert_eq!(first, render_router_configs(&topology, &options));
        assert_eq!(first.len(), 3);

        for router in topology.routers() {
            let config = first.iter().find(|c| c.router == router.name).unwrap();
            for neighbor in &router.bgp.as_ref().unwrap().neighbors {
                let line = format!("neighbor {} remote-as {}", neighbor.address, neighbor.remote_as);
                assert!(config.bgpd.contains(&line), "{} missing '{}'", router.name, line);

                let owner = topology
                    .nodes
                    .iter()
                    .filter(|n| n.name != router.name)
                    .find(|n| n.interfaces.iter().any(|i| i.has_address(&neighbor.address)))
                    .unwrap();
                assert_eq!(owner.bgp.as_ref().unwrap().asn, neighbor.remote_as);
            }
        }
    }

    struct FailingSupervisor {
        fail_on: String,
        events: Vec<String>,
    }

    impl ProcessSupervisor for FailingSupervisor {
        fn start(&mut self, daemon: &DaemonSpec) -> Result<(), SupervisorError> {
            if daemon.label() == self.fail_on {
                return Err(SupervisorError::Start { daemon: daemon.label(), reason: "exec failed".to_string() });
            }
            self.events.push(format!("start {}", daemon.label()));
            Ok(())
        }

        fn wait_ready(&mut self, _daemon: &DaemonSpec, _timeout: Duration) -> Result<(), SupervisorError> {
            Ok(())
        }

        fn stop(&mut self, daemon: &DaemonSpec) -> Result<(), SupervisorError> {
            self.events.push(format!("stop {}", daemon.label()));
            Ok(())
        }
    }

    #[test]
    fn test_launch_unwinds_in_reverse() {
        let mut b = builder();
        let as1 = b.declare_autonomous_system(65001, vec![], 1).unwrap();
        let as2 = b.declare_autonomous_system(65002, vec![], 1).unwrap();
        b.add_peering(as1, as2, PeeringOptions::default()).unwrap();
        let topology = b.build_topology().unwrap();
        let plan = plan_topology(&topology, &DaemonPaths::default(), Duration::from_secs(1));

        let mut supervisor = FailingSupervisor { fail_on: "zebra on as65002r1".to_string(), events: Vec::new() };
        let err = launch(&plan, &mut supervisor).unwrap_err();

        assert!(matches!(err, SupervisorError::Start { .. }));
        assert_eq!(
            supervisor.events,
            vec![
                "start zebra on as65001r1",
                "start bgpd on as65001r1",
                "stop bgpd on as65001r1",
                "stop zebra on as65001r1",
            ]
        );
    }

    const FABRIC: &str = r#"
general:
  routing:
    target: frr
controllers:
  instances: 2
switches:
  - name: s1
    dpid: "1"
  - name: br0
    kind: bridge
autonomous_systems:
  - asn: 65000
    sdn: true
    links:
      - to: s1
  - asn: 65001
    routes: [10.1.0.0/16]
    routed_networks:
      - host: h1
peerings:
  - {a: 65001, b: 65000, vlan: true}
hosts:
  - name: h2
    addressing:
      dhcp:
        family: v4
    links: [br0]
  - name: dhcp1
    addressing:
      static:
        ips: [10.9.0.1/24]
    services:
      - dhcp_server: {}
    links: [br0]
links:
  - {a: br0, b: s1}
"#;

    #[test]
    fn test_end_to_end_generation() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FABRIC.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();

        let output = TempDir::new().unwrap();
        let summary = orchestrator::generate(&config, output.path(), false).unwrap();
        assert_eq!(summary.routers, 2);
        assert_eq!(summary.devices, 1);

        let netcfg = std::fs::read_to_string(output.path().join("netcfg.json")).unwrap();
        assert!(netcfg.contains("of:0000000000000001"));

        let bgpd = std::fs::read_to_string(output.path().join("configs/as65001r1-bgpd.conf")).unwrap();
        assert!(bgpd.contains("address-family ipv4 unicast"));
        let zebra = std::fs::read_to_string(output.path().join("configs/as65000r1-zebra.conf")).unwrap();
        assert!(zebra.contains("fpm address 192.168.1.1 port 2620"));

        let topology: Topology =
            serde_yaml::from_str(&std::fs::read_to_string(output.path().join("topology.yaml")).unwrap()).unwrap();
        assert!(topology.node("ONOS2").is_some());
        let h1 = topology.node("h1").unwrap();
        assert_eq!(h1.first_ipv4(), Some("10.1.0.1".parse().unwrap()));

        let plan = std::fs::read_to_string(output.path().join("plan.yaml")).unwrap();
        assert!(plan.contains("kind: dhclient"));
        assert!(plan.contains("kind: dhcpd"));
        let gateway: IpAddr = "10.1.255.254".parse().unwrap();
        assert!(plan.contains(&gateway.to_string()));
    }
}
