//! Reachability and neighbor checks

use std::net::Ipv4Addr;

use async_trait::async_trait;
use netverify_engine::{
    Command, CommandSpec, CommandTemplate, CollectedCommand, FieldError, RegistryError,
    RenderError, Test, TestInput, TestRegistry, UnitArguments, UnitError, Verdict,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{first_command, lookup};

pub const NAMESPACE: &str = "netverify.tests.connectivity";

pub fn register(registry: &mut TestRegistry) -> Result<(), RegistryError> {
    registry.register(NAMESPACE, VerifyReachability)?;
    registry.register(NAMESPACE, VerifyLLDPNeighbors)?;
    registry.set_location(NAMESPACE, file!())
}

/// A remote host to ping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub destination: Ipv4Addr,
    /// Source address or egress interface
    pub source: String,
    #[serde(default = "default_vrf")]
    pub vrf: String,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_vrf() -> String {
    "default".to_string()
}

fn default_repeat() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityInput {
    pub hosts: Vec<Host>,
}

impl TestInput for ReachabilityInput {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        for (i, host) in self.hosts.iter().enumerate() {
            if host.source.trim().is_empty() {
                errors.push(FieldError::new(format!("hosts.{}.source", i), "must not be empty"));
            }
            if host.repeat == 0 {
                errors.push(FieldError::new(
                    format!("hosts.{}.repeat", i),
                    "must be greater than 0",
                ));
            }
        }
        errors
    }
}

/// Every destination must answer all pings
pub struct VerifyReachability;

#[async_trait]
impl Test for VerifyReachability {
    type Input = ReachabilityInput;
    const NAME: &'static str = "VerifyReachability";
    const DESCRIPTION: &'static str =
        "Test the network reachability to one or many destination IP(s).";
    const CATEGORIES: &'static [&'static str] = &["connectivity"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandTemplate::new("ping vrf {vrf} {destination} source {source} repeat {repeat}").into()]
    }

    fn render(
        &self,
        template: &CommandTemplate,
        inputs: &ReachabilityInput,
        _args: &UnitArguments,
    ) -> Result<Vec<Command>, RenderError> {
        inputs
            .hosts
            .iter()
            .map(|host| {
                let mut params = Map::new();
                params.insert("destination".into(), Value::from(host.destination.to_string()));
                params.insert("source".into(), Value::from(host.source.clone()));
                params.insert("vrf".into(), Value::from(host.vrf.clone()));
                params.insert("repeat".into(), Value::from(host.repeat));
                template.render(&params)
            })
            .collect()
    }

    async fn evaluate(
        &self,
        _: &ReachabilityInput,
        commands: &[CollectedCommand],
    ) -> Result<Verdict, UnitError> {
        let mut failures = Vec::new();
        for collected in commands {
            let command = &collected.command;
            let (source, destination, repeat) = match (
                command.param("source"),
                command.param("destination"),
                command.param("repeat"),
            ) {
                (Some(s), Some(d), Some(r)) => (s, d, r),
                _ => {
                    return Err(UnitError::Evaluate(format!(
                        "a parameter is missing to execute the test for command '{}'",
                        command.command
                    )))
                }
            };

            let first = lookup(collected.json_output()?, "/messages/0")?;
            let received = format!("{} received", repeat);
            if !first.as_str().map_or(false, |m| m.contains(&received)) {
                failures.push(format!("{} -> {}", plain(source), plain(destination)));
            }
        }

        if failures.is_empty() {
            Ok(Verdict::success())
        } else {
            Ok(Verdict::failure(format!(
                "Connectivity test failed for the following source-destination pairs: {}",
                failures.join(", ")
            )))
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// An expected LLDP adjacency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub port: String,
    pub neighbor_device: String,
    pub neighbor_port: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LldpInput {
    pub neighbors: Vec<Neighbor>,
}

impl TestInput for LldpInput {}

/// Every listed port must see the expected LLDP neighbor
pub struct VerifyLLDPNeighbors;

#[async_trait]
impl Test for VerifyLLDPNeighbors {
    type Input = LldpInput;
    const NAME: &'static str = "VerifyLLDPNeighbors";
    const DESCRIPTION: &'static str =
        "Verifies that the provided LLDP neighbors are connected properly.";
    const CATEGORIES: &'static [&'static str] = &["connectivity"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![Command::new("show lldp neighbors detail").into()]
    }

    async fn evaluate(&self, inputs: &LldpInput, commands: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        let output = first_command(Self::NAME, commands)?.json_output()?;
        let neighbors = lookup(output, "/lldpNeighbors")?;

        let mut not_configured = Vec::new();
        let mut no_neighbor = Vec::new();
        let mut wrong_neighbor = Vec::new();
        for expected in &inputs.neighbors {
            let info = match neighbors.get(&expected.port) {
                None => {
                    not_configured.push(expected.port.as_str());
                    continue;
                }
                Some(port) => port.get("lldpNeighborInfo").and_then(Value::as_array),
            };
            match info.and_then(|entries| entries.first()) {
                None => no_neighbor.push(expected.port.as_str()),
                Some(first) => {
                    let device = first.get("systemName").and_then(Value::as_str);
                    let port = first
                        .pointer("/neighborInterfaceInfo/interfaceId_v2")
                        .and_then(Value::as_str);
                    if device != Some(expected.neighbor_device.as_str())
                        || port != Some(expected.neighbor_port.as_str())
                    {
                        wrong_neighbor.push(expected.port.as_str());
                    }
                }
            }
        }

        let mut failures = Vec::new();
        for (reason, ports) in [
            ("port not configured", &not_configured),
            ("no LLDP neighbor", &no_neighbor),
            ("wrong LLDP neighbor", &wrong_neighbor),
        ] {
            if !ports.is_empty() {
                failures.push(format!("{}: {}", reason, ports.join(", ")));
            }
        }

        if failures.is_empty() {
            Ok(Verdict::success())
        } else {
            Ok(Verdict::failure(format!(
                "The following port(s) have issues: {}",
                failures.join("; ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netverify_engine::{CommandOutput, TestStatus, TestVariant};
    use serde_json::json;

    fn reachability(hosts: Value) -> ReachabilityInput {
        serde_json::from_value(json!({ "hosts": hosts })).unwrap()
    }

    #[test]
    fn test_reachability_renders_one_ping_per_host() {
        let inputs = reachability(json!([
            {"destination": "10.0.0.1", "source": "Management0"},
            {"destination": "10.0.0.2", "source": "10.1.1.1", "vrf": "MGMT", "repeat": 5},
        ]));
        let template = match &VerifyReachability.commands()[0] {
            CommandSpec::Template(t) => t.clone(),
            other => panic!("unexpected command: {other:?}"),
        };

        let commands = VerifyReachability
            .render(&template, &inputs, &UnitArguments::default())
            .unwrap();
        assert_eq!(commands[0].command, "ping vrf default 10.0.0.1 source Management0 repeat 2");
        assert_eq!(commands[1].command, "ping vrf MGMT 10.0.0.2 source 10.1.1.1 repeat 5");
    }

    #[test]
    fn test_reachability_validation() {
        let err = VerifyReachability
            .construct_input(Some(
                json!({"hosts": [{"destination": "10.0.0.1", "source": "", "repeat": 0}]})
                    .as_object()
                    .cloned()
                    .unwrap(),
            ))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("hosts.0.source"));
        assert!(message.contains("hosts.0.repeat"));

        let bad_ip = VerifyReachability.construct_input(Some(
            json!({"hosts": [{"destination": "not-an-ip", "source": "Management0"}]})
                .as_object()
                .cloned()
                .unwrap(),
        ));
        assert!(bad_ip.is_err());
    }

    #[tokio::test]
    async fn test_reachability_evaluation() {
        let inputs = reachability(json!([
            {"destination": "10.0.0.1", "source": "Management0"},
            {"destination": "10.0.0.2", "source": "Management0"},
        ]));
        let template = CommandTemplate::new("ping vrf {vrf} {destination} source {source} repeat {repeat}");
        let commands = VerifyReachability
            .render(&template, &inputs, &UnitArguments::default())
            .unwrap();
        let replies = [
            "2 packets transmitted, 2 received, 0% packet loss",
            "2 packets transmitted, 0 received, 100% packet loss",
        ];
        let collected: Vec<_> = commands
            .into_iter()
            .zip(replies)
            .map(|(command, reply)| CollectedCommand {
                command,
                output: Some(CommandOutput::Json(json!({ "messages": [reply] }))),
            })
            .collect();

        let verdict = VerifyReachability.evaluate(&inputs, &collected).await.unwrap();
        assert_eq!(verdict.status, TestStatus::Failure);
        assert!(verdict.messages[0].ends_with("Management0 -> 10.0.0.2"));
    }

    #[tokio::test]
    async fn test_lldp_neighbors() {
        let inputs: LldpInput = serde_json::from_value(json!({"neighbors": [
            {"port": "Ethernet1", "neighbor_device": "spine1", "neighbor_port": "Ethernet1"},
            {"port": "Ethernet2", "neighbor_device": "spine2", "neighbor_port": "Ethernet1"},
            {"port": "Ethernet3", "neighbor_device": "spine3", "neighbor_port": "Ethernet1"},
            {"port": "Ethernet4", "neighbor_device": "spine4", "neighbor_port": "Ethernet1"},
        ]}))
        .unwrap();
        let output = json!({"lldpNeighbors": {
            "Ethernet1": {"lldpNeighborInfo": [
                {"systemName": "spine1", "neighborInterfaceInfo": {"interfaceId_v2": "Ethernet1"}}
            ]},
            "Ethernet2": {"lldpNeighborInfo": [
                {"systemName": "spine9", "neighborInterfaceInfo": {"interfaceId_v2": "Ethernet1"}}
            ]},
            "Ethernet3": {"lldpNeighborInfo": []}
        }});
        let collected = vec![CollectedCommand {
            command: Command::new("show lldp neighbors detail"),
            output: Some(CommandOutput::Json(output)),
        }];

        let verdict = VerifyLLDPNeighbors.evaluate(&inputs, &collected).await.unwrap();
        assert_eq!(
            verdict,
            Verdict::failure(
                "The following port(s) have issues: port not configured: Ethernet4; \
                 no LLDP neighbor: Ethernet3; wrong LLDP neighbor: Ethernet2"
            )
        );

        assert!(VerifyLLDPNeighbors.evaluate(&inputs, &[]).await.is_err());
    }
}
