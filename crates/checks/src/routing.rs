//! Routing protocol checks

use async_trait::async_trait;
use netverify_engine::{
    CommandSpec, CommandTemplate, CollectedCommand, FieldError, RegistryError, Test, TestInput,
    TestRegistry, UnitError, Verdict,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::lookup;

pub const NAMESPACE: &str = "netverify.tests.routing";

pub fn register(registry: &mut TestRegistry) -> Result<(), RegistryError> {
    registry.register(NAMESPACE, VerifyBGPIPv4UnicastCount)?;
    registry.set_location(NAMESPACE, file!())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VrfParams {
    pub vrf: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BgpCountInput {
    /// Expected number of established IPv4 unicast peers per VRF
    pub number: u32,
    #[serde(default)]
    pub template_params: Vec<VrfParams>,
}

impl TestInput for BgpCountInput {
    fn validate(&self) -> Vec<FieldError> {
        if self.template_params.is_empty() {
            vec![FieldError::new("template_params", "at least one vrf is required")]
        } else {
            Vec::new()
        }
    }
}

/// Each VRF must have the expected number of established IPv4 unicast peers
pub struct VerifyBGPIPv4UnicastCount;

#[async_trait]
impl Test for VerifyBGPIPv4UnicastCount {
    type Input = BgpCountInput;
    const NAME: &'static str = "VerifyBGPIPv4UnicastCount";
    const DESCRIPTION: &'static str =
        "Verifies all IPv4 unicast BGP sessions are established and the number of peers is correct";
    const CATEGORIES: &'static [&'static str] = &["routing", "bgp"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandTemplate::new("show bgp ipv4 unicast summary vrf {vrf}").into()]
    }

    async fn evaluate(&self, inputs: &BgpCountInput, commands: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        let mut failures = Vec::new();
        for collected in commands {
            let vrf = collected
                .command
                .param("vrf")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    UnitError::Evaluate(format!(
                        "missing vrf parameter for command '{}'",
                        collected.command.command
                    ))
                })?;

            let output = collected.json_output()?;
            let peers = match lookup(output, &format!("/vrfs/{}/peers", vrf)) {
                Ok(Value::Object(peers)) => peers,
                _ => {
                    failures.push(format!("vrf {}: no IPv4 unicast peers", vrf));
                    continue;
                }
            };

            let down: Vec<&str> = peers
                .iter()
                .filter(|(_, peer)| {
                    peer.get("peerState").and_then(Value::as_str) != Some("Established")
                })
                .map(|(address, _)| address.as_str())
                .collect();
            if peers.len() != inputs.number as usize {
                failures.push(format!(
                    "vrf {}: expected {} peer(s), found {}",
                    vrf,
                    inputs.number,
                    peers.len()
                ));
            }
            if !down.is_empty() {
                failures.push(format!("vrf {}: peers not established: {}", vrf, down.join(", ")));
            }
        }
        Ok(Verdict::from_failures(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netverify_engine::{CommandOutput, TestStatus, TestVariant, UnitArguments, ValidatedInput};
    use serde_json::json;

    fn bound(value: Value) -> ValidatedInput<BgpCountInput> {
        ValidatedInput::construct(
            VerifyBGPIPv4UnicastCount::NAME,
            value.as_object().cloned(),
        )
        .unwrap()
    }

    fn summary(peers: Value) -> CommandOutput {
        CommandOutput::Json(json!({ "vrfs": { "default": { "peers": peers } } }))
    }

    #[test]
    fn test_requires_template_params() {
        let err = VerifyBGPIPv4UnicastCount
            .construct_input(json!({"number": 2}).as_object().cloned())
            .unwrap_err();
        assert!(err.to_string().contains("template_params"));
    }

    #[test]
    fn test_one_command_per_vrf() {
        let input = bound(json!({"number": 2, "template_params": [{"vrf": "default"}, {"vrf": "RED"}]}));
        let args = UnitArguments::from_input(&input).unwrap();
        let commands = VerifyBGPIPv4UnicastCount
            .instance_commands(&input, &args)
            .unwrap();

        let rendered: Vec<_> = commands.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(
            rendered,
            vec![
                "show bgp ipv4 unicast summary vrf default",
                "show bgp ipv4 unicast summary vrf RED"
            ]
        );
        assert_eq!(commands[0].param("number"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_peer_count_and_state() {
        let input = bound(json!({"number": 2, "template_params": [{"vrf": "default"}]}));
        let args = UnitArguments::from_input(&input).unwrap();
        let command = VerifyBGPIPv4UnicastCount
            .instance_commands(&input, &args)
            .unwrap()
            .remove(0);

        let healthy = vec![CollectedCommand {
            command: command.clone(),
            output: Some(summary(json!({
                "10.0.0.1": {"peerState": "Established"},
                "10.0.0.2": {"peerState": "Established"}
            }))),
        }];
        let verdict = VerifyBGPIPv4UnicastCount
            .evaluate(&input.params, &healthy)
            .await
            .unwrap();
        assert_eq!(verdict.status, TestStatus::Success);

        let degraded = vec![CollectedCommand {
            command,
            output: Some(summary(json!({"10.0.0.1": {"peerState": "Idle"}}))),
        }];
        let verdict = VerifyBGPIPv4UnicastCount
            .evaluate(&input.params, &degraded)
            .await
            .unwrap();
        assert_eq!(
            verdict.messages,
            vec![
                "vrf default: expected 2 peer(s), found 1",
                "vrf default: peers not established: 10.0.0.1"
            ]
        );
    }
}
