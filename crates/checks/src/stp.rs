//! Spanning tree checks

use async_trait::async_trait;
use netverify_engine::{
    Command, CommandSpec, CommandTemplate, CollectedCommand, FieldError, RegistryError,
    RenderError, Test, TestInput, TestRegistry, UnitArguments, UnitError, Verdict,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NAMESPACE: &str = "netverify.tests.stp";

pub fn register(registry: &mut TestRegistry) -> Result<(), RegistryError> {
    registry.register(NAMESPACE, VerifySTPMode)?;
    registry.set_location(NAMESPACE, file!())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StpMode {
    #[default]
    #[serde(rename = "mstp")]
    Mstp,
    #[serde(rename = "rstp")]
    Rstp,
    #[serde(rename = "rapidPvst")]
    RapidPvst,
}

impl StpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StpMode::Mstp => "mstp",
            StpMode::Rstp => "rstp",
            StpMode::RapidPvst => "rapidPvst",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StpModeInput {
    #[serde(default)]
    pub mode: StpMode,
    pub vlans: Vec<u16>,
}

impl TestInput for StpModeInput {
    fn validate(&self) -> Vec<FieldError> {
        self.vlans
            .iter()
            .enumerate()
            .filter(|(_, vlan)| !(1..=4094u16).contains(*vlan))
            .map(|(i, vlan)| {
                FieldError::new(format!("vlans.{}", i), format!("{} is not a valid VLAN id", vlan))
            })
            .collect()
    }
}

/// STP must run in the expected mode on every listed VLAN
pub struct VerifySTPMode;

#[async_trait]
impl Test for VerifySTPMode {
    type Input = StpModeInput;
    const NAME: &'static str = "VerifySTPMode";
    const DESCRIPTION: &'static str = "Verifies the configured STP mode for a provided list of VLAN(s).";
    const CATEGORIES: &'static [&'static str] = &["stp"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandTemplate::new("show spanning-tree vlan {vlan}").into()]
    }

    fn render(
        &self,
        template: &CommandTemplate,
        inputs: &StpModeInput,
        _args: &UnitArguments,
    ) -> Result<Vec<Command>, RenderError> {
        inputs
            .vlans
            .iter()
            .map(|vlan| {
                let mut params = Map::new();
                params.insert("vlan".into(), Value::from(*vlan));
                template.render(&params)
            })
            .collect()
    }

    async fn evaluate(&self, inputs: &StpModeInput, commands: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        let mut not_configured = Vec::new();
        let mut wrong_mode = Vec::new();
        for collected in commands {
            let vlan = collected.command.param("vlan").cloned().unwrap_or(Value::Null);
            let pointer = format!(
                "/spanningTreeVlanInstances/{}/spanningTreeVlanInstance/protocol",
                vlan
            );
            match collected.json_output()?.pointer(&pointer).and_then(Value::as_str) {
                None | Some("") => not_configured.push(vlan.to_string()),
                Some(mode) if mode != inputs.mode.as_str() => wrong_mode.push(vlan.to_string()),
                Some(_) => {}
            }
        }

        let mut failures = Vec::new();
        if !not_configured.is_empty() {
            failures.push(format!(
                "STP mode '{}' not configured for the following VLAN(s): {}",
                inputs.mode.as_str(),
                not_configured.join(", ")
            ));
        }
        if !wrong_mode.is_empty() {
            failures.push(format!(
                "Wrong STP mode configured for the following VLAN(s): {}",
                wrong_mode.join(", ")
            ));
        }
        Ok(Verdict::from_failures(failures))
    }
}
