//! The test plugin contract
//!
//! A concrete test implements [`Test`] with an associated input schema. The
//! engine only ever handles tests through the object-safe [`TestVariant`],
//! which every [`Test`] gets for free.

use std::sync::Arc;

use async_trait::async_trait;
use netverify_common::TestStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{InputError, RenderError, UnitError};
use crate::input::{self, BoundInput, InputType, SharedInput, TestInput, ValidatedInput};

/// Reserved input key holding per-unit template parameter sets
pub const TEMPLATE_PARAMS_KEY: &str = "template_params";

/// Output format requested from the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

/// A concrete command to run on a device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub command: String,
    pub ofmt: OutputFormat,
    /// Parameters the command was rendered from, empty for static commands
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl Command {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ofmt: OutputFormat::Json,
            params: Map::new(),
        }
    }

    pub fn text(command: impl Into<String>) -> Self {
        Self {
            ofmt: OutputFormat::Text,
            ..Self::new(command)
        }
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// A command with `{placeholders}` filled in per unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTemplate {
    pub template: String,
    pub ofmt: OutputFormat,
}

impl CommandTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            ofmt: OutputFormat::Json,
        }
    }

    pub fn text(template: impl Into<String>) -> Self {
        Self {
            ofmt: OutputFormat::Text,
            ..Self::new(template)
        }
    }

    /// Render with the given parameters. `{{` and `}}` produce literal braces.
    pub fn render(&self, params: &Map<String, Value>) -> Result<Command, RenderError> {
        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => return Err(RenderError::Unterminated(self.template.clone())),
                        }
                    }
                    let value = params.get(name.trim()).ok_or_else(|| RenderError::MissingParam {
                        template: self.template.clone(),
                        param: name.trim().to_string(),
                    })?;
                    match value {
                        Value::String(s) => out.push_str(s),
                        other => out.push_str(&other.to_string()),
                    }
                }
                other => out.push(other),
            }
        }

        Ok(Command {
            command: out,
            ofmt: self.ofmt,
            params: params.clone(),
        })
    }
}

/// A command as declared by a test
#[derive(Debug, Clone, PartialEq)]
pub enum CommandSpec {
    Command(Command),
    Template(CommandTemplate),
}

impl From<Command> for CommandSpec {
    fn from(command: Command) -> Self {
        CommandSpec::Command(command)
    }
}

impl From<CommandTemplate> for CommandSpec {
    fn from(template: CommandTemplate) -> Self {
        CommandSpec::Template(template)
    }
}

/// Output returned by a device for one command.
///
/// Deserialization is untagged and tries `Text` first, so a bare string always
/// reads back as text. Transports that know the command's declared format
/// should build the variant themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Text(String),
    Json(Value),
}

impl CommandOutput {
    pub fn format(&self) -> OutputFormat {
        match self {
            CommandOutput::Json(_) => OutputFormat::Json,
            CommandOutput::Text(_) => OutputFormat::Text,
        }
    }
}

/// A command paired with the output collected for it
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedCommand {
    pub command: Command,
    pub output: Option<CommandOutput>,
}

impl CollectedCommand {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            output: None,
        }
    }

    pub fn is_collected(&self) -> bool {
        self.output.is_some()
    }

    pub fn json_output(&self) -> Result<&Value, UnitError> {
        match &self.output {
            Some(CommandOutput::Json(value)) => Ok(value),
            Some(CommandOutput::Text(_)) => Err(UnitError::Evaluate(format!(
                "command '{}' has text output, expected json",
                self.command.command
            ))),
            None => Err(UnitError::Evaluate(format!(
                "command '{}' has no output",
                self.command.command
            ))),
        }
    }

    pub fn text_output(&self) -> Result<&str, UnitError> {
        match &self.output {
            Some(CommandOutput::Text(text)) => Ok(text),
            Some(CommandOutput::Json(_)) => Err(UnitError::Evaluate(format!(
                "command '{}' has json output, expected text",
                self.command.command
            ))),
            None => Err(UnitError::Evaluate(format!(
                "command '{}' has no output",
                self.command.command
            ))),
        }
    }
}

/// The single outcome recorded by a test evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: TestStatus,
    pub messages: Vec<String>,
}

impl Verdict {
    pub fn success() -> Self {
        Self {
            status: TestStatus::Success,
            messages: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Failure,
            messages: vec![message.into()],
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Skipped,
            messages: vec![message.into()],
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Error,
            messages: vec![message.into()],
        }
    }

    /// Success when `failures` is empty, otherwise a failure carrying them
    pub fn from_failures(failures: Vec<String>) -> Self {
        if failures.is_empty() {
            Self::success()
        } else {
            Self {
                status: TestStatus::Failure,
                messages: failures,
            }
        }
    }
}

/// Arguments handed to one unit: scalar input fields plus the template
/// parameter sets split out of `template_params`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitArguments {
    pub scalars: Map<String, Value>,
    pub template_params: Vec<Map<String, Value>>,
}

impl UnitArguments {
    pub fn from_input(input: &dyn BoundInput) -> Result<Self, serde_json::Error> {
        let mut scalars = match input.arguments()? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(<serde_json::Error as serde::de::Error>::custom(format!(
                    "test inputs must serialize to a mapping, got {}",
                    input::value_kind(&other)
                )))
            }
        };

        let template_params = match scalars.remove(TEMPLATE_PARAMS_KEY) {
            None | Some(Value::Null) => Vec::new(),
            Some(sets) => serde_json::from_value(sets)?,
        };

        Ok(Self {
            scalars,
            template_params,
        })
    }

    /// Render `template` once per template parameter set, each set layered
    /// over the scalar arguments. Without sets the template is rendered once.
    pub fn render_each(&self, template: &CommandTemplate) -> Result<Vec<Command>, RenderError> {
        if self.template_params.is_empty() {
            return Ok(vec![template.render(&self.scalars)?]);
        }

        self.template_params
            .iter()
            .map(|set| {
                let mut merged = self.scalars.clone();
                merged.extend(set.iter().map(|(k, v)| (k.clone(), v.clone())));
                template.render(&merged)
            })
            .collect()
    }
}

/// A concrete test
#[async_trait]
pub trait Test: Send + Sync + 'static {
    type Input: TestInput;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;
    const CATEGORIES: &'static [&'static str];

    /// Commands to collect, static or templated
    fn commands(&self) -> Vec<CommandSpec>;

    /// Produce concrete commands from a declared template
    fn render(
        &self,
        template: &CommandTemplate,
        _inputs: &Self::Input,
        args: &UnitArguments,
    ) -> Result<Vec<Command>, RenderError> {
        args.render_each(template)
    }

    /// Evaluate collected outputs into exactly one verdict
    async fn evaluate(
        &self,
        inputs: &Self::Input,
        commands: &[CollectedCommand],
    ) -> Result<Verdict, UnitError>;
}

/// Object-safe view of a [`Test`], the form the catalog and engine use
#[async_trait]
pub trait TestVariant: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn categories(&self) -> &'static [&'static str];

    fn declared_commands(&self) -> Vec<CommandSpec>;

    /// The input schema type this variant accepts
    fn input_type(&self) -> InputType;

    /// Construct this variant's input schema from raw fields
    fn construct_input(&self, fields: Option<Map<String, Value>>) -> Result<SharedInput, InputError>;

    /// Concrete commands for one unit
    fn instance_commands(
        &self,
        inputs: &dyn BoundInput,
        args: &UnitArguments,
    ) -> Result<Vec<Command>, UnitError>;

    async fn evaluate_input(
        &self,
        inputs: &dyn BoundInput,
        commands: &[CollectedCommand],
    ) -> Result<Verdict, UnitError>;
}

fn typed_inputs<'a, T: Test>(inputs: &'a dyn BoundInput) -> Result<&'a T::Input, UnitError> {
    input::downcast::<T::Input>(inputs)
        .map(|bound| &bound.params)
        .ok_or_else(|| UnitError::InputMismatch {
            expected: InputType::of::<T::Input>().name(),
            found: inputs.input_type().name(),
        })
}

#[async_trait]
impl<T: Test> TestVariant for T {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn description(&self) -> &'static str {
        T::DESCRIPTION
    }

    fn categories(&self) -> &'static [&'static str] {
        T::CATEGORIES
    }

    fn declared_commands(&self) -> Vec<CommandSpec> {
        Test::commands(self)
    }

    fn input_type(&self) -> InputType {
        InputType::of::<T::Input>()
    }

    fn construct_input(&self, fields: Option<Map<String, Value>>) -> Result<SharedInput, InputError> {
        let input = ValidatedInput::<T::Input>::construct(T::NAME, fields)?;
        Ok(Arc::new(input))
    }

    fn instance_commands(
        &self,
        inputs: &dyn BoundInput,
        args: &UnitArguments,
    ) -> Result<Vec<Command>, UnitError> {
        let typed = typed_inputs::<T>(inputs)?;
        let mut commands = Vec::new();
        for spec in Test::commands(self) {
            match spec {
                CommandSpec::Command(command) => commands.push(command),
                CommandSpec::Template(template) => {
                    commands.extend(Test::render(self, &template, typed, args)?)
                }
            }
        }
        Ok(commands)
    }

    async fn evaluate_input(
        &self,
        inputs: &dyn BoundInput,
        commands: &[CollectedCommand],
    ) -> Result<Verdict, UnitError> {
        let typed = typed_inputs::<T>(inputs)?;
        Test::evaluate(self, typed, commands).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_template_render() {
        let template = CommandTemplate::new("ping vrf {vrf} {destination} repeat {repeat}");
        let command = template
            .render(&params(json!({"vrf": "MGMT", "destination": "1.1.1.1", "repeat": 2})))
            .unwrap();
        assert_eq!(command.command, "ping vrf MGMT 1.1.1.1 repeat 2");
        assert_eq!(command.param("vrf"), Some(&json!("MGMT")));
        assert_eq!(command.ofmt, OutputFormat::Json);
    }

    #[test]
    fn test_template_escaped_braces() {
        let template = CommandTemplate::text("show {{json}} {name}");
        let command = template.render(&params(json!({"name": "x"}))).unwrap();
        assert_eq!(command.command, "show {json} x");
        assert_eq!(command.ofmt, OutputFormat::Text);
    }

    #[test]
    fn test_template_missing_param() {
        let template = CommandTemplate::new("show vlan {vlan}");
        let err = template.render(&Map::new()).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingParam {
                template: "show vlan {vlan}".into(),
                param: "vlan".into()
            }
        );
    }

    #[test]
    fn test_template_unterminated() {
        let err = CommandTemplate::new("show vlan {vlan").render(&Map::new()).unwrap_err();
        assert!(matches!(err, RenderError::Unterminated(_)));
    }

    #[test]
    fn test_render_each_per_parameter_set() {
        let args = UnitArguments {
            scalars: params(json!({"number": 3})),
            template_params: vec![params(json!({"vrf": "default"})), params(json!({"vrf": "RED"}))],
        };
        let commands = args
            .render_each(&CommandTemplate::new("show bgp summary vrf {vrf}"))
            .unwrap();
        let rendered: Vec<_> = commands.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(rendered, vec!["show bgp summary vrf default", "show bgp summary vrf RED"]);
        assert_eq!(commands[1].param("number"), Some(&json!(3)));
    }

    #[test]
    fn test_render_each_without_sets_uses_scalars() {
        let args = UnitArguments {
            scalars: params(json!({"intf": "Ethernet1"})),
            template_params: Vec::new(),
        };
        let commands = args.render_each(&CommandTemplate::new("show interfaces {intf}")).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, "show interfaces Ethernet1");
    }

    #[test]
    fn test_output_accessors() {
        let mut collected = CollectedCommand::new(Command::new("show version"));
        assert!(collected.json_output().is_err());

        collected.output = Some(CommandOutput::Json(json!({"version": "4.31"})));
        assert_eq!(collected.json_output().unwrap()["version"], "4.31");
        assert!(collected.text_output().is_err());
    }

    #[test]
    fn test_verdict_from_failures() {
        assert_eq!(Verdict::from_failures(Vec::new()), Verdict::success());
        let verdict = Verdict::from_failures(vec!["a".into(), "b".into()]);
        assert_eq!(verdict.status, TestStatus::Failure);
        assert_eq!(verdict.messages.len(), 2);
    }
}
