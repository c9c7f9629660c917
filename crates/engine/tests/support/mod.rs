//! Mock tests, devices and inventory shared by the engine integration tests

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netverify_engine::{
    Command, CommandOutput, CommandSpec, CommandTemplate, CollectedCommand, ConnectionState,
    Device, DeviceError, Inventory, NoInput, TestInput, TestRegistry, UnitError, Verdict,
};
use netverify_engine::Test;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NAMESPACE: &str = "mock.tests.system";
pub const TEMPLATES: &str = "mock.tests.templates";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EchoInput {
    #[serde(default)]
    pub fail: bool,
}

impl TestInput for EchoInput {}

/// Succeeds unless asked to fail
pub struct VerifyEcho;

#[async_trait]
impl Test for VerifyEcho {
    type Input = EchoInput;
    const NAME: &'static str = "VerifyEcho";
    const DESCRIPTION: &'static str = "Echo the device name";
    const CATEGORIES: &'static [&'static str] = &["system"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![Command::new("show echo").into()]
    }

    async fn evaluate(&self, inputs: &EchoInput, commands: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        commands[0].json_output()?;
        if inputs.fail {
            Ok(Verdict::failure("asked to fail"))
        } else {
            Ok(Verdict::success())
        }
    }
}

/// Evaluation always returns an error
pub struct VerifyBroken;

#[async_trait]
impl Test for VerifyBroken {
    type Input = NoInput;
    const NAME: &'static str = "VerifyBroken";
    const DESCRIPTION: &'static str = "Evaluation fails";
    const CATEGORIES: &'static [&'static str] = &["system"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![Command::new("show echo").into()]
    }

    async fn evaluate(&self, _: &NoInput, _: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        Err(UnitError::Evaluate("broken evaluation".into()))
    }
}

/// Evaluation panics
pub struct VerifyPanics;

#[async_trait]
impl Test for VerifyPanics {
    type Input = NoInput;
    const NAME: &'static str = "VerifyPanics";
    const DESCRIPTION: &'static str = "Evaluation panics";
    const CATEGORIES: &'static [&'static str] = &["system"];

    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }

    async fn evaluate(&self, _: &NoInput, _: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        panic!("evaluation exploded")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VrfParams {
    pub vrf: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VrfInput {
    #[serde(default)]
    pub template_params: Vec<VrfParams>,
}

impl TestInput for VrfInput {}

/// One templated command per VRF; reports the commands it saw
pub struct VerifyVrfs;

#[async_trait]
impl Test for VerifyVrfs {
    type Input = VrfInput;
    const NAME: &'static str = "VerifyVrfs";
    const DESCRIPTION: &'static str = "Check every VRF";
    const CATEGORIES: &'static [&'static str] = &["routing"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![CommandTemplate::new("show vrf {vrf}").into()]
    }

    async fn evaluate(&self, _: &VrfInput, commands: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        Ok(Verdict {
            status: netverify_engine::TestStatus::Success,
            messages: commands.iter().map(|c| c.command.command.clone()).collect(),
        })
    }
}

pub fn registry() -> TestRegistry {
    let mut registry = TestRegistry::new();
    registry.register(NAMESPACE, VerifyEcho).unwrap();
    registry.register(NAMESPACE, VerifyBroken).unwrap();
    registry.register(NAMESPACE, VerifyPanics).unwrap();
    registry.register(TEMPLATES, VerifyVrfs).unwrap();
    registry.set_location(NAMESPACE, "tests/support").unwrap();
    registry
}

/// Shared record of device activity, in order
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Counts collections in flight and remembers the highest count seen
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct MockDevice {
    name: String,
    tags: BTreeSet<String>,
    reachable: bool,
    connect_delay: Duration,
    fail_collect: bool,
    collect_delay: Duration,
    gauge: Option<Gauge>,
    outputs: HashMap<String, CommandOutput>,
    state: Mutex<ConnectionState>,
    journal: Journal,
}

impl MockDevice {
    pub fn new(name: &str, tags: &[&str], journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            reachable: true,
            connect_delay: Duration::from_millis(0),
            fail_collect: false,
            collect_delay: Duration::from_millis(0),
            gauge: None,
            outputs: HashMap::new(),
            state: Mutex::new(ConnectionState::Pending),
            journal: journal.clone(),
        }
    }

    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    pub fn connect_delay(mut self, millis: u64) -> Self {
        self.connect_delay = Duration::from_millis(millis);
        self
    }

    pub fn failing_collect(mut self) -> Self {
        self.fail_collect = true;
        self
    }

    /// Hold every collection for `millis`, tracked by `gauge`
    pub fn slow_collect(mut self, millis: u64, gauge: &Gauge) -> Self {
        self.collect_delay = Duration::from_millis(millis);
        self.gauge = Some(gauge.clone());
        self
    }

    /// Return `output` for `command` instead of the default echo
    pub fn output(mut self, command: &str, output: CommandOutput) -> Self {
        self.outputs.insert(command.to_string(), output);
        self
    }
}

#[async_trait]
impl Device for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    async fn connect(&self) {
        tokio::time::sleep(self.connect_delay).await;
        *self.state.lock() = if self.reachable {
            ConnectionState::Established
        } else {
            ConnectionState::Unreachable
        };
        self.journal.lock().push(format!("connect:{}", self.name));
    }

    async fn collect(&self, commands: &mut [CollectedCommand]) -> Result<(), DeviceError> {
        self.journal.lock().push(format!("collect:{}", self.name));
        if let Some(gauge) = &self.gauge {
            gauge.enter();
            tokio::time::sleep(self.collect_delay).await;
            gauge.leave();
        }
        if self.fail_collect {
            return Err(DeviceError::Transport("session dropped".into()));
        }
        for collected in commands.iter_mut() {
            let output = self
                .outputs
                .get(&collected.command.command)
                .cloned()
                .unwrap_or_else(|| CommandOutput::Json(json!({"device": self.name})));
            collected.output = Some(output);
        }
        Ok(())
    }
}

pub struct MockInventory {
    devices: Vec<Arc<MockDevice>>,
}

impl MockInventory {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices: devices.into_iter().map(Arc::new).collect(),
        }
    }
}

impl Inventory for MockInventory {
    fn devices(&self) -> Vec<Arc<dyn Device>> {
        self.devices
            .iter()
            .map(|d| d.clone() as Arc<dyn Device>)
            .collect()
    }
}

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}
