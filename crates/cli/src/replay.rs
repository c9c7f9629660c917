//! Replay inventory
//!
//! Devices whose command outputs are read from a YAML file instead of a live
//! session:
//!
//! ```yaml
//! devices:
//!   - name: leaf1
//!     tags: [leaf, dc1]
//!     outputs:
//!       show zerotouch:
//!         mode: disabled
//!       show running-config diffs: ""
//!   - name: leaf2
//!     reachable: false
//! ```
//!
//! Outputs are read as the format each command declares: any value answers a
//! json command, strings included, while text commands need a string.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use netverify_engine::{
    CollectedCommand, CommandOutput, ConnectionState, Device, DeviceError, Inventory, OutputFormat,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// One device of an inventory file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceRecord {
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "default_reachable")]
    pub reachable: bool,
    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
}

fn default_reachable() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryFile {
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
}

/// A device answering from recorded outputs
#[derive(Debug)]
pub struct ReplayDevice {
    record: DeviceRecord,
    state: Mutex<ConnectionState>,
}

impl ReplayDevice {
    pub fn new(record: DeviceRecord) -> Self {
        Self {
            record,
            state: Mutex::new(ConnectionState::Pending),
        }
    }

    fn answer(&self, collected: &CollectedCommand) -> Result<CommandOutput, DeviceError> {
        let command = &collected.command;
        let output = self
            .record
            .outputs
            .get(&command.command)
            .ok_or_else(|| DeviceError::CommandUnavailable {
                device: self.record.name.clone(),
                command: command.command.clone(),
            })?;

        match (command.ofmt, output) {
            (OutputFormat::Json, value) => Ok(CommandOutput::Json(value.clone())),
            (OutputFormat::Text, Value::String(text)) => Ok(CommandOutput::Text(text.clone())),
            (OutputFormat::Text, _) => Err(DeviceError::WrongFormat {
                command: command.command.clone(),
                expected: "text",
                found: "json",
            }),
        }
    }
}

#[async_trait]
impl Device for ReplayDevice {
    fn name(&self) -> &str {
        &self.record.name
    }

    fn tags(&self) -> &BTreeSet<String> {
        &self.record.tags
    }

    fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    async fn connect(&self) {
        let state = if self.record.reachable {
            ConnectionState::Established
        } else {
            warn!("Device {} is unreachable", self.record.name);
            ConnectionState::Unreachable
        };
        *self.state.lock() = state;
    }

    async fn collect(&self, commands: &mut [CollectedCommand]) -> Result<(), DeviceError> {
        if !self.is_established() {
            return Err(DeviceError::NotConnected(self.record.name.clone()));
        }
        for collected in commands.iter_mut() {
            debug!("{}: {}", self.record.name, collected.command.command);
            collected.output = Some(self.answer(collected)?);
        }
        Ok(())
    }
}

/// Inventory of replay devices
#[derive(Debug, Default)]
pub struct ReplayInventory {
    devices: Vec<Arc<ReplayDevice>>,
}

impl ReplayInventory {
    pub fn new(file: InventoryFile) -> Self {
        Self {
            devices: file
                .devices
                .into_iter()
                .map(|record| Arc::new(ReplayDevice::new(record)))
                .collect(),
        }
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let file: InventoryFile = if content.trim().is_empty() {
            InventoryFile::default()
        } else {
            serde_yaml::from_str(content).context("invalid inventory document")?
        };
        Ok(Self::new(file))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read inventory {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("in {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Inventory for ReplayInventory {
    fn devices(&self) -> Vec<Arc<dyn Device>> {
        self.devices
            .iter()
            .map(|d| d.clone() as Arc<dyn Device>)
            .collect()
    }
}
