//! Device inventory contract
//!
//! Transports live outside the engine. A [`Device`] owns its session and
//! fills in command outputs; an [`Inventory`] connects devices in bulk and
//! selects the ones a run targets.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DeviceError;
use crate::plugin::CollectedCommand;

/// Session state of a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected yet
    #[default]
    Pending,
    Established,
    Unreachable,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Pending => write!(f, "pending"),
            ConnectionState::Established => write!(f, "established"),
            ConnectionState::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// A network device the engine can run tests against.
///
/// Units targeting the same device call [`Device::collect`] concurrently;
/// implementations serialize access to their session if the transport
/// cannot multiplex.
#[async_trait]
pub trait Device: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn tags(&self) -> &BTreeSet<String>;

    fn state(&self) -> ConnectionState;

    fn is_established(&self) -> bool {
        self.state() == ConnectionState::Established
    }

    /// Open the session, updating [`Device::state`]
    async fn connect(&self);

    /// Fill in the output of every command in place
    async fn collect(&self, commands: &mut [CollectedCommand]) -> Result<(), DeviceError>;
}

/// A set of devices
#[async_trait]
pub trait Inventory: Send + Sync {
    fn devices(&self) -> Vec<Arc<dyn Device>>;

    /// Connect every device concurrently and wait for all of them
    async fn connect_all(&self) {
        let devices = self.devices();
        join_all(devices.iter().map(|d| d.connect())).await;
        let established = devices.iter().filter(|d| d.is_established()).count();
        info!(
            "Connected inventory: {}/{} device(s) established",
            established,
            devices.len()
        );
    }

    /// Devices eligible for a run. An empty or absent tag list selects
    /// every device; otherwise one shared tag is enough.
    fn select_devices(&self, established_only: bool, tags: Option<&[String]>) -> Vec<Arc<dyn Device>> {
        self.devices()
            .into_iter()
            .filter(|device| {
                let selected = (!established_only || device.is_established())
                    && device_matches(device.as_ref(), tags);
                if !selected {
                    debug!("Device {} not selected ({})", device.name(), device.state());
                }
                selected
            })
            .collect()
    }
}

fn device_matches(device: &dyn Device, tags: Option<&[String]>) -> bool {
    match tags {
        Some(tags) if !tags.is_empty() => tags.iter().any(|tag| device.tags().contains(tag)),
        _ => true,
    }
}
