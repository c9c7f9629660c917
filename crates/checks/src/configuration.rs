//! Device configuration checks

use async_trait::async_trait;
use netverify_engine::{
    Command, CommandSpec, CollectedCommand, NoInput, RegistryError, Test, TestRegistry, UnitError,
    Verdict,
};

use crate::{first_command, lookup};

pub const NAMESPACE: &str = "netverify.tests.configuration";

pub fn register(registry: &mut TestRegistry) -> Result<(), RegistryError> {
    registry.register(NAMESPACE, VerifyZeroTouch)?;
    registry.register(NAMESPACE, VerifyRunningConfigDiffs)?;
    registry.set_location(NAMESPACE, file!())
}

/// ZeroTouch provisioning must be disabled
pub struct VerifyZeroTouch;

#[async_trait]
impl Test for VerifyZeroTouch {
    type Input = NoInput;
    const NAME: &'static str = "VerifyZeroTouch";
    const DESCRIPTION: &'static str = "Verifies ZeroTouch is disabled";
    const CATEGORIES: &'static [&'static str] = &["configuration"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![Command::new("show zerotouch").into()]
    }

    async fn evaluate(&self, _: &NoInput, commands: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        let output = first_command(Self::NAME, commands)?.json_output()?;
        if lookup(output, "/mode")? == "disabled" {
            Ok(Verdict::success())
        } else {
            Ok(Verdict::failure("ZTP is NOT disabled"))
        }
    }
}

/// Running and startup configurations must match
pub struct VerifyRunningConfigDiffs;

#[async_trait]
impl Test for VerifyRunningConfigDiffs {
    type Input = NoInput;
    const NAME: &'static str = "VerifyRunningConfigDiffs";
    const DESCRIPTION: &'static str =
        "Verifies there is no difference between the running-config and the startup-config";
    const CATEGORIES: &'static [&'static str] = &["configuration"];

    fn commands(&self) -> Vec<CommandSpec> {
        vec![Command::text("show running-config diffs").into()]
    }

    async fn evaluate(&self, _: &NoInput, commands: &[CollectedCommand]) -> Result<Verdict, UnitError> {
        let diff = first_command(Self::NAME, commands)?.text_output()?;
        if diff.is_empty() {
            Ok(Verdict::success())
        } else {
            Ok(Verdict::failure(diff))
        }
    }
}
