//! NetVerify built-in checks
//!
//! Test plugins grouped by namespace:
//!
//! | Namespace | Tests |
//! |-----------|-------|
//! | `netverify.tests.configuration` | `VerifyZeroTouch`, `VerifyRunningConfigDiffs` |
//! | `netverify.tests.connectivity` | `VerifyReachability`, `VerifyLLDPNeighbors` |
//! | `netverify.tests.routing` | `VerifyBGPIPv4UnicastCount` |
//! | `netverify.tests.stp` | `VerifySTPMode` |

use netverify_engine::{CollectedCommand, RegistryError, TestRegistry, UnitError};
use serde_json::Value;
use tracing::debug;

pub mod configuration;
pub mod connectivity;
pub mod routing;
pub mod stp;

/// Root namespace of the built-in checks
pub const ROOT_NAMESPACE: &str = "netverify.tests";

/// Register every built-in check
pub fn register_builtin(registry: &mut TestRegistry) -> Result<(), RegistryError> {
    configuration::register(registry)?;
    connectivity::register(registry)?;
    routing::register(registry)?;
    stp::register(registry)?;
    debug!("Registered {} built-in test(s)", registry.len());
    Ok(())
}

/// A registry holding the built-in checks only
pub fn builtin_registry() -> Result<TestRegistry, RegistryError> {
    let mut registry = TestRegistry::new();
    register_builtin(&mut registry)?;
    Ok(registry)
}

/// Value at a JSON pointer, or an evaluation error naming it
pub(crate) fn lookup<'a>(output: &'a Value, pointer: &str) -> Result<&'a Value, UnitError> {
    output
        .pointer(pointer)
        .ok_or_else(|| UnitError::Evaluate(format!("'{}' not found in command output", pointer)))
}

/// The single command a check declared
pub(crate) fn first_command<'a>(
    test: &str,
    commands: &'a [CollectedCommand],
) -> Result<&'a CollectedCommand, UnitError> {
    commands
        .first()
        .ok_or_else(|| UnitError::Evaluate(format!("{} received no command output", test)))
}
