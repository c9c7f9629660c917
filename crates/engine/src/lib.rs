//! NetVerify Engine
//!
//! Validates declarative test catalogs and runs them concurrently against a
//! device inventory:
//! - Binds raw catalog data to each test's typed input schema
//! - Resolves namespaces and tests through an explicit registry
//! - Fans out one unit per device and definition, then waits for all of them
//! - Aggregates per-device results
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Catalog construction                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CatalogLoader (YAML document)     Catalog::from_list       │
//! │    ├── TestRegistry::contains_namespace / resolve_test      │
//! │    └── input::bind(variant, raw) -> SharedInput             │
//! │          └── ValidatedInput<T::Input> { filters,            │
//! │                result_overwrite, params }                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │                          Execution                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Runner::run(inventory, catalog, options)                   │
//! │    ├── Inventory::connect_all()          (barrier)          │
//! │    ├── Inventory::select_devices(established_only, tags)    │
//! │    ├── spawn: device x definition units  (fan-out)          │
//! │    │     ├── TestVariant::instance_commands (templates)     │
//! │    │     ├── Device::collect                                │
//! │    │     └── TestVariant::evaluate_input -> Verdict         │
//! │    └── join all -> ResultManager          (fan-in)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod error;
pub mod input;
pub mod inventory;
pub mod loader;
pub mod plugin;
pub mod registry;
pub mod results;
pub mod runner;

pub use catalog::{Catalog, TestDefinition};
pub use error::{
    CatalogError, CatalogResult, DeviceError, ErrorKind, FieldError, InputError, RegistryError,
    RenderError, SchemaValidationError, UnitError, UnitExecutionError,
};
pub use input::{NoInput, RawInput, TestInput, ValidatedInput};
pub use inventory::{ConnectionState, Device, Inventory};
pub use loader::CatalogLoader;
pub use plugin::{
    Command, CommandOutput, CommandSpec, CommandTemplate, CollectedCommand, OutputFormat, Test,
    TestVariant, UnitArguments, Verdict,
};
pub use registry::TestRegistry;
pub use results::{ResultManager, ResultSummary, StatusCounts};
pub use runner::{RunOptions, Runner, RunnerConfig, UnitErrorPolicy};

// Re-exported so plugin crates share the engine's result vocabulary
pub use netverify_common::{ResultOverwrite, TestResult, TestStatus};
