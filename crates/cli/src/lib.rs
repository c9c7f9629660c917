//! NetVerify CLI
//!
//! Command-line front-end: validate and list test catalogs, list the
//! registered tests, and run a catalog against a replay inventory.

pub mod commands;
pub mod config;
pub mod output;
pub mod replay;
