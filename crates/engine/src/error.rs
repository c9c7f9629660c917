//! Error types for catalog construction and test execution

use std::path::PathBuf;
use thiserror::Error;

/// One violated constraint inside a test input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path to the offending field, empty for the input as a whole
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Input data rejected by a test's schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{test} test inputs are not valid:{}", field_lines(.errors))]
pub struct SchemaValidationError {
    pub test: String,
    pub errors: Vec<FieldError>,
}

/// Failure to bind raw input data to a test's input schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    #[error("could not instantiate inputs for {test}: unsupported input representation {found}")]
    UnsupportedInput { test: String, found: &'static str },

    #[error("test input has type {found} but {test} expects type {expected}")]
    TypeMismatch {
        test: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Coarse classification of catalog errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SchemaValidation,
    CatalogSyntax,
    DocumentRead,
}

/// Errors raised while building a catalog. Any of them aborts the whole load.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("unable to read test catalog '{}': {source}", .path.display())]
    DocumentRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse test catalog '{}': {source}", .path.display())]
    DocumentDecode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("wrong input type for catalog data{}, must be a mapping, got {found}", from_suffix(.filename))]
    InvalidDocument {
        found: &'static str,
        filename: Option<PathBuf>,
    },

    #[error("namespace {name}{} cannot be resolved{}", parent_suffix(.parent), location_suffix(.parent_location))]
    UnknownNamespace {
        name: String,
        parent: Option<String>,
        parent_location: Option<String>,
    },

    #[error("syntax error when parsing: {fragment}\n{reason}. Check the test catalog.")]
    Syntax { fragment: String, reason: String },

    #[error("{test} is not defined in namespace {namespace}{}", location_suffix(.location))]
    UnknownTest {
        test: String,
        namespace: String,
        location: Option<String>,
    },

    #[error("invalid definition of {test} in namespace {namespace}: {source}")]
    InvalidDefinition {
        namespace: String,
        test: String,
        #[source]
        source: InputError,
    },

    #[error("invalid catalog entry #{index} ({test}): {source}")]
    InvalidListEntry {
        index: usize,
        test: String,
        #[source]
        source: InputError,
    },
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::DocumentRead { .. } | CatalogError::DocumentDecode { .. } => {
                ErrorKind::DocumentRead
            }
            CatalogError::InvalidDefinition { .. } | CatalogError::InvalidListEntry { .. } => {
                ErrorKind::SchemaValidation
            }
            CatalogError::InvalidDocument { .. }
            | CatalogError::UnknownNamespace { .. }
            | CatalogError::Syntax { .. }
            | CatalogError::UnknownTest { .. } => ErrorKind::CatalogSyntax,
        }
    }

    /// Field-level errors, when the failure came from an input schema
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            CatalogError::InvalidDefinition {
                source: InputError::Validation(e),
                ..
            }
            | CatalogError::InvalidListEntry {
                source: InputError::Validation(e),
                ..
            } => &e.errors,
            _ => &[],
        }
    }
}

fn field_lines(errors: &[FieldError]) -> String {
    errors.iter().map(|e| format!("\n\t{}", e)).collect()
}

fn from_suffix(filename: &Option<PathBuf>) -> String {
    filename
        .as_ref()
        .map(|f| format!(" (from {})", f.display()))
        .unwrap_or_default()
}

fn parent_suffix(parent: &Option<String>) -> String {
    parent
        .as_ref()
        .map(|p| format!(" from namespace {}", p))
        .unwrap_or_default()
}

fn location_suffix(location: &Option<String>) -> String {
    location
        .as_ref()
        .map(|l| format!(" (from {})", l))
        .unwrap_or_default()
}

/// Registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("invalid namespace path: '{0}'")]
    InvalidNamespace(String),

    #[error("test {test} is already registered in namespace {namespace}")]
    DuplicateTest { namespace: String, test: String },
}

/// Errors rendering a command template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("missing parameter '{param}' to render template '{template}'")]
    MissingParam { template: String, param: String },

    #[error("unterminated placeholder in template '{0}'")]
    Unterminated(String),
}

/// Errors reported by a device while collecting command outputs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device {0} is not connected")]
    NotConnected(String),

    #[error("command '{command}' is not available on {device}")]
    CommandUnavailable { device: String, command: String },

    #[error("command '{command}' returned {found} output, expected {expected}")]
    WrongFormat {
        command: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

/// Unexpected failure of one device x test unit
#[derive(Error, Debug)]
pub enum UnitError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("inputs could not be converted to arguments: {0}")]
    Arguments(#[from] serde_json::Error),

    #[error("{0}")]
    Evaluate(String),

    #[error("inputs of type {found} were handed to a test expecting {expected}")]
    InputMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unit panicked: {0}")]
    Panicked(String),

    #[error("unit was cancelled")]
    Cancelled,
}

impl UnitError {
    /// Short type label used in logs and reported results
    pub fn kind(&self) -> &'static str {
        match self {
            UnitError::Render(_) => "RenderError",
            UnitError::Arguments(_) => "ArgumentError",
            UnitError::Evaluate(_) => "EvaluateError",
            UnitError::InputMismatch { .. } => "InputMismatch",
            UnitError::Panicked(_) => "Panic",
            UnitError::Cancelled => "Cancelled",
        }
    }
}

/// A [`UnitError`] tagged with the unit it came from
#[derive(Error, Debug)]
#[error("{test} on {device}: {source}")]
pub struct UnitExecutionError {
    pub device: String,
    pub test: String,
    #[source]
    pub source: UnitError,
}

pub type CatalogResult<T> = Result<T, CatalogError>;
