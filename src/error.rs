//! Error types for the crosswalk engine.

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::{Diagnostic, Location};

/// Terminal failure of a crosswalk run.
///
/// Content problems are aggregated in the run's collector and only surface here,
/// as [`CrosswalkFailure::ContentErrors`], after the whole document was consumed.
/// Every other variant aborts the run at the point where it occurred.
#[derive(Error, Debug)]
pub enum CrosswalkFailure {
    /// The validator could not be set up or run
    #[error("could not validate against XSD: {0}")]
    ValidationSetup(#[from] ValidationSetupError),

    /// The document is not well-formed
    #[error("could not parse: {0}")]
    MalformedInput(#[from] MalformedInput),

    /// A registered handler failed while mutating the target
    #[error("handler for {path} failed: {source}")]
    Handler {
        /// Structural path of the event being handled
        path: String,
        /// The handler's error
        source: HandlerError,
    },

    /// Reading the source failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The document was consumed but error or fatal diagnostics were recorded
    #[error("{} content error(s), first: {}", .0.len(), first_message(.0))]
    ContentErrors(Vec<Diagnostic>),
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(|d| d.to_string())
        .unwrap_or_default()
}

/// Infrastructure failure of a [`Validator`](crate::validation::Validator).
///
/// Schema violations are never reported through this type; they are recorded
/// as diagnostics.
#[derive(Error, Debug)]
pub enum ValidationSetupError {
    /// The schema file does not exist
    #[error("Schema file not found: {}", .0.display())]
    SchemaNotFound(PathBuf),

    /// The schema could not be compiled
    #[error("Failed to parse schema: {0}")]
    Schema(String),

    /// The schema could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The document is not well-formed XML.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at {location}")]
pub struct MalformedInput {
    /// Description of the syntax problem
    pub message: String,
    /// Where the problem was detected
    pub location: Location,
}

impl MalformedInput {
    /// Creates a new malformed-input error.
    pub fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Error returned by a handler that could not apply an event to its target.
#[derive(Debug)]
pub struct HandlerError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl HandlerError {
    /// Creates a handler error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a handler error caused by another error.
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for HandlerError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<std::num::ParseIntError> for HandlerError {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::with_source("Integer parsing error", e)
    }
}

impl From<std::num::ParseFloatError> for HandlerError {
    fn from(e: std::num::ParseFloatError) -> Self {
        Self::with_source("Float parsing error", e)
    }
}

impl From<std::str::ParseBoolError> for HandlerError {
    fn from(e: std::str::ParseBoolError) -> Self {
        Self::with_source("Boolean parsing error", e)
    }
}

/// Invalid path pattern passed to a [`RegistryBuilder`](crate::registry::RegistryBuilder).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern could not be parsed
    #[error("Invalid path pattern {pattern:?}: {reason}")]
    Syntax {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// The pattern uses a prefix that was never bound
    #[error("Unbound namespace prefix {prefix:?} in path pattern {pattern:?}")]
    UnboundPrefix {
        /// The offending pattern
        pattern: String,
        /// The unbound prefix
        prefix: String,
    },

    /// The same pattern was registered twice
    #[error("Duplicate path pattern: {0}")]
    Duplicate(String),
}

/// Result type alias for crosswalk operations.
pub type Result<T> = std::result::Result<T, CrosswalkFailure>;
