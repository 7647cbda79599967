//! The crosswalk engine.
//!
//! A [`Crosswalker`] turns an XML document into a caller-owned target object in
//! two sequential passes:
//!
//! 1. **Validation** (optional): a [`Validator`] checks the raw bytes and records
//!    its findings in the run's [`ErrorCollector`].
//! 2. **Parsing**: an [`EventReader`] pushes events to the engine, which keeps
//!    the current [`ElementPath`], looks it up in the [`HandlerRegistry`] and
//!    applies the matching handler to the target.
//!
//! Validation problems never stop the parse. They are checked, together with
//! anything recorded while parsing, once the document has been fully consumed:
//! the run succeeds only if the collector is clean.
//!
//! ```text
//! Idle ──▶ Validating ──▶ Parsing ──▶ Succeeded
//!   │          │             │
//!   └──────────┴─────────────┴──────▶ Failed
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use xml_crosswalk::engine::Crosswalker;
//! use xml_crosswalk::reader::ParseEvent;
//! use xml_crosswalk::registry::HandlerRegistry;
//!
//! #[derive(Default)]
//! struct Record {
//!     title: String,
//! }
//!
//! let registry = HandlerRegistry::<Record>::builder()
//!     .on("/record/title", |event, _path, record| {
//!         if let ParseEvent::Characters { text, .. } = event {
//!             record.title.push_str(text);
//!         }
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//! let crosswalker = Crosswalker::new(Arc::new(registry));
//!
//! let mut record = Record::default();
//! let report = crosswalker.crosswalk_str("<record><title>Hello</title></record>", &mut record, None);
//!
//! assert!(report.is_success());
//! assert!(report.collector().is_clean());
//! drop(report);
//! assert_eq!(record.title, "Hello");
//! ```

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use log::Log;

use crate::diagnostics::{Diagnostic, ErrorCollector, Phase, Reporter, ReportingMode};
use crate::error::{CrosswalkFailure, HandlerError};
use crate::path::ElementPath;
use crate::reader::{EventReader, ParseEvent, ReadError, ReaderConfig};
use crate::registry::HandlerRegistry;
use crate::source::Source;
use crate::validation::Validator;

/// States of a single crosswalk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    /// Nothing has happened yet
    Idle,
    /// The validator is running
    Validating,
    /// Events are being dispatched to handlers
    Parsing,
    /// The target was populated and the collector is clean
    Succeeded,
    /// The run ended with a [`CrosswalkFailure`]
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::Validating => "validating",
            EngineState::Parsing => "parsing",
            EngineState::Succeeded => "succeeded",
            EngineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Configuration options for a [`Crosswalker`].
#[derive(Debug, Clone, Default)]
pub struct CrosswalkConfig {
    /// How diagnostics and state changes are echoed
    pub reporter: Reporter,
    /// Event reader options
    pub reader: ReaderConfig,
}

impl CrosswalkConfig {
    /// Creates a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reporting mode, keeping the current logger.
    pub fn with_reporting(mut self, mode: ReportingMode) -> Self {
        self.reporter = Reporter::new(mode);
        self
    }

    /// Sets the reporting mode and the logger that receives the records.
    pub fn with_logger(mut self, mode: ReportingMode, logger: Arc<dyn Log>) -> Self {
        self.reporter = Reporter::with_logger(mode, logger);
        self
    }

    /// Sets the event reader options.
    pub fn with_reader(mut self, reader: ReaderConfig) -> Self {
        self.reader = reader;
        self
    }
}

/// Outcome of a crosswalk run together with its diagnostics.
///
/// `R` is `&T` for [`Crosswalker::crosswalk`] and `T` for
/// [`Crosswalker::crosswalk_new`].
#[derive(Debug)]
pub struct CrosswalkReport<R> {
    outcome: Result<R, CrosswalkFailure>,
    state: EngineState,
    collector: ErrorCollector,
}

impl<R> CrosswalkReport<R> {
    /// The populated target, or why there is none.
    pub fn outcome(&self) -> &Result<R, CrosswalkFailure> {
        &self.outcome
    }

    /// The final state, either `Succeeded` or `Failed`.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Diagnostics recorded during the run, whatever its outcome.
    pub fn collector(&self) -> &ErrorCollector {
        &self.collector
    }

    /// Returns `true` if the run succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure, if the run failed.
    pub fn failure(&self) -> Option<&CrosswalkFailure> {
        self.outcome.as_ref().err()
    }

    /// Drops the diagnostics and returns the outcome.
    pub fn into_result(self) -> Result<R, CrosswalkFailure> {
        self.outcome
    }

    /// Splits the report into its outcome and diagnostics.
    pub fn into_parts(self) -> (Result<R, CrosswalkFailure>, ErrorCollector) {
        (self.outcome, self.collector)
    }
}

/// Walks XML documents into targets of type `T`.
///
/// The engine holds only an immutable registry and configuration. It can be
/// called repeatedly and, when its handlers are stateless, from several threads
/// at once.
pub struct Crosswalker<T> {
    registry: Arc<HandlerRegistry<T>>,
    config: CrosswalkConfig,
}

impl<T> Crosswalker<T> {
    /// Creates an engine with default configuration.
    pub fn new(registry: Arc<HandlerRegistry<T>>) -> Self {
        Self::with_config(registry, CrosswalkConfig::default())
    }

    /// Creates an engine with the specified configuration.
    pub fn with_config(registry: Arc<HandlerRegistry<T>>, config: CrosswalkConfig) -> Self {
        Self { registry, config }
    }

    /// The registry this engine dispatches to.
    pub fn registry(&self) -> &Arc<HandlerRegistry<T>> {
        &self.registry
    }

    /// The engine configuration.
    pub fn config(&self) -> &CrosswalkConfig {
        &self.config
    }

    /// Runs a crosswalk from `source` into `target`.
    ///
    /// With a validator, the document is validated first. It is then parsed
    /// regardless of the validation outcome. On success the target is handed
    /// back; on failure the diagnostics recorded so far remain available from
    /// the report.
    pub fn crosswalk<'t>(
        &self,
        source: Source<'_>,
        target: &'t mut T,
        validator: Option<&dyn Validator>,
    ) -> CrosswalkReport<&'t T> {
        let mut run = Run::new(self.config.reporter.clone());
        let outcome = match run.walk(self, source, &mut *target, validator) {
            Ok(()) => Ok(&*target),
            Err(failure) => Err(failure),
        };
        run.finish(outcome)
    }

    /// Runs a crosswalk from XML text.
    pub fn crosswalk_str<'t>(
        &self,
        xml: &str,
        target: &'t mut T,
        validator: Option<&dyn Validator>,
    ) -> CrosswalkReport<&'t T> {
        self.crosswalk(Source::xml(xml), target, validator)
    }

    /// Runs a crosswalk from a file.
    pub fn crosswalk_file<'t, P: AsRef<Path>>(
        &self,
        path: P,
        target: &'t mut T,
        validator: Option<&dyn Validator>,
    ) -> CrosswalkReport<&'t T> {
        self.crosswalk(Source::file(path), target, validator)
    }

    /// Runs a crosswalk from an open stream.
    ///
    /// The stream is read to the end and dropped before this returns.
    pub fn crosswalk_reader<'t, R: Read>(
        &self,
        reader: R,
        target: &'t mut T,
        validator: Option<&dyn Validator>,
    ) -> CrosswalkReport<&'t T> {
        self.crosswalk(Source::reader(reader), target, validator)
    }

    /// Runs a crosswalk into a target created by `factory`.
    ///
    /// The target is only handed out if the run succeeds.
    pub fn crosswalk_new<F>(
        &self,
        source: Source<'_>,
        factory: F,
        validator: Option<&dyn Validator>,
    ) -> CrosswalkReport<T>
    where
        F: FnOnce() -> T,
    {
        let mut target = factory();
        let mut run = Run::new(self.config.reporter.clone());
        let result = run.walk(self, source, &mut target, validator);
        run.finish(result.map(|()| target))
    }

    /// Dispatches one event to the handler registered for the current path.
    fn dispatch(
        &self,
        event: &ParseEvent,
        path: &mut ElementPath,
        target: &mut T,
    ) -> Result<(), Dispatch> {
        match event {
            ParseEvent::StartElement { name, .. } => {
                path.push_element(name.clone());
                self.apply(event, path, target)
            }
            ParseEvent::Attribute { name, .. } => {
                path.push_attribute(name.clone());
                let result = self.apply(event, path, target);
                path.pop();
                result
            }
            ParseEvent::Characters { .. } => self.apply(event, path, target),
            ParseEvent::EndElement { .. } => {
                let result = self.apply(event, path, target);
                path.pop();
                result
            }
        }
    }

    fn apply(&self, event: &ParseEvent, path: &ElementPath, target: &mut T) -> Result<(), Dispatch> {
        match self.registry.lookup(path) {
            Some(handler) => handler.apply(event, path, target).map_err(|source| Dispatch {
                path: path.to_string(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl<T> fmt::Debug for Crosswalker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crosswalker")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

impl<T> Clone for Crosswalker<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
        }
    }
}

/// A handler failure, with the path it happened at.
struct Dispatch {
    path: String,
    source: HandlerError,
}

/// Per-call state: created fresh for each crosswalk and dropped at its end.
struct Run {
    state: EngineState,
    collector: ErrorCollector,
    reporter: Reporter,
}

impl Run {
    fn new(reporter: Reporter) -> Self {
        Self {
            state: EngineState::Idle,
            collector: ErrorCollector::with_reporter(reporter.clone()),
            reporter,
        }
    }

    fn advance(&mut self, next: EngineState) {
        self.reporter
            .debug(format_args!("crosswalk {} -> {}", self.state, next));
        self.state = next;
    }

    fn walk<T>(
        &mut self,
        engine: &Crosswalker<T>,
        source: Source<'_>,
        target: &mut T,
        validator: Option<&dyn Validator>,
    ) -> Result<(), CrosswalkFailure> {
        // Both passes read from this one buffer, each through its own reader
        let bytes = source.into_bytes()?;

        if let Some(validator) = validator {
            self.advance(EngineState::Validating);
            validator.validate(&bytes, &mut self.collector)?;
        }

        self.advance(EngineState::Parsing);
        let reader = match EventReader::open(&bytes, engine.config.reader.clone()) {
            Ok(reader) => reader,
            Err(malformed) => {
                self.collector.report_fatal(
                    Diagnostic::fatal(malformed.message.clone())
                        .at(malformed.location)
                        .in_phase(Phase::Parsing),
                );
                return Err(CrosswalkFailure::MalformedInput(malformed));
            }
        };

        let mut path = ElementPath::new();
        reader
            .parse(|event| engine.dispatch(&event, &mut path, target))
            .map_err(|e| match e {
                ReadError::Malformed(malformed) => {
                    self.collector.report_fatal(
                        Diagnostic::fatal(malformed.message.clone())
                            .at(malformed.location)
                            .in_phase(Phase::Parsing),
                    );
                    CrosswalkFailure::MalformedInput(malformed)
                }
                ReadError::Consumer(Dispatch { path, source }) => {
                    CrosswalkFailure::Handler { path, source }
                }
            })?;

        if !self.collector.is_clean() {
            return Err(CrosswalkFailure::ContentErrors(self.collector.content_errors()));
        }
        Ok(())
    }

    fn finish<R>(mut self, outcome: Result<R, CrosswalkFailure>) -> CrosswalkReport<R> {
        match &outcome {
            Ok(_) => self.advance(EngineState::Succeeded),
            Err(failure) => {
                self.reporter
                    .debug(format_args!("crosswalk failed: {}", failure));
                self.advance(EngineState::Failed);
            }
        }
        CrosswalkReport {
            outcome,
            state: self.state,
            collector: self.collector,
        }
    }
}
