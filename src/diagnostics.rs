//! Diagnostic collection for crosswalk runs.
//!
//! Every problem found while validating or parsing a document is recorded in an
//! [`ErrorCollector`] instead of being raised. The collector decides the final
//! verdict of a crosswalk: a run only succeeds when [`ErrorCollector::is_clean`]
//! holds, which means no error- or fatal-severity diagnostic was recorded.
//! Warnings are kept for inspection but never affect the verdict.
//!
//! # Example
//!
//! ```rust
//! use xml_crosswalk::diagnostics::{Diagnostic, ErrorCollector, Location};
//!
//! let mut collector = ErrorCollector::new();
//! collector.report_warning(Diagnostic::warning("deprecated element <subject>"));
//! assert!(collector.is_clean());
//!
//! collector.report_error(Diagnostic::error("missing <title>").at(Location::new(3, 5)));
//! assert!(!collector.is_clean());
//! assert_eq!(collector.errors().len(), 1);
//! ```

use log::{Level, Log, Metadata, Record};
use std::fmt;
use std::sync::Arc;

/// Log target used for everything the crosswalk engine emits.
pub const LOG_TARGET: &str = "xml_crosswalk";

// ============================================================================
// Locations and severities
// ============================================================================

/// A position in the source document.
///
/// Lines and columns are 1-based. Columns count bytes, not characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// Line number, starting at 1
    pub line: usize,
    /// Byte column within the line, starting at 1
    pub column: usize,
}

impl Location {
    /// Creates a location from a line and column.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Severity of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// Recorded, never blocks success
    Warning,
    /// Blocks success once the document is consumed
    Error,
    /// Unrecoverable problem, blocks success
    Fatal,
}

impl Severity {
    /// Returns the lowercase name of this severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pass of a crosswalk in which a diagnostic was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Schema validation pass
    Validation,
    /// Event parsing and handler dispatch pass
    Parsing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Validation => f.write_str("validation"),
            Phase::Parsing => f.write_str("parsing"),
        }
    }
}

// ============================================================================
// Diagnostic
// ============================================================================

/// A recorded problem with its severity and, when known, its location.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    /// How serious the problem is
    pub severity: Severity,
    /// Which pass recorded it
    pub phase: Phase,
    /// Human readable description
    pub message: String,
    /// Position in the source document, if known
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Creates a diagnostic with the given severity, recorded during parsing.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            phase: Phase::Parsing,
            message: message.into(),
            location: None,
        }
    }

    /// Creates a warning.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Creates an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Creates a fatal error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, message)
    }

    /// Sets the source location.
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the phase that recorded this diagnostic.
    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{} ({}) at {}: {}", self.severity, self.phase, loc, self.message),
            None => write!(f, "{} ({}): {}", self.severity, self.phase, self.message),
        }
    }
}

// ============================================================================
// Reporting
// ============================================================================

/// How recorded diagnostics are echoed to the side channel.
///
/// The mode never changes control flow or the success verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReportingMode {
    /// Record silently
    #[default]
    Off,
    /// Record and log through the reporter's logger
    Log,
    /// Record, log, and print to stderr
    LogAndPrint,
}

/// Forwards to whatever logger is installed behind the `log` facade.
struct FacadeLogger;

impl Log for FacadeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        log::logger().log(record);
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

/// Logging capability handed to a collector and an engine at construction.
///
/// A reporter pairs a [`ReportingMode`] with the [`Log`] implementation that
/// receives its records. By default records are forwarded to the global `log`
/// facade, but any logger can be injected with [`Reporter::with_logger`].
#[derive(Clone)]
pub struct Reporter {
    mode: ReportingMode,
    logger: Arc<dyn Log>,
}

impl Reporter {
    /// Creates a reporter that forwards to the global `log` facade.
    pub fn new(mode: ReportingMode) -> Self {
        Self {
            mode,
            logger: Arc::new(FacadeLogger),
        }
    }

    /// Creates a reporter with an explicit logger.
    pub fn with_logger(mode: ReportingMode, logger: Arc<dyn Log>) -> Self {
        Self { mode, logger }
    }

    /// A reporter that never emits anything.
    pub fn off() -> Self {
        Self::new(ReportingMode::Off)
    }

    /// Returns the reporting mode.
    pub fn mode(&self) -> ReportingMode {
        self.mode
    }

    /// Echoes a diagnostic according to the reporting mode.
    pub(crate) fn diagnostic(&self, diagnostic: &Diagnostic) {
        let level = match diagnostic.severity {
            Severity::Warning => Level::Warn,
            Severity::Error | Severity::Fatal => Level::Error,
        };
        self.emit(level, format_args!("{}", diagnostic));
        if self.mode == ReportingMode::LogAndPrint {
            eprintln!("{}", diagnostic);
        }
    }

    /// Emits a debug-level message unless reporting is off.
    pub(crate) fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        if self.mode == ReportingMode::Off {
            return;
        }
        let metadata = Metadata::builder().level(level).target(LOG_TARGET).build();
        if !self.logger.enabled(&metadata) {
            return;
        }
        self.logger.log(
            &Record::builder()
                .metadata(metadata)
                .args(args)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::off()
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter").field("mode", &self.mode).finish_non_exhaustive()
    }
}

// ============================================================================
// Collector
// ============================================================================

/// Accumulates diagnostics across the validation and parsing passes.
///
/// Each severity is kept in its own sequence, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ErrorCollector {
    warnings: Vec<Diagnostic>,
    errors: Vec<Diagnostic>,
    fatals: Vec<Diagnostic>,
    reporter: Reporter,
}

impl ErrorCollector {
    /// Creates a silent collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collector that echoes diagnostics through `reporter`.
    pub fn with_reporter(reporter: Reporter) -> Self {
        Self {
            reporter,
            ..Self::default()
        }
    }

    /// Returns the reporting mode fixed at construction.
    pub fn reporting_mode(&self) -> ReportingMode {
        self.reporter.mode()
    }

    /// Records a diagnostic under its own severity.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.reporter.diagnostic(&diagnostic);
        match diagnostic.severity {
            Severity::Warning => self.warnings.push(diagnostic),
            Severity::Error => self.errors.push(diagnostic),
            Severity::Fatal => self.fatals.push(diagnostic),
        }
    }

    /// Records a diagnostic as a warning.
    pub fn report_warning(&mut self, diagnostic: Diagnostic) {
        self.report(Diagnostic {
            severity: Severity::Warning,
            ..diagnostic
        });
    }

    /// Records a diagnostic as an error.
    pub fn report_error(&mut self, diagnostic: Diagnostic) {
        self.report(Diagnostic {
            severity: Severity::Error,
            ..diagnostic
        });
    }

    /// Records a diagnostic as a fatal error.
    pub fn report_fatal(&mut self, diagnostic: Diagnostic) {
        self.report(Diagnostic {
            severity: Severity::Fatal,
            ..diagnostic
        });
    }

    /// Recorded warnings, in order.
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// Recorded errors, in order.
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Recorded fatal errors, in order.
    pub fn fatal_errors(&self) -> &[Diagnostic] {
        &self.fatals
    }

    /// Returns `true` when no error or fatal diagnostic was recorded.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.fatals.is_empty()
    }

    /// Returns `true` when at least one warning was recorded.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Total number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.warnings.len() + self.errors.len() + self.fatals.len()
    }

    /// Returns `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates warnings, then errors, then fatal errors.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.warnings
            .iter()
            .chain(self.errors.iter())
            .chain(self.fatals.iter())
    }

    /// Clones the diagnostics that make the collector unclean.
    pub fn content_errors(&self) -> Vec<Diagnostic> {
        self.errors.iter().chain(self.fatals.iter()).cloned().collect()
    }
}
