//! Schema validation before parsing.
//!
//! A [`Validator`] checks raw document bytes and records every problem it finds
//! in an [`ErrorCollector`]. It only returns an error when it cannot do its job
//! at all, for example because the schema is missing or broken. Whether the
//! document itself is valid is read from the collector afterwards.
//!
//! [`XsdValidator`] validates against an XML Schema Definition using libxml2.
//!
//! # Requirements
//!
//! `XsdValidator` requires the `validation` feature to be enabled and depends on
//! libxml2 being installed on the system.
//!
//! ## Installing libxml2
//!
//! **Ubuntu/Debian:**
//! ```bash
//! sudo apt-get install libxml2-dev
//! ```
//!
//! **macOS:**
//! ```bash
//! brew install libxml2
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use xml_crosswalk::diagnostics::ErrorCollector;
//! use xml_crosswalk::validation::{Validator, XsdValidator};
//!
//! let validator = XsdValidator::from_file("schemas/record.xsd")?;
//!
//! let mut collector = ErrorCollector::new();
//! validator.validate(b"<record><title>Hello</title></record>", &mut collector)?;
//! assert!(collector.is_clean());
//! ```

use crate::diagnostics::ErrorCollector;
use crate::error::ValidationSetupError;

#[cfg(feature = "validation")]
pub use xsd::XsdValidator;

/// Checks a document before it is parsed.
pub trait Validator {
    /// Validates `xml`, recording findings in `collector`.
    ///
    /// Returns an error only for infrastructure failures. Content problems are
    /// recorded as diagnostics with phase [`Validation`](crate::diagnostics::Phase::Validation).
    fn validate(&self, xml: &[u8], collector: &mut ErrorCollector)
        -> Result<(), ValidationSetupError>;
}

impl<V: Validator + ?Sized> Validator for &V {
    fn validate(
        &self,
        xml: &[u8],
        collector: &mut ErrorCollector,
    ) -> Result<(), ValidationSetupError> {
        (**self).validate(xml, collector)
    }
}

#[cfg(feature = "validation")]
mod xsd {
    use std::path::{Path, PathBuf};

    use libxml::error::{StructuredError, XmlErrorLevel};
    use libxml::parser::Parser;
    use libxml::schemas::{SchemaParserContext, SchemaValidationContext};

    use super::Validator;
    use crate::diagnostics::{Diagnostic, ErrorCollector, Location, Phase, Severity};
    use crate::error::ValidationSetupError;

    /// Where the schema is loaded from.
    #[derive(Debug, Clone)]
    enum SchemaSource {
        File(PathBuf),
        Buffer(Vec<u8>),
    }

    /// Validates documents against an XML Schema using libxml2.
    ///
    /// The schema is compiled once when the validator is created so that a
    /// broken schema is reported immediately. libxml2 validation contexts are
    /// not thread-safe, so each call compiles its own context from the stored
    /// schema source; the validator itself only holds immutable data and may be
    /// shared between threads.
    #[derive(Debug, Clone)]
    pub struct XsdValidator {
        source: SchemaSource,
    }

    impl XsdValidator {
        /// Loads a schema file.
        ///
        /// Relative `xs:include` and `xs:import` locations are resolved against
        /// the file's directory.
        pub fn from_file<P: AsRef<Path>>(schema_path: P) -> Result<Self, ValidationSetupError> {
            let schema_path = schema_path.as_ref();
            if !schema_path.exists() {
                return Err(ValidationSetupError::SchemaNotFound(schema_path.to_path_buf()));
            }
            let validator = Self {
                source: SchemaSource::File(schema_path.to_path_buf()),
            };
            validator.context()?;
            Ok(validator)
        }

        /// Loads a schema held in memory.
        pub fn from_bytes(schema: impl Into<Vec<u8>>) -> Result<Self, ValidationSetupError> {
            let validator = Self {
                source: SchemaSource::Buffer(schema.into()),
            };
            validator.context()?;
            Ok(validator)
        }

        /// Compiles a fresh validation context.
        fn context(&self) -> Result<SchemaValidationContext, ValidationSetupError> {
            let mut schema_parser = match &self.source {
                SchemaSource::File(path) => {
                    SchemaParserContext::from_file(path.to_string_lossy().as_ref())
                }
                SchemaSource::Buffer(bytes) => SchemaParserContext::from_buffer(bytes),
            };

            SchemaValidationContext::from_parser(&mut schema_parser).map_err(|errors| {
                let msg = errors
                    .iter()
                    .map(|e| e.message.clone().unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("; ");
                ValidationSetupError::Schema(msg)
            })
        }
    }

    impl Validator for XsdValidator {
        fn validate(
            &self,
            xml: &[u8],
            collector: &mut ErrorCollector,
        ) -> Result<(), ValidationSetupError> {
            let mut validation_context = self.context()?;

            // libxml decodes the document according to its own declaration
            let parser = Parser::default();
            let doc = match parser.parse_string(xml) {
                Ok(doc) => doc,
                Err(e) => {
                    collector.report_fatal(
                        Diagnostic::fatal(format!("Failed to parse XML document: {:?}", e))
                            .in_phase(Phase::Validation),
                    );
                    return Ok(());
                }
            };

            if let Err(errors) = validation_context.validate_document(&doc) {
                for error in &errors {
                    collector.report(to_diagnostic(error));
                }
            }
            Ok(())
        }
    }

    fn to_diagnostic(error: &StructuredError) -> Diagnostic {
        let severity = match error.level {
            XmlErrorLevel::Warning => Severity::Warning,
            XmlErrorLevel::Fatal => Severity::Fatal,
            XmlErrorLevel::Error | XmlErrorLevel::None => Severity::Error,
        };
        let message = error
            .message
            .as_deref()
            .map(str::trim)
            .unwrap_or("schema violation");
        let mut diagnostic = Diagnostic::new(severity, message).in_phase(Phase::Validation);
        if let Some(line) = error.line.filter(|&l| l > 0) {
            let column = error.col.filter(|&c| c > 0).unwrap_or(1);
            diagnostic = diagnostic.at(Location::new(line as usize, column as usize));
        }
        diagnostic
    }

}
