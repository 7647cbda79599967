//! XML crosswalk engine for Rust.
//!
//! This crate converts externally supplied XML records into typed in-memory
//! objects. Which XML structure maps to which field is expressed as a set of
//! handlers registered against structural paths; the engine streams the
//! document, keeps track of the current path, and hands every matching event to
//! its handler together with the caller's target object.
//!
//! # Features
//!
//! - **Streaming Reader**: namespace-aware push parser built on `quick-xml`.
//! - **Path Dispatch**: absolute, relative and catch-all path patterns with
//!   namespace support.
//! - **Diagnostics**: warnings, errors and fatal errors are collected rather
//!   than raised; a run only succeeds when no error was recorded.
//! - **Schema Validation**: optional XSD validation with the `validation` feature.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use xml_crosswalk::{Crosswalker, HandlerRegistry, ParseEvent};
//!
//! #[derive(Default)]
//! struct Book {
//!     title: String,
//!     isbn: Option<String>,
//! }
//!
//! let registry = HandlerRegistry::<Book>::builder()
//!     .on("/book/title", |event, _path, book| {
//!         if let ParseEvent::EndElement { text, .. } = event {
//!             book.title = text.trim().to_string();
//!         }
//!         Ok(())
//!     })
//!     .on("/book/@isbn", |event, _path, book| {
//!         book.isbn = event.text().map(str::to_string);
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let crosswalker = Crosswalker::new(Arc::new(registry));
//! let mut book = Book::default();
//! let report = crosswalker.crosswalk_str(
//!     r#"<book isbn="0-306-40615-2"><title>Dune</title></book>"#,
//!     &mut book,
//!     None,
//! );
//!
//! assert!(report.is_success());
//! drop(report);
//! assert_eq!(book.title, "Dune");
//! assert_eq!(book.isbn.as_deref(), Some("0-306-40615-2"));
//! ```
//!
//! # Module Structure
//!
//! - [`engine`] - The validate-then-parse crosswalk engine
//! - [`registry`] - Handler registration and lookup
//! - [`path`] - Structural paths and path patterns
//! - [`reader`] - Streaming event reader
//! - [`diagnostics`] - Diagnostic collection and reporting
//! - [`validation`] - Schema validation
//! - [`source`] - Input sources
//! - [`error`] - Error types
//!
//! # Optional Features
//!
//! - `serde` - Enable serde serialization/deserialization of diagnostics
//! - `validation` - XSD validation through libxml2
//! - `cli` - The `xml_paths` command line tool

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod path;
pub mod reader;
pub mod registry;
pub mod source;
pub mod validation;

// Re-export commonly used types at the crate root
pub use diagnostics::{Diagnostic, ErrorCollector, Location, Phase, ReportingMode, Severity};
pub use engine::{CrosswalkConfig, CrosswalkReport, Crosswalker, EngineState};
pub use error::{
    CrosswalkFailure, HandlerError, MalformedInput, PatternError, Result, ValidationSetupError,
};
pub use path::{ElementPath, PathPattern};
pub use reader::{EventReader, ParseEvent, QName, ReaderConfig};
pub use registry::{Handler, HandlerRegistry, RegistryBuilder};
pub use source::Source;
pub use validation::Validator;

#[cfg(feature = "validation")]
pub use validation::XsdValidator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
