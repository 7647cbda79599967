//! Handler registration and lookup.
//!
//! A [`HandlerRegistry`] maps [`PathPattern`]s to [`Handler`]s that mutate a
//! crosswalk target. It is built once with a [`RegistryBuilder`] and is
//! read-only afterwards, so one registry can serve many concurrent crosswalks
//! as long as its handlers keep no state of their own.
//!
//! Lookup precedence for a path:
//!
//! 1. absolute patterns (`/record/title`),
//! 2. relative patterns (`record/title`, `title`),
//! 3. the catch-all (`*`).
//!
//! Within a tier the earliest registration wins. Paths that match nothing are
//! ignored.
//!
//! # Example
//!
//! ```rust
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
//!
//! assert_eq!(registry.len(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::error::{HandlerError, PatternError};
use crate::path::{ElementPath, PathPattern, PatternKind, StepKind};
use crate::reader::ParseEvent;

/// Applies a parse event to a crosswalk target.
///
/// Handlers are shared between threads and must not keep mutable state of
/// their own; everything a handler changes belongs in the target.
pub trait Handler<T>: Send + Sync {
    /// Applies `event`, seen at `path`, to `target`.
    fn apply(&self, event: &ParseEvent, path: &ElementPath, target: &mut T)
        -> Result<(), HandlerError>;
}

impl<T, F> Handler<T> for F
where
    F: Fn(&ParseEvent, &ElementPath, &mut T) -> Result<(), HandlerError> + Send + Sync,
{
    fn apply(
        &self,
        event: &ParseEvent,
        path: &ElementPath,
        target: &mut T,
    ) -> Result<(), HandlerError> {
        self(event, path, target)
    }
}

struct Registration<T> {
    pattern: PathPattern,
    handler: Box<dyn Handler<T>>,
}

/// Index key: the kind and local name of a pattern's innermost step.
type IndexKey = (StepKind, String);

/// Immutable map from path patterns to handlers.
pub struct HandlerRegistry<T> {
    registrations: Vec<Registration<T>>,
    by_last_step: HashMap<IndexKey, Vec<usize>>,
    catch_all: Option<usize>,
}

impl<T> HandlerRegistry<T> {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder<T> {
        RegistryBuilder::new()
    }

    /// Finds the handler for `path`, if any.
    pub fn lookup(&self, path: &ElementPath) -> Option<&dyn Handler<T>> {
        self.lookup_index(path)
            .map(|i| self.registrations[i].handler.as_ref())
    }

    /// Finds the pattern that would handle `path`, if any.
    pub fn matching_pattern(&self, path: &ElementPath) -> Option<&PathPattern> {
        self.lookup_index(path)
            .map(|i| &self.registrations[i].pattern)
    }

    fn lookup_index(&self, path: &ElementPath) -> Option<usize> {
        let Some(last) = path.last() else {
            return self.catch_all;
        };

        let key = (last.kind, last.name.local.clone());
        let mut relative = None;
        for &i in self.by_last_step.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
            let pattern = &self.registrations[i].pattern;
            if !pattern.matches(path) {
                continue;
            }
            match pattern.kind() {
                PatternKind::Absolute => return Some(i),
                _ => {
                    if relative.is_none() {
                        relative = Some(i);
                    }
                }
            }
        }
        relative.or(self.catch_all)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Iterates the registered patterns in registration order.
    pub fn patterns(&self) -> impl Iterator<Item = &PathPattern> {
        self.registrations.iter().map(|r| &r.pattern)
    }
}

impl<T> fmt::Debug for HandlerRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field(
                "patterns",
                &self.patterns().map(|p| p.to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for a [`HandlerRegistry`].
///
/// Patterns are parsed when [`build`](RegistryBuilder::build) is called, so
/// namespace bindings may be declared before or after the patterns using them.
pub struct RegistryBuilder<T> {
    namespaces: HashMap<String, String>,
    pending: Vec<(String, Box<dyn Handler<T>>)>,
}

impl<T> RegistryBuilder<T> {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self {
            namespaces: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Binds a namespace prefix for use in patterns.
    ///
    /// Binding the empty prefix sets the default namespace of unprefixed
    /// element steps.
    pub fn namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Registers a closure for `pattern`.
    pub fn on<F>(self, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ParseEvent, &ElementPath, &mut T) -> Result<(), HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.on_handler(pattern, handler)
    }

    /// Registers any [`Handler`] implementation for `pattern`.
    pub fn on_handler<H>(mut self, pattern: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T> + 'static,
    {
        self.pending.push((pattern.into(), Box::new(handler)));
        self
    }

    /// Parses every pattern and builds the registry.
    ///
    /// Fails on the first invalid pattern, unbound prefix, or duplicate.
    pub fn build(self) -> Result<HandlerRegistry<T>, PatternError> {
        let mut registrations: Vec<Registration<T>> = Vec::with_capacity(self.pending.len());
        let mut by_last_step: HashMap<IndexKey, Vec<usize>> = HashMap::new();
        let mut catch_all = None;

        for (source, handler) in self.pending {
            let pattern = PathPattern::parse_with(&source, &self.namespaces)?;
            if registrations.iter().any(|r| r.pattern == pattern) {
                return Err(PatternError::Duplicate(pattern.to_string()));
            }

            let index = registrations.len();
            match pattern.last() {
                Some(last) => by_last_step
                    .entry((last.kind, last.local.clone()))
                    .or_default()
                    .push(index),
                None => catch_all = Some(index),
            }
            registrations.push(Registration { pattern, handler });
        }

        Ok(HandlerRegistry {
            registrations,
            by_last_step,
            catch_all,
        })
    }
}

impl<T> Default for RegistryBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
