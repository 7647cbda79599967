//! Structural paths and the patterns that match them.
//!
//! While a document is parsed the engine keeps an [`ElementPath`]: the chain of
//! currently open elements, plus an attribute step while an attribute is being
//! dispatched. Handlers are registered against [`PathPattern`]s.
//!
//! # Pattern syntax
//!
//! | Pattern         | Matches |
//! |-----------------|---------|
//! | `*`             | every path (catch-all) |
//! | `/record/title` | exactly this path from the root |
//! | `record/title`  | any path ending in these steps |
//! | `title`         | any `title` element, at any depth |
//! | `/record/@id`   | the `id` attribute of the root `record` |
//!
//! A step is written as `local`, `prefix:local` (prefix bound by the caller),
//! `{uri}local` (Clark notation), `{*}local` (any namespace) or `{}local`
//! (explicitly no namespace). An `@` marks an attribute step, which may only be
//! the last one. Unprefixed element steps use the default namespace if one is
//! bound to the empty prefix; unprefixed attribute steps are never namespaced.

use std::collections::HashMap;
use std::fmt;

use crate::error::PatternError;
use crate::reader::QName;

/// Whether a step names an element or an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// An element
    Element,
    /// An attribute of the preceding element
    Attribute,
}

/// One step of an [`ElementPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    /// Element or attribute
    pub kind: StepKind,
    /// Its name
    pub name: QName,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StepKind::Element => write!(f, "{}", self.name),
            StepKind::Attribute => write!(f, "@{}", self.name),
        }
    }
}

/// The structural position of the event being dispatched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ElementPath {
    steps: Vec<Step>,
}

impl ElementPath {
    /// Creates an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an element step.
    pub fn push_element(&mut self, name: QName) {
        self.steps.push(Step {
            kind: StepKind::Element,
            name,
        });
    }

    /// Appends an attribute step.
    pub fn push_attribute(&mut self, name: QName) {
        self.steps.push(Step {
            kind: StepKind::Attribute,
            name,
        });
    }

    /// Removes the last step.
    pub fn pop(&mut self) -> Option<Step> {
        self.steps.pop()
    }

    /// The steps, root first.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// The innermost step.
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` outside the root element.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Displays the path as `/a/b/@c`, with namespaced names in Clark notation.
impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("/");
        }
        for step in &self.steps {
            write!(f, "/{}", step)?;
        }
        Ok(())
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// How a step pattern constrains the namespace of a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespaceMatch {
    /// Any namespace, or none
    Any,
    /// No namespace
    None,
    /// Exactly this namespace URI
    Uri(String),
}

/// One step of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepPattern {
    /// Element or attribute
    pub kind: StepKind,
    /// Namespace constraint
    pub namespace: NamespaceMatch,
    /// Required local name
    pub local: String,
}

impl StepPattern {
    /// Returns `true` if `step` satisfies this pattern.
    pub fn matches(&self, step: &Step) -> bool {
        if self.kind != step.kind || self.local != step.name.local {
            return false;
        }
        match &self.namespace {
            NamespaceMatch::Any => true,
            NamespaceMatch::None => step.name.namespace.is_none(),
            NamespaceMatch::Uri(uri) => step.name.namespace.as_deref() == Some(uri.as_str()),
        }
    }
}

/// The three kinds of pattern, in lookup precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternKind {
    /// Rooted at the document element
    Absolute,
    /// Matches a suffix of the path
    Relative,
    /// Matches everything
    CatchAll,
}

/// A parsed path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    kind: PatternKind,
    steps: Vec<StepPattern>,
    source: String,
}

impl PathPattern {
    /// Parses a pattern that uses no namespace prefixes.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        Self::parse_with(pattern, &HashMap::new())
    }

    /// Parses a pattern, resolving prefixes through `namespaces`.
    ///
    /// The empty prefix, if present, is the default namespace of unprefixed
    /// element steps.
    pub fn parse_with(
        pattern: &str,
        namespaces: &HashMap<String, String>,
    ) -> Result<Self, PatternError> {
        let source = pattern.trim();
        let syntax = |reason: &str| PatternError::Syntax {
            pattern: source.to_string(),
            reason: reason.to_string(),
        };

        if source == "*" {
            return Ok(Self::catch_all());
        }
        if source.is_empty() {
            return Err(syntax("pattern is empty"));
        }

        let (kind, body) = match source.strip_prefix('/') {
            Some(rest) => (PatternKind::Absolute, rest),
            None => (PatternKind::Relative, source),
        };

        let raw_steps = split_steps(body).map_err(|reason| syntax(reason))?;
        let mut steps = Vec::with_capacity(raw_steps.len());
        for raw in raw_steps {
            steps.push(parse_step(source, raw, namespaces)?);
        }

        let attribute_before_last = steps
            .iter()
            .rev()
            .skip(1)
            .any(|s| s.kind == StepKind::Attribute);
        if attribute_before_last {
            return Err(syntax("attribute step must be the last step"));
        }

        Ok(Self {
            kind,
            steps,
            source: source.to_string(),
        })
    }

    /// The catch-all pattern `*`.
    pub fn catch_all() -> Self {
        Self {
            kind: PatternKind::CatchAll,
            steps: Vec::new(),
            source: "*".to_string(),
        }
    }

    /// Returns the pattern kind.
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Returns the step patterns, outermost first.
    pub fn steps(&self) -> &[StepPattern] {
        &self.steps
    }

    /// Returns the innermost step pattern, if any.
    pub fn last(&self) -> Option<&StepPattern> {
        self.steps.last()
    }

    /// Returns `true` if `path` is matched by this pattern.
    pub fn matches(&self, path: &ElementPath) -> bool {
        let path = path.steps();
        match self.kind {
            PatternKind::CatchAll => true,
            PatternKind::Absolute => {
                path.len() == self.steps.len()
                    && self.steps.iter().zip(path).all(|(p, s)| p.matches(s))
            }
            PatternKind::Relative => {
                path.len() >= self.steps.len()
                    && self
                        .steps
                        .iter()
                        .zip(&path[path.len() - self.steps.len()..])
                        .all(|(p, s)| p.matches(s))
            }
        }
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.steps == other.steps
    }
}

impl Eq for PathPattern {}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Splits on `/`, ignoring slashes inside `{...}`.
fn split_steps(body: &str) -> Result<Vec<&str>, &'static str> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '{' if depth == 0 => depth = 1,
            '{' => return Err("nested '{'"),
            '}' if depth == 1 => depth = 0,
            '}' => return Err("unbalanced '}'"),
            '/' if depth == 0 => {
                steps.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unterminated '{'");
    }
    steps.push(&body[start..]);
    if steps.iter().any(|s| s.trim().is_empty()) {
        return Err("empty step");
    }
    Ok(steps)
}

fn parse_step(
    pattern: &str,
    raw: &str,
    namespaces: &HashMap<String, String>,
) -> Result<StepPattern, PatternError> {
    let syntax = |reason: String| PatternError::Syntax {
        pattern: pattern.to_string(),
        reason,
    };

    let raw = raw.trim();
    let (kind, raw) = match raw.strip_prefix('@') {
        Some(rest) => (StepKind::Attribute, rest),
        None => (StepKind::Element, raw),
    };

    let (namespace, local) = if let Some(rest) = raw.strip_prefix('{') {
        let close = rest
            .find('}')
            .ok_or_else(|| syntax(format!("unterminated '{{' in step {:?}", raw)))?;
        let uri = &rest[..close];
        let namespace = match uri {
            "*" => NamespaceMatch::Any,
            "" => NamespaceMatch::None,
            uri => NamespaceMatch::Uri(uri.to_string()),
        };
        (namespace, &rest[close + 1..])
    } else if let Some((prefix, local)) = raw.split_once(':') {
        let uri = namespaces
            .get(prefix)
            .filter(|_| !prefix.is_empty())
            .ok_or_else(|| PatternError::UnboundPrefix {
                pattern: pattern.to_string(),
                prefix: prefix.to_string(),
            })?;
        (NamespaceMatch::Uri(uri.clone()), local)
    } else {
        let namespace = match (kind, namespaces.get("")) {
            (StepKind::Element, Some(uri)) => NamespaceMatch::Uri(uri.clone()),
            _ => NamespaceMatch::None,
        };
        (namespace, raw)
    };

    let invalid_local = local.is_empty()
        || local
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '@' | ':' | '*' | '/'));
    if invalid_local {
        return Err(syntax(format!("invalid local name in step {:?}", raw)));
    }

    Ok(StepPattern {
        kind,
        namespace,
        local: local.to_string(),
    })
}
