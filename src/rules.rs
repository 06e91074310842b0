//! Output rule model handed to the host bundler.
//!
//! A [`ProcessingRule`] matches files by extension and holds an ordered list
//! of [`Alternative`]s. The host takes the first alternative whose resource
//! query pattern matches the import's query suffix; an alternative without
//! a query pattern matches unconditionally and acts as the fallback.
//!
//! Serialized shape (what the host installs):
//!
//! ```json
//! {
//!   "test": "/\\.(jpe?g|png)$/i",
//!   "oneOf": [
//!     { "resourceQuery": "/url/", "use": [{ "loader": "file-loader", "options": {} }] },
//!     { "use": [{ "loader": "url-loader", "options": { "limit": 8192 } }] }
//!   ]
//! }
//! ```

use crate::loaders::{Options, StepKind};
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};
use std::fmt;

/// A compiled regex that remembers its source and flags.
///
/// Displays and serializes in literal form (`/source/flags`), which is the
/// shape host rule trees use for patterns.
#[derive(Clone)]
pub struct Pattern {
    regex: Regex,
    case_insensitive: bool,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(source)?,
            case_insensitive: false,
        })
    }

    pub fn case_insensitive(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: RegexBuilder::new(source).case_insensitive(true).build()?,
            case_insensitive: true,
        })
    }

    /// Pattern matching any of the given extensions at the end of a path.
    pub fn extensions(alternatives: &[&str]) -> Result<Self, regex::Error> {
        Self::case_insensitive(&format!(r"\.({})$", alternatives.join("|")))
    }

    /// Compile a pattern known to be valid (built-in tables).
    pub(crate) fn fixed(source: &str) -> Self {
        Self::new(source).expect("built-in pattern must compile")
    }

    /// Extension pattern over a built-in extension list.
    pub(crate) fn fixed_extensions(alternatives: &[&str]) -> Self {
        Self::extensions(alternatives).expect("built-in extension pattern must compile")
    }

    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = if self.case_insensitive { "i" } else { "" };
        write!(f, "/{}/{}", self.regex.as_str(), flags)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({self})")
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source() == other.source() && self.case_insensitive == other.case_insensitive
    }
}

impl Eq for Pattern {}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One step of a chain: the step's name plus its option payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderStep {
    pub loader: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,
}

impl LoaderStep {
    pub fn new(kind: StepKind, options: Option<Options>) -> Self {
        Self {
            loader: kind.loader_name().to_string(),
            options,
        }
    }

    pub fn is(&self, kind: StepKind) -> bool {
        self.loader == kind.loader_name()
    }
}

/// A step chain, optionally gated on a resource query pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    #[serde(rename = "resourceQuery", skip_serializing_if = "Option::is_none")]
    pub resource_query: Option<Pattern>,
    #[serde(rename = "use")]
    pub steps: Vec<LoaderStep>,
}

impl Alternative {
    /// Unconditional alternative.
    pub fn fallback(steps: Vec<LoaderStep>) -> Self {
        Self {
            resource_query: None,
            steps,
        }
    }

    pub fn when_query(pattern: Pattern, steps: Vec<LoaderStep>) -> Self {
        Self {
            resource_query: Some(pattern),
            steps,
        }
    }

    pub fn matches_query(&self, query: &str) -> bool {
        match &self.resource_query {
            Some(pattern) => pattern.is_match(query),
            None => true,
        }
    }

    pub fn loader_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.loader.as_str()).collect()
    }

    pub fn step(&self, kind: StepKind) -> Option<&LoaderStep> {
        self.steps.iter().find(|s| s.is(kind))
    }
}

/// A rule for one set of file extensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingRule {
    pub test: Pattern,
    #[serde(rename = "oneOf")]
    pub one_of: Vec<Alternative>,
}

impl ProcessingRule {
    /// First alternative the host would apply to `path` imported with `query`.
    ///
    /// `query` is the raw suffix including the leading `?`, or empty.
    pub fn select(&self, path: &str, query: &str) -> Option<&Alternative> {
        if !self.test.is_match(path) {
            return None;
        }
        self.one_of.iter().find(|alt| alt.matches_query(query))
    }
}

/// First rule and alternative that apply to an import request (`path?query`).
pub fn resolve_request<'a>(
    rules: &'a [ProcessingRule],
    request: &str,
) -> Option<(&'a ProcessingRule, &'a Alternative)> {
    let (path, query) = split_request(request);
    rules
        .iter()
        .find_map(|rule| rule.select(path, query).map(|alt| (rule, alt)))
}

/// Split `images/a.png?lqip` into `("images/a.png", "?lqip")`.
pub fn split_request(request: &str) -> (&str, &str) {
    match request.find('?') {
        Some(pos) => request.split_at(pos),
        None => (request, ""),
    }
}
