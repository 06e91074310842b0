//! Resource-query rule table.
//!
//! An import can carry a query suffix that overrides the default chain:
//!
//! | Query | Chain | Optimized |
//! |---|---|---|
//! | `?url` | external file, never inlined | yes |
//! | `?inline` | always inlined, limit removed | yes |
//! | `?include` | raw content included directly | yes |
//! | `?original` | default inline/file, untouched | no |
//! | `?lqip` | low quality placeholder | no |
//! | `?lqip-colors` | dominant color palette | no |
//! | `?size` | responsive resize | no |
//! | `?trace` | traced svg outline placeholder | yes |
//!
//! Entries marked combinable also get a variant that matches together with
//! `original` in either order (`?url&original`, `?original&url`). Combined
//! variants never optimize and sit ahead of every base entry, since the base
//! pattern would also match their queries.
//!
//! The table is rebuilt as a fresh immutable sequence on every call.

use crate::loaders::{Options, StepKind, StepOptions, merge_options};
use crate::rules::{Alternative, LoaderStep, Pattern};
use serde_json::{Value, json};

/// Directive that combined variants pair with.
const ORIGINAL: &str = "original";

/// One row of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRule {
    pub directive: String,
    pub pattern: String,
    pub steps: Vec<StepKind>,
    /// Per-position option overrides, merged over the computed payloads.
    pub overrides: Vec<Options>,
    pub requires_optimization: bool,
    /// Whether an `original` combination is derived from this row.
    pub combinable: bool,
}

impl QueryRule {
    fn new(directive: &str, steps: &[StepKind], requires_optimization: bool) -> Self {
        Self {
            directive: directive.to_string(),
            pattern: directive.to_string(),
            steps: steps.to_vec(),
            overrides: Vec::new(),
            requires_optimization,
            combinable: false,
        }
    }

    fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    fn overrides(mut self, overrides: Vec<Value>) -> Self {
        self.overrides = overrides
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                _ => Options::new(),
            })
            .collect();
        self
    }

    fn combinable(mut self) -> Self {
        self.combinable = true;
        self
    }

    /// The `original` variant: matches both directives in either order.
    fn with_original(&self) -> Self {
        Self {
            directive: format!("{}+{ORIGINAL}", self.directive),
            pattern: format!(
                "({p}.*{ORIGINAL}|{ORIGINAL}.*{p})",
                p = self.pattern
            ),
            requires_optimization: false,
            combinable: false,
            ..self.clone()
        }
    }
}

/// The base rows, in priority order.
pub fn base_table() -> Vec<QueryRule> {
    use StepKind::*;
    vec![
        QueryRule::new("url", &[File], true).combinable(),
        QueryRule::new("inline", &[Url], true)
            .overrides(vec![json!({ "limit": null })])
            .combinable(),
        QueryRule::new("include", &[Raw], true).combinable(),
        QueryRule::new(ORIGINAL, &[Url], false),
        QueryRule::new("lqip", &[LqipPictureExport, Lqip, Url], false).pattern("lqip(&|$)"),
        QueryRule::new("lqip-colors", &[LqipColorsExport, Lqip, Url], false)
            .overrides(vec![json!({}), json!({ "base64": false, "palette": true })]),
        QueryRule::new("size", &[Responsive], false),
        QueryRule::new("trace", &[ImageTrace, Url], true).combinable(),
    ]
}

/// Combined variants first, then the base rows.
pub fn query_table() -> Vec<QueryRule> {
    let base = base_table();
    let combined = base
        .iter()
        .filter(|rule| rule.combinable)
        .map(QueryRule::with_original);
    combined.chain(base.iter().cloned()).collect()
}

/// Turn the table into alternatives for one rule.
///
/// The optimizer step is appended only to rows that require optimization,
/// and only when an optimizer is given. Passing `None` suppresses it.
pub fn resolve_query_rules(
    step_options: &StepOptions,
    optimizer: Option<&LoaderStep>,
) -> Vec<Alternative> {
    query_table()
        .iter()
        .map(|rule| {
            let mut steps: Vec<LoaderStep> = rule
                .steps
                .iter()
                .enumerate()
                .map(|(index, &kind)| {
                    let computed = step_options.get(kind);
                    let options = match (computed, rule.overrides.get(index)) {
                        (base, Some(overlay)) => {
                            Some(merge_options(&base.cloned().unwrap_or_default(), overlay))
                        }
                        (Some(base), None) => Some(base.clone()),
                        (None, None) => None,
                    };
                    LoaderStep::new(kind, options)
                })
                .collect();

            if rule.requires_optimization {
                if let Some(optimizer) = optimizer {
                    steps.push(optimizer.clone());
                }
            }

            Alternative::when_query(Pattern::fixed(&rule.pattern), steps)
        })
        .collect()
}
