//! Shared test utilities for the optimg test suite.
//!
//! Provides fixture builders for build contexts and step options, a
//! recording [`ModuleLoader`] double, and lookup helpers that panic with a
//! clear message on miss.

use std::sync::Mutex;

use serde_json::{Value, json};

use crate::capability::Capabilities;
use crate::config::Configuration;
use crate::host::HostConfig;
use crate::loaders::{Options, StepOptions};
use crate::optimizer::{LoadError, ModuleLoader};
use crate::policy::BuildContext;
use crate::rules::{Alternative, ProcessingRule};

// =========================================================================
// Fixtures
// =========================================================================

/// Client-side production build without a composition phase.
pub fn production() -> BuildContext {
    BuildContext::default()
}

/// Step payloads for the stock config on a client build.
pub fn step_options() -> StepOptions {
    StepOptions::new(
        &Configuration::default(),
        &HostConfig::default(),
        false,
        &Capabilities::none(),
    )
}

// =========================================================================
// Module loader double
// =========================================================================

/// Loader that records every module it is asked for.
///
/// Uses Mutex (not RefCell) so it can sit behind shared references freely.
#[derive(Default)]
pub struct RecordingLoader {
    loaded: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingLoader {
    /// A loader for which every module fails to load.
    pub fn failing() -> Self {
        Self {
            loaded: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }
}

impl ModuleLoader for RecordingLoader {
    fn load(&self, module: &str, options: &Options) -> Result<Value, LoadError> {
        self.loaded.lock().unwrap().push(module.to_string());
        if self.fail {
            return Err(LoadError::NotFound(module.to_string()));
        }
        Ok(json!({ "plugin": module, "options": options }))
    }
}

// =========================================================================
// Rule lookups
// =========================================================================

/// Find the alternative gated on a query pattern (literal form, e.g. `/webp/`).
pub fn find_query<'a>(rule: &'a ProcessingRule, pattern: &str) -> Option<&'a Alternative> {
    rule.one_of.iter().find(|alt| {
        alt.resource_query
            .as_ref()
            .is_some_and(|p| p.to_string() == pattern)
    })
}

/// The unconditional fallback of a rule. Panics if the rule has none.
pub fn fallback_of(rule: &ProcessingRule) -> &Alternative {
    rule.one_of
        .iter()
        .find(|alt| alt.resource_query.is_none())
        .unwrap_or_else(|| panic!("rule {} has no fallback alternative", rule.test))
}
