//! Whether the current build invocation should optimize at all.
//!
//! Two policies exist because the plugin runs either standalone (the host
//! only says dev or prod) or beneath a composition layer that names the
//! build phase explicitly. A known phase always takes precedence.

use serde::{Deserialize, Serialize};

/// Build phase as named by a composition layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildPhase {
    ProductionBuild,
    Export,
    DevelopmentServer,
    /// Any other phase name; never optimizes.
    Other(String),
}

impl BuildPhase {
    pub fn parse(name: &str) -> Self {
        match name {
            "phase-production-build" => BuildPhase::ProductionBuild,
            "phase-export" => BuildPhase::Export,
            "phase-development-server" => BuildPhase::DevelopmentServer,
            other => BuildPhase::Other(other.to_string()),
        }
    }
}

/// Contextual flags for one build invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    pub is_server: bool,
    pub is_development: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<BuildPhase>,
}

/// Decide whether images get optimized in this invocation.
pub fn should_optimize_now(optimize: bool, optimize_in_dev: bool, context: &BuildContext) -> bool {
    match &context.phase {
        Some(BuildPhase::ProductionBuild | BuildPhase::Export) => optimize,
        Some(BuildPhase::DevelopmentServer) => optimize_in_dev,
        Some(BuildPhase::Other(_)) => false,
        None if context.is_development => optimize_in_dev,
        None => optimize,
    }
}
