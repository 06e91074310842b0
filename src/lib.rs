//! # optimg
//!
//! Routes image imports through the right processing chain for a bundler
//! build, based on file type, build context, and which optional optimization
//! tools are installed next to the project.
//!
//! The crate never touches pixels. It decides *which* external processing
//! steps apply to an asset reference, in what order, and with what options,
//! and hands the host bundler an ordered rule list.
//!
//! # Pipeline
//!
//! ```text
//! overrides ─▶ normalize ─▶ Configuration
//! node_modules ─▶ detect ─▶ Capabilities
//! build flags / phase ─▶ should_optimize_now ─▶ bool
//!                     │
//!                     ▼
//!  assemble: responsive rule? + one rule per family (query table + fallback)
//!                     │
//!                     ▼
//!  host rule list (+ built-in media rule patched to exclude claimed types)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | Stock defaults, shallow user overrides, `optimg.toml` loading |
//! | [`capability`] | Optional-tool detection behind a provider trait |
//! | [`policy`] | Whether this invocation optimizes (phase first, then dev/prod) |
//! | [`loaders`] | Option payload builders for every processing step |
//! | [`optimizer`] | One-time acquisition of optimizer plugins |
//! | [`query`] | Resource-query table (`?url`, `?inline`, `?lqip`, ...) |
//! | [`dispatch`] | Per-family rule building |
//! | [`assemble`] | Ordered rule list for one build |
//! | [`rules`] | Output rule model and local first-match evaluation |
//! | [`host`] | Host entry point, rule hook chaining, built-in rule shim |
//! | [`output`] | Advisory and CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Capability Absence Degrades, Never Fails
//!
//! Every optional tool is optional in the strict sense: a missing optimizer
//! removes the optimizer step from the chains that would have used it, and
//! nothing else. The only fatal conditions are a host that lacks the expected
//! extension point and a detected tool that then fails to load.
//!
//! ## Tables Are Rebuilt, Not Mutated
//!
//! The resource-query table is a fresh immutable sequence each time it is
//! requested. Combined `original` variants are derived in a second pass and
//! placed ahead of the base rows, so concurrent builds never share table state.
//!
//! ## Probing Behind Traits
//!
//! Detection sits behind [`capability::CapabilityProvider`] and optimizer
//! loading behind [`optimizer::ModuleLoader`], so tests supply arbitrary
//! capability records without a `node_modules` tree.

pub mod assemble;
pub mod capability;
pub mod config;
pub mod dispatch;
pub mod host;
pub mod loaders;
pub mod optimizer;
pub mod output;
pub mod policy;
pub mod query;
pub mod rules;

pub use assemble::{AssembleError, assemble};
pub use capability::{Capabilities, detect, detect_installed};
pub use config::{ConfigOverrides, Configuration, normalize};
pub use host::{with_environment, with_optimized_images};
pub use policy::{BuildContext, BuildPhase, should_optimize_now};
pub use rules::ProcessingRule;

#[cfg(test)]
pub(crate) mod test_helpers;
