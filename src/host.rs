//! Integration with the host framework and its bundler configuration.
//!
//! The host calls [`with_optimized_images`] with the user's overrides and
//! gets back a transform over its own [`HostConfig`]. The transform installs
//! a rule hook; the host later runs that hook for every bundle it builds
//! (server and client), passing the bundler's [`BuildConfig`] and
//! [`BuildOptions`]. The hook:
//!
//! 1. Rejects hosts that do not expose `defaultLoaders` (too old to integrate).
//! 2. Detects capabilities, printing an advisory when a server build wants
//!    optimization but no optimizer is installed.
//! 3. Excludes claimed image extensions from the host's built-in css media
//!    rule (see [`exclude_claimed_extensions`]).
//! 4. Appends the assembled rules.
//! 5. Runs any hook the host config already had, last, with the result.
//!
//! Host rule trees are kept as untyped JSON: this crate only appends to them
//! and patches one narrowly-matched rule.

use crate::assemble::{AssembleError, assemble};
use crate::capability::{Capabilities, NodeModuleResolver, detect_installed};
use crate::config::{ConfigOverrides, Configuration, normalize};
use crate::dispatch::HandledTypes;
use crate::optimizer::{ModuleLoader, PluginDescriptorLoader};
use crate::output;
use crate::policy::{BuildContext, BuildPhase};
use crate::rules::Pattern;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Hook the host runs to finalize a bundler configuration.
pub type RuleHook =
    Arc<dyn Fn(BuildConfig, &BuildOptions) -> Result<BuildConfig, AssembleError> + Send + Sync>;

/// Host framework settings this crate reads or extends.
#[derive(Clone, Default)]
pub struct HostConfig {
    /// CDN prefix for static assets.
    pub asset_prefix: Option<String>,
    /// Where to probe for optional tools instead of the working directory.
    pub image_loader_search_path: Option<PathBuf>,
    /// Hook already installed by the user or another plugin.
    pub rule_hook: Option<RuleHook>,
}

impl fmt::Debug for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostConfig")
            .field("asset_prefix", &self.asset_prefix)
            .field("image_loader_search_path", &self.image_loader_search_path)
            .field("rule_hook", &self.rule_hook.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

/// Bundler configuration. Only the rule list is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub module: ModuleConfig,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default)]
    pub rules: Vec<Value>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

/// Per-bundle options the host passes to rule hooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub dev: bool,
    pub is_server: bool,
    /// Present on every host version this crate supports.
    #[serde(default)]
    pub default_loaders: Option<Value>,
}

/// Metadata from a plugin-composition layer, when the plugin runs under one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeMeta {
    pub phase: Option<String>,
}

/// Where capabilities and optimizer modules come from.
pub trait Environment: Send + Sync {
    fn capabilities(&self, search_path: Option<&Path>) -> Capabilities;
    fn loader(&self, search_path: Option<&Path>) -> Box<dyn ModuleLoader>;
}

/// The real environment: `node_modules` resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeEnvironment;

impl Environment for NodeEnvironment {
    fn capabilities(&self, search_path: Option<&Path>) -> Capabilities {
        detect_installed(search_path)
    }

    fn loader(&self, search_path: Option<&Path>) -> Box<dyn ModuleLoader> {
        Box::new(PluginDescriptorLoader::new(NodeModuleResolver::new(
            search_path,
        )))
    }
}

/// Host-facing entry point using the real environment.
pub fn with_optimized_images(
    overrides: &ConfigOverrides,
) -> impl Fn(HostConfig, ComposeMeta) -> HostConfig + use<> {
    with_environment(overrides, Arc::new(NodeEnvironment))
}

/// Entry point with an explicit environment.
///
/// The overrides are normalized up front; the returned transform does not
/// borrow them.
pub fn with_environment(
    overrides: &ConfigOverrides,
    environment: Arc<dyn Environment>,
) -> impl Fn(HostConfig, ComposeMeta) -> HostConfig + use<> {
    let config = Arc::new(normalize(overrides));
    move |host: HostConfig, meta: ComposeMeta| {
        let previous = host.rule_hook.clone();
        let settings = HostConfig {
            rule_hook: None,
            ..host.clone()
        };
        let config = Arc::clone(&config);
        let environment = Arc::clone(&environment);

        let hook: RuleHook = Arc::new(move |build: BuildConfig, options: &BuildOptions| {
            let build = apply_rules(&config, environment.as_ref(), &settings, &meta, build, options)?;
            match &previous {
                Some(previous) => previous(build, options),
                None => Ok(build),
            }
        });

        HostConfig {
            rule_hook: Some(hook),
            ..host
        }
    }
}

/// Extend one bundler configuration with the assembled rules.
pub fn apply_rules(
    config: &Configuration,
    environment: &dyn Environment,
    host: &HostConfig,
    meta: &ComposeMeta,
    mut build: BuildConfig,
    options: &BuildOptions,
) -> Result<BuildConfig, AssembleError> {
    if options.default_loaders.is_none() {
        return Err(AssembleError::IncompatibleHost(
            "build options carry no `defaultLoaders`; the host version is too old".to_string(),
        ));
    }

    let context = BuildContext {
        is_server: options.is_server,
        is_development: options.dev,
        phase: meta.phase.as_deref().map(BuildPhase::parse),
    };
    let search_path = host.image_loader_search_path.as_deref();
    let capabilities = environment.capabilities(search_path);
    debug!(?capabilities, "detected capabilities");

    if config.optimize_images && capabilities.optimizer_count() == 0 && context.is_server {
        warn!("image optimization requested but no optimizer is installed");
        output::print_missing_optimizer_warning();
    }

    let handled = HandledTypes::from_config(config);
    exclude_claimed_extensions(&mut build.module.rules, &handled.file_extensions());

    let loader = environment.loader(search_path);
    let rules = assemble(config, &capabilities, &context, host, loader.as_ref())?;
    for rule in &rules {
        build.module.rules.push(serde_json::to_value(rule)?);
    }
    Ok(build)
}

/// Issuer pattern of the host's built-in stylesheet media rule.
const BUILTIN_MEDIA_ISSUER: &str = r"/\.(css|scss|sass)$/";

/// Emitted-name prefix of the host's built-in media rule.
const BUILTIN_MEDIA_NAME_PREFIX: &str = "static/media/";

/// Compatibility shim for the host's built-in image handling.
///
/// Contract: inside any rule's `oneOf`, a sub-rule that has an `issuer`
/// equal to (or whose `issuer.test` equals) the stylesheet pattern, no `test`,
/// no `include`, an `exclude` list, and a `use.options.name` under
/// `static/media/`, gets a pattern over `extensions` appended to its
/// `exclude` list. Nothing else in the tree is touched. Matching is by the
/// pattern's literal text, so it is best effort across host versions.
///
/// Returns the number of sub-rules patched.
pub fn exclude_claimed_extensions(rules: &mut [Value], extensions: &[&str]) -> usize {
    if extensions.is_empty() {
        return 0;
    }
    let exclusion = Pattern::fixed(&format!(r"\.({})$", extensions.join("|"))).to_string();

    let mut patched = 0;
    for rule in rules.iter_mut() {
        let Some(one_of) = rule.get_mut("oneOf").and_then(Value::as_array_mut) else {
            continue;
        };
        for sub_rule in one_of.iter_mut() {
            if !is_builtin_media_rule(sub_rule) {
                continue;
            }
            if let Some(exclude) = sub_rule.get_mut("exclude").and_then(Value::as_array_mut) {
                exclude.push(Value::String(exclusion.clone()));
                patched += 1;
            }
        }
    }
    debug!(patched, "patched built-in media rules");
    patched
}

fn is_builtin_media_rule(rule: &Value) -> bool {
    let Some(issuer) = rule.get("issuer") else {
        return false;
    };
    if rule.get("test").is_some() || rule.get("include").is_some() {
        return false;
    }
    if !rule.get("exclude").is_some_and(Value::is_array) {
        return false;
    }
    let Some(name) = rule.pointer("/use/options/name").and_then(Value::as_str) else {
        return false;
    };

    let issuer_matches = issuer.as_str() == Some(BUILTIN_MEDIA_ISSUER)
        || issuer.get("test").and_then(Value::as_str) == Some(BUILTIN_MEDIA_ISSUER);
    issuer_matches && name.starts_with(BUILTIN_MEDIA_NAME_PREFIX)
}
