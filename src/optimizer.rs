//! Acquisition of optimizer plugins for the default chain.
//!
//! The default chain's optimizer step (`img-loader`) takes a list of
//! initialized plugins, one per detected per-format tool. Initializing a
//! plugin means loading its module and handing it the tool's option bag.
//! [`ModuleLoader`] is that primitive; [`PluginDescriptorLoader`] resolves the
//! module and describes the initialized plugin as data for the host.
//!
//! The tool-to-initializer mapping is resolved once per build in
//! [`OptimizerSet::resolve`], never from inside rule building.

use crate::capability::{Capabilities, ModuleResolver};
use crate::config::Configuration;
use crate::loaders::Options;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("optimizer module '{0}' was detected but cannot be loaded")]
    NotFound(String),
}

/// Loads a module and initializes it with an option bag.
pub trait ModuleLoader {
    fn load(&self, module: &str, options: &Options) -> Result<Value, LoadError>;
}

/// Resolves the module, then emits `{ "plugin": <path>, "options": {...} }`.
pub struct PluginDescriptorLoader<R> {
    resolver: R,
}

impl<R: ModuleResolver> PluginDescriptorLoader<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

impl<R: ModuleResolver> ModuleLoader for PluginDescriptorLoader<R> {
    fn load(&self, module: &str, options: &Options) -> Result<Value, LoadError> {
        let path = self
            .resolver
            .resolve(module)
            .ok_or_else(|| LoadError::NotFound(module.to_string()))?;
        Ok(json!({
            "plugin": path.to_string_lossy(),
            "options": options,
        }))
    }
}

/// Initialized plugins for the default chain's optimizer step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizerSet {
    pub plugins: Vec<Value>,
}

impl OptimizerSet {
    /// Load every detected per-format optimizer (jpeg, png, svg, gif order).
    ///
    /// A tool that was detected but fails to load is fatal.
    pub fn resolve(
        config: &Configuration,
        capabilities: &Capabilities,
        loader: &dyn ModuleLoader,
    ) -> Result<Self, LoadError> {
        let tools = [
            &capabilities.jpeg,
            &capabilities.png,
            &capabilities.svg,
            &capabilities.gif,
        ];
        let mut plugins = Vec::new();
        for tool in tools.into_iter().flatten() {
            let bag = config.tool_options(tool.trim_start_matches("imagemin-"));
            debug!(tool = %tool, "loading optimizer plugin");
            plugins.push(loader.load(tool, &bag)?);
        }
        Ok(Self { plugins })
    }

    /// Option payload for the optimizer step.
    pub fn img_loader_options(&self) -> Options {
        let mut options = Options::new();
        options.insert("plugins".into(), Value::Array(self.plugins.clone()));
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{GIFSICLE, MOZJPEG, PNGQUANT, SVGO};
    use crate::test_helpers::RecordingLoader;
    use std::path::PathBuf;

    struct NoModules;

    impl ModuleResolver for NoModules {
        fn resolve(&self, _name: &str) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn loads_in_format_order_with_tool_bags() {
        let caps = Capabilities {
            gif: Some(GIFSICLE.into()),
            jpeg: Some(MOZJPEG.into()),
            svg: Some(SVGO.into()),
            ..Capabilities::none()
        };
        let loader = RecordingLoader::default();
        let set = OptimizerSet::resolve(&Configuration::default(), &caps, &loader).unwrap();

        assert_eq!(loader.loaded(), vec![MOZJPEG, SVGO, GIFSICLE]);
        assert_eq!(set.plugins.len(), 3);
        assert_eq!(set.plugins[2]["options"]["optimizationLevel"], 3);
    }

    #[test]
    fn png_bag_follows_detected_tool() {
        let caps = Capabilities {
            png: Some(PNGQUANT.into()),
            ..Capabilities::none()
        };
        let mut config = Configuration::default();
        config.pngquant.insert("speed".into(), json!(1));
        let set = OptimizerSet::resolve(&config, &caps, &RecordingLoader::default()).unwrap();
        assert_eq!(set.plugins[0]["options"]["speed"], 1);
    }

    #[test]
    fn no_tools_no_plugins() {
        let set = OptimizerSet::resolve(
            &Configuration::default(),
            &Capabilities::none(),
            &PluginDescriptorLoader::new(NoModules),
        )
        .unwrap();
        assert_eq!(
            Value::Object(set.img_loader_options()),
            json!({ "plugins": [] })
        );
    }

    #[test]
    fn unloadable_tool_is_fatal() {
        let caps = Capabilities {
            jpeg: Some(MOZJPEG.into()),
            ..Capabilities::none()
        };
        let err = OptimizerSet::resolve(
            &Configuration::default(),
            &caps,
            &PluginDescriptorLoader::new(NoModules),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::NotFound(m) if m == MOZJPEG));
    }
}
