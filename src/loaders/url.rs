//! Options for the inline-or-file step (`url-loader`) and the size policy it applies.

use super::{Options, StepKind, file};
use crate::config::Configuration;
use crate::host::HostConfig;
use serde::Serialize;
use serde_json::Value;

/// File options plus the inline threshold and the step used above it.
pub fn url_loader_options(config: &Configuration, host: &HostConfig, is_server: bool) -> Options {
    let mut options = file::file_loader_options(config, host, is_server);
    options.insert("limit".into(), Value::from(config.inline_image_limit));
    options.insert(
        "fallback".into(),
        Value::String(StepKind::File.loader_name().to_string()),
    );
    options
}

/// How an asset ends up in the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Delivery {
    /// Embedded as a data URI.
    Inline,
    /// Emitted as a separate file and referenced by URL.
    External,
}

impl Delivery {
    /// Apply the inline threshold from a `url-loader` option bag.
    ///
    /// Inline iff `size < limit`; a missing limit always inlines.
    pub fn for_size(options: &Options, size: u64) -> Self {
        match options.get("limit").and_then(Value::as_u64) {
            Some(limit) if size >= limit => Delivery::External,
            _ => Delivery::Inline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Options {
        url_loader_options(&Configuration::default(), &HostConfig::default(), false)
    }

    #[test]
    fn carries_limit_and_fallback() {
        let options = options();
        assert_eq!(options["limit"], 8192);
        assert_eq!(options["fallback"], "file-loader");
        assert_eq!(options["publicPath"], "/_next/static/images/");
    }

    #[test]
    fn below_limit_inlines() {
        assert_eq!(Delivery::for_size(&options(), 8191), Delivery::Inline);
    }

    #[test]
    fn at_limit_is_external() {
        assert_eq!(Delivery::for_size(&options(), 8192), Delivery::External);
    }

    #[test]
    fn missing_limit_always_inlines() {
        let mut options = options();
        options.remove("limit");
        assert_eq!(Delivery::for_size(&options, u64::MAX), Delivery::Inline);
    }
}
