//! Options for the placeholder steps (`lqip-loader`, `image-trace-loader`).

use super::{Options, file, merge_options};
use crate::config::Configuration;
use crate::host::HostConfig;

pub fn lqip_loader_options(config: &Configuration, host: &HostConfig, is_server: bool) -> Options {
    let base = file::file_loader_options(config, host, is_server);
    match &config.lqip {
        Some(lqip) => merge_options(&base, lqip),
        None => base,
    }
}

pub fn image_trace_loader_options(config: &Configuration) -> Options {
    config.image_trace.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lqip_overrides_file_options() {
        let config = Configuration {
            lqip: Some(json!({"name": "[hash]-lqip.[ext]"}).as_object().cloned().unwrap()),
            ..Default::default()
        };
        let options = lqip_loader_options(&config, &HostConfig::default(), false);
        assert_eq!(options["name"], "[hash]-lqip.[ext]");
        assert_eq!(options["outputPath"], "static/images/");
    }

    #[test]
    fn trace_defaults_to_empty() {
        assert!(image_trace_loader_options(&Configuration::default()).is_empty());
    }
}
