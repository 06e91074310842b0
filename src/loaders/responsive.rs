//! Options for the responsive resizer step (`responsive-loader`).

use super::{Options, file, merge_options};
use crate::capability::{Capabilities, ResizerBackend};
use crate::config::Configuration;
use crate::host::HostConfig;
use serde_json::Value;

/// Naming template for resized variants; carries the width token.
pub const RESPONSIVE_NAME: &str = "[name]-[width]-[hash].[ext]";

/// File options, the width-aware name, then the user's `responsive` bag.
///
/// The `adapter` is the user's choice when given; otherwise the sharp
/// adapter bundled with the detected resizer when sharp is the backend.
/// Jimp is the resizer's own default and needs no adapter.
pub fn responsive_loader_options(
    config: &Configuration,
    host: &HostConfig,
    is_server: bool,
    capabilities: &Capabilities,
) -> Options {
    let mut options = file::file_loader_options(config, host, is_server);
    options.insert("name".into(), Value::String(RESPONSIVE_NAME.to_string()));

    let user = config.responsive.clone().unwrap_or_default();
    let mut options = merge_options(&options, &user);

    let adapter = match user.get("adapter") {
        Some(adapter) if !adapter.is_null() => Some(adapter.clone()),
        _ => sharp_adapter(capabilities).map(Value::String),
    };
    match adapter {
        Some(adapter) => {
            options.insert("adapter".into(), adapter);
        }
        None => {
            options.remove("adapter");
        }
    }
    options
}

fn sharp_adapter(capabilities: &Capabilities) -> Option<String> {
    match (&capabilities.responsive, capabilities.responsive_adapter) {
        (Some(package), Some(ResizerBackend::Sharp)) => {
            Some(format!("{}/sharp", package.trim_end_matches(['/', '\\'])))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_resizer(backend: Option<ResizerBackend>) -> Capabilities {
        Capabilities {
            responsive: Some("/app/node_modules/responsive-loader".into()),
            responsive_adapter: backend,
            ..Capabilities::none()
        }
    }

    #[test]
    fn name_carries_width() {
        let options = responsive_loader_options(
            &Configuration::default(),
            &HostConfig::default(),
            false,
            &Capabilities::none(),
        );
        assert_eq!(options["name"], RESPONSIVE_NAME);
        assert!(!options.contains_key("adapter"));
    }

    #[test]
    fn sharp_backend_sets_adapter() {
        let options = responsive_loader_options(
            &Configuration::default(),
            &HostConfig::default(),
            false,
            &with_resizer(Some(ResizerBackend::Sharp)),
        );
        assert_eq!(options["adapter"], "/app/node_modules/responsive-loader/sharp");
    }

    #[test]
    fn jimp_backend_leaves_adapter_unset() {
        let options = responsive_loader_options(
            &Configuration::default(),
            &HostConfig::default(),
            false,
            &with_resizer(Some(ResizerBackend::Jimp)),
        );
        assert!(!options.contains_key("adapter"));
    }

    #[test]
    fn user_adapter_and_sizes_win() {
        let config = Configuration {
            responsive: json!({"adapter": "custom-adapter", "sizes": [320, 640]})
                .as_object()
                .cloned(),
            ..Default::default()
        };
        let options = responsive_loader_options(
            &config,
            &HostConfig::default(),
            true,
            &with_resizer(Some(ResizerBackend::Sharp)),
        );
        assert_eq!(options["adapter"], "custom-adapter");
        assert_eq!(options["sizes"], json!([320, 640]));
        assert_eq!(options["outputPath"], "../static/images/");
    }
}
