//! Options for the external-file step (`file-loader`).

use super::Options;
use crate::config::Configuration;
use crate::host::HostConfig;
use serde_json::Value;

/// Path segment the host serves static build output from.
pub const STATIC_PUBLIC_ROOT: &str = "_next/static";

/// Public URL prefix for emitted files.
///
/// Priority: `images_public_path` → host asset prefix → site root.
pub fn public_path(config: &Configuration, host: &HostConfig) -> String {
    if let Some(path) = &config.images_public_path {
        return path.clone();
    }
    match host.asset_prefix.as_deref() {
        Some(prefix) if !prefix.is_empty() => {
            let sep = if prefix.ends_with('/') { "" } else { "/" };
            format!(
                "{prefix}{sep}{STATIC_PUBLIC_ROOT}/{}/",
                config.images_folder
            )
        }
        _ => format!("/{STATIC_PUBLIC_ROOT}/{}/", config.images_folder),
    }
}

/// Output directory for emitted files, relative to the bundle output.
///
/// Server bundles are emitted one level deeper, so they step back up.
pub fn output_path(config: &Configuration, is_server: bool) -> String {
    if let Some(path) = &config.images_output_path {
        return path.clone();
    }
    let up = if is_server { "../" } else { "" };
    format!("{up}static/{}/", config.images_folder)
}

pub fn file_loader_options(config: &Configuration, host: &HostConfig, is_server: bool) -> Options {
    let mut options = Options::new();
    options.insert("publicPath".into(), Value::String(public_path(config, host)));
    options.insert(
        "outputPath".into(),
        Value::String(output_path(config, is_server)),
    );
    options.insert("name".into(), Value::String(config.images_name.clone()));
    options
}
