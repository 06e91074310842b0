//! Plugin configuration module.
//!
//! Handles the stock defaults, user overrides, and loading of `optimg.toml`.
//! Unlike a cascading config, overrides are **shallow**: every top-level key a
//! user sets replaces the stock value wholesale. Nested option bags (e.g.
//! `gifsicle`) are never merged key by key at this layer.
//!
//! ## Config File
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! optimize_images = true
//! optimize_images_in_dev = false
//! handle_images = ["jpeg", "png", "svg", "webp", "gif"]
//! images_folder = "images"
//! images_name = "[name]-[hash].[ext]"
//! remove_original_extension = false
//! inline_image_limit = 8192
//! default_image_loader = "img-loader"   # or "responsive-loader"
//!
//! [gifsicle]
//! interlaced = true
//! optimizationLevel = 3
//!
//! [svg_sprite_loader]
//! symbolId = "[name]-[hash:8]"
//! ```
//!
//! Option bags (`mozjpeg`, `optipng`, `pngquant`, `gifsicle`, `svgo`, `webp`,
//! `svg_sprite_loader`, `responsive`, `lqip`, `image_trace`) are handed to the
//! external tools verbatim, so their inner keys use whatever casing the tool
//! expects.
//!
//! Unknown top-level keys are kept in [`Configuration::extra`] and ignored by
//! rule assembly.

use crate::loaders::Options;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up by [`load_overrides`].
pub const CONFIG_FILENAME: &str = "optimg.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Which loader owns jpeg and png files when no resource query is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultImageLoader {
    /// Inline-or-file fallback chained with the optimizer.
    #[default]
    ImgLoader,
    /// Every jpeg/png goes through the responsive resizer.
    ResponsiveLoader,
}

/// Fully normalized plugin configuration.
///
/// Produced by [`normalize`]; every recognised key is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Optimize in production builds and exports.
    pub optimize_images: bool,
    /// Optimize while running the development server.
    pub optimize_images_in_dev: bool,
    /// Image types handled by this plugin (`jpeg`/`jpg`, `png`, `svg`, `webp`, `gif`, `ico`).
    pub handle_images: Vec<String>,
    /// Folder below `static/` that emitted files land in.
    pub images_folder: String,
    /// Output file naming template.
    pub images_name: String,
    /// For `?webp` conversions, drop the original extension instead of keeping it before `.webp`.
    pub remove_original_extension: bool,
    /// Files strictly smaller than this many bytes are inlined as data URIs.
    pub inline_image_limit: u64,
    pub default_image_loader: DefaultImageLoader,
    /// Overrides the computed public path for emitted files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_public_path: Option<String>,
    /// Overrides the computed output path for emitted files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_output_path: Option<String>,
    pub mozjpeg: Options,
    pub optipng: Options,
    pub pngquant: Options,
    pub gifsicle: Options,
    pub svgo: Options,
    pub webp: Options,
    pub svg_sprite_loader: Options,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsive: Option<Options>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lqip: Option<Options>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_trace: Option<Options>,
    /// Unrecognised top-level keys, passed through untouched.
    #[serde(flatten)]
    pub extra: Options,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            optimize_images: true,
            optimize_images_in_dev: false,
            handle_images: ["jpeg", "png", "svg", "webp", "gif"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            images_folder: "images".to_string(),
            images_name: "[name]-[hash].[ext]".to_string(),
            remove_original_extension: false,
            inline_image_limit: 8192,
            default_image_loader: DefaultImageLoader::ImgLoader,
            images_public_path: None,
            images_output_path: None,
            mozjpeg: Options::new(),
            optipng: Options::new(),
            pngquant: Options::new(),
            gifsicle: object(json!({ "interlaced": true, "optimizationLevel": 3 })),
            svgo: object(json!({ "plugins": [{ "name": "removeViewBox", "active": false }] })),
            webp: Options::new(),
            svg_sprite_loader: object(json!({ "symbolId": "[name]-[hash:8]" })),
            responsive: None,
            lqip: None,
            image_trace: None,
            extra: Options::new(),
        }
    }
}

impl Configuration {
    /// Option bag for an optimizer tool, keyed the way the tools are named
    /// without their `imagemin-` prefix (`mozjpeg`, `optipng`, ...).
    pub fn tool_options(&self, tool: &str) -> Options {
        match tool {
            "mozjpeg" => self.mozjpeg.clone(),
            "optipng" => self.optipng.clone(),
            "pngquant" => self.pngquant.clone(),
            "gifsicle" => self.gifsicle.clone(),
            "svgo" => self.svgo.clone(),
            "webp" => self.webp.clone(),
            other => match self.extra.get(other) {
                Some(Value::Object(map)) => map.clone(),
                _ => Options::new(),
            },
        }
    }
}

/// Partial user configuration. Every key that is `Some` replaces the stock value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub optimize_images: Option<bool>,
    pub optimize_images_in_dev: Option<bool>,
    pub handle_images: Option<Vec<String>>,
    pub images_folder: Option<String>,
    pub images_name: Option<String>,
    pub remove_original_extension: Option<bool>,
    pub inline_image_limit: Option<u64>,
    pub default_image_loader: Option<DefaultImageLoader>,
    pub images_public_path: Option<String>,
    pub images_output_path: Option<String>,
    pub mozjpeg: Option<Options>,
    pub optipng: Option<Options>,
    pub pngquant: Option<Options>,
    pub gifsicle: Option<Options>,
    pub svgo: Option<Options>,
    pub webp: Option<Options>,
    pub svg_sprite_loader: Option<Options>,
    pub responsive: Option<Options>,
    pub lqip: Option<Options>,
    pub image_trace: Option<Options>,
    #[serde(flatten)]
    pub extra: Options,
}

/// Lay user overrides over the stock defaults.
///
/// Last write wins per top-level key; nothing is validated and nothing fails.
pub fn normalize(overrides: &ConfigOverrides) -> Configuration {
    let base = Configuration::default();
    let o = overrides.clone();

    let mut extra = base.extra;
    extra.extend(o.extra);

    Configuration {
        optimize_images: o.optimize_images.unwrap_or(base.optimize_images),
        optimize_images_in_dev: o
            .optimize_images_in_dev
            .unwrap_or(base.optimize_images_in_dev),
        handle_images: o.handle_images.unwrap_or(base.handle_images),
        images_folder: o.images_folder.unwrap_or(base.images_folder),
        images_name: o.images_name.unwrap_or(base.images_name),
        remove_original_extension: o
            .remove_original_extension
            .unwrap_or(base.remove_original_extension),
        inline_image_limit: o.inline_image_limit.unwrap_or(base.inline_image_limit),
        default_image_loader: o.default_image_loader.unwrap_or(base.default_image_loader),
        images_public_path: o.images_public_path.or(base.images_public_path),
        images_output_path: o.images_output_path.or(base.images_output_path),
        mozjpeg: o.mozjpeg.unwrap_or(base.mozjpeg),
        optipng: o.optipng.unwrap_or(base.optipng),
        pngquant: o.pngquant.unwrap_or(base.pngquant),
        gifsicle: o.gifsicle.unwrap_or(base.gifsicle),
        svgo: o.svgo.unwrap_or(base.svgo),
        webp: o.webp.unwrap_or(base.webp),
        svg_sprite_loader: o.svg_sprite_loader.unwrap_or(base.svg_sprite_loader),
        responsive: o.responsive.or(base.responsive),
        lqip: o.lqip.or(base.lqip),
        image_trace: o.image_trace.or(base.image_trace),
        extra,
    }
}

/// Load `optimg.toml` from a directory as overrides.
///
/// Returns `Ok(None)` if no config file exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_overrides(dir: &Path) -> Result<Option<ConfigOverrides>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    load_overrides_file(&config_path).map(Some)
}

/// Load overrides from an explicit file path.
pub fn load_overrides_file(path: &Path) -> Result<ConfigOverrides, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// The stock configuration rendered as TOML.
pub fn stock_config_toml() -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(&Configuration::default())?)
}

fn object(value: Value) -> Options {
    match value {
        Value::Object(map) => map,
        _ => Options::new(),
    }
}
