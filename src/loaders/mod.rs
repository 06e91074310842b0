//! Option builders for the external processing steps.
//!
//! Every step the assembled rules can name is a [`StepKind`]. Each kind has
//! a thin builder in a submodule that derives its option payload from the
//! normalized [`Configuration`](crate::config::Configuration) and the build
//! context. [`StepOptions`] computes all of them once per build so the
//! resource-query table never recomputes payloads per rule.
//!
//! | Step | Builder |
//! |---|---|
//! | `file-loader` | [`file::file_loader_options`] |
//! | `url-loader` | [`url::url_loader_options`] |
//! | `lqip-loader` | [`lqip::lqip_loader_options`] |
//! | `image-trace-loader` | [`lqip::image_trace_loader_options`] |
//! | `responsive-loader` | [`responsive::responsive_loader_options`] |
//! | `webp-loader` | [`webp::webp_loader_options`] |
//! | `svg-sprite-loader` | [`sprite::svg_sprite_loader_options`] |

pub mod file;
pub mod lqip;
pub mod responsive;
pub mod sprite;
pub mod url;
pub mod webp;

use crate::capability::Capabilities;
use crate::config::Configuration;
use crate::host::HostConfig;
use serde_json::Value;

/// Option bag handed to a processing step.
pub type Options = serde_json::Map<String, Value>;

/// A named external processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    File,
    Url,
    Raw,
    LqipPictureExport,
    LqipColorsExport,
    Lqip,
    Responsive,
    ImageTrace,
    Img,
    Webp,
    SvgSprite,
}

impl StepKind {
    /// Name the host resolves the step by.
    pub fn loader_name(self) -> &'static str {
        match self {
            StepKind::File => "file-loader",
            StepKind::Url => "url-loader",
            StepKind::Raw => "raw-loader",
            StepKind::LqipPictureExport => "lqip-loader/picture-export-loader",
            StepKind::LqipColorsExport => "lqip-loader/colors-export-loader",
            StepKind::Lqip => "lqip-loader",
            StepKind::Responsive => "responsive-loader",
            StepKind::ImageTrace => "image-trace-loader",
            StepKind::Img => "img-loader",
            StepKind::Webp => "webp-loader",
            StepKind::SvgSprite => "svg-sprite-loader",
        }
    }
}

/// Shallow merge: overlay keys replace base keys, `null` removes the key.
pub fn merge_options(base: &Options, overlay: &Options) -> Options {
    let mut merged = base.clone();
    for (key, value) in overlay {
        if value.is_null() {
            merged.remove(key);
        } else {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Per-build option payloads for every step that has one.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOptions {
    pub file: Options,
    pub url: Options,
    pub lqip: Options,
    pub responsive: Options,
    pub image_trace: Options,
}

impl StepOptions {
    pub fn new(
        config: &Configuration,
        host: &HostConfig,
        is_server: bool,
        capabilities: &Capabilities,
    ) -> Self {
        Self {
            file: file::file_loader_options(config, host, is_server),
            url: url::url_loader_options(config, host, is_server),
            lqip: lqip::lqip_loader_options(config, host, is_server),
            responsive: responsive::responsive_loader_options(
                config,
                host,
                is_server,
                capabilities,
            ),
            image_trace: lqip::image_trace_loader_options(config),
        }
    }

    /// Computed payload for a step, if it has one.
    pub fn get(&self, kind: StepKind) -> Option<&Options> {
        match kind {
            StepKind::File => Some(&self.file),
            StepKind::Url => Some(&self.url),
            StepKind::Lqip => Some(&self.lqip),
            StepKind::Responsive => Some(&self.responsive),
            StepKind::ImageTrace => Some(&self.image_trace),
            _ => None,
        }
    }
}
