//! Detection of optional processing tools installed next to the project.
//!
//! The rest of the crate only sees a [`Capabilities`] record: for each
//! optional capability, either the name (or package location) of the tool
//! that provides it, or `None`.
//!
//! | Capability | Tool(s), in priority order |
//! |---|---|
//! | `jpeg` | `imagemin-mozjpeg` |
//! | `png` | `imagemin-optipng`, `imagemin-pngquant` |
//! | `gif` | `imagemin-gifsicle` |
//! | `svg` | `imagemin-svgo` |
//! | `svg_sprite` | `svg-sprite-loader` |
//! | `webp` | `webp-loader` |
//! | `lqip` | `lqip-loader` |
//! | `responsive` | `responsive-loader` (records the package directory) |
//! | `responsive_adapter` | `sharp`, `jimp` (probed only when the resizer is present) |
//!
//! Probing is abstracted in two layers:
//! - [`ModuleResolver`]: the raw "is this module resolvable" primitive.
//!   [`NodeModuleResolver`] walks `node_modules` directories upward.
//! - [`CapabilityProvider`]: one method per capability. [`ProbingProvider`]
//!   answers from a resolver; [`Capabilities`] itself is a provider, so tests
//!   can hand any record to [`detect`] without touching the filesystem.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MOZJPEG: &str = "imagemin-mozjpeg";
pub const OPTIPNG: &str = "imagemin-optipng";
pub const PNGQUANT: &str = "imagemin-pngquant";
pub const GIFSICLE: &str = "imagemin-gifsicle";
pub const SVGO: &str = "imagemin-svgo";
pub const SVG_SPRITE_LOADER: &str = "svg-sprite-loader";
pub const WEBP_LOADER: &str = "webp-loader";
pub const LQIP_LOADER: &str = "lqip-loader";
pub const RESPONSIVE_LOADER: &str = "responsive-loader";
pub const SHARP: &str = "sharp";
pub const JIMP: &str = "jimp";

/// Modules probed up front, in no particular order.
const PROBED_MODULES: &[&str] = &[
    MOZJPEG,
    OPTIPNG,
    PNGQUANT,
    GIFSICLE,
    SVGO,
    SVG_SPRITE_LOADER,
    WEBP_LOADER,
    LQIP_LOADER,
    RESPONSIVE_LOADER,
];

/// Resizer backends, probed only once the resizer itself is found.
const BACKEND_MODULES: &[&str] = &[SHARP, JIMP];

/// Image-processing engine backing the responsive resizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizerBackend {
    Sharp,
    Jimp,
}

/// Which optional tools are available for this build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub jpeg: Option<String>,
    pub png: Option<String>,
    pub gif: Option<String>,
    pub svg: Option<String>,
    pub svg_sprite: Option<String>,
    pub webp: Option<String>,
    pub lqip: Option<String>,
    /// Package directory of the responsive resizer.
    pub responsive: Option<String>,
    pub responsive_adapter: Option<ResizerBackend>,
}

impl Capabilities {
    /// Nothing installed.
    pub fn none() -> Self {
        Self::default()
    }

    /// Number of detected tools that actually optimize images.
    ///
    /// The sprite combiner and the resizer do not count.
    pub fn optimizer_count(&self) -> usize {
        [
            &self.jpeg,
            &self.png,
            &self.gif,
            &self.svg,
            &self.webp,
            &self.lqip,
        ]
        .iter()
        .filter(|tool| tool.is_some())
        .count()
    }

    /// Whether any per-format optimizer used by the default chain is present.
    pub fn has_img_optimizer(&self) -> bool {
        self.jpeg.is_some() || self.png.is_some() || self.gif.is_some() || self.svg.is_some()
    }
}

/// Resolution primitive: where does `name` resolve to, if anywhere.
pub trait ModuleResolver: Sync {
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Node-style resolution: `<dir>/node_modules/<name>/package.json` for the
/// search path and each of its ancestors.
#[derive(Debug, Clone)]
pub struct NodeModuleResolver {
    root: PathBuf,
}

impl NodeModuleResolver {
    /// Resolve from `search_path`, or the current directory when none is given.
    pub fn new(search_path: Option<&Path>) -> Self {
        let root = match search_path {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        Self { root }
    }
}

impl ModuleResolver for NodeModuleResolver {
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.root
            .ancestors()
            .map(|dir| dir.join("node_modules").join(name))
            .find(|candidate| candidate.join("package.json").is_file())
    }
}

/// One query per capability. Each answers with the providing tool, or `None`.
pub trait CapabilityProvider {
    fn jpeg(&self) -> Option<String>;
    fn png(&self) -> Option<String>;
    fn gif(&self) -> Option<String>;
    fn svg(&self) -> Option<String>;
    fn svg_sprite(&self) -> Option<String>;
    fn webp(&self) -> Option<String>;
    fn lqip(&self) -> Option<String>;
    fn responsive(&self) -> Option<String>;
    fn responsive_adapter(&self) -> Option<ResizerBackend>;
}

impl CapabilityProvider for Capabilities {
    fn jpeg(&self) -> Option<String> {
        self.jpeg.clone()
    }
    fn png(&self) -> Option<String> {
        self.png.clone()
    }
    fn gif(&self) -> Option<String> {
        self.gif.clone()
    }
    fn svg(&self) -> Option<String> {
        self.svg.clone()
    }
    fn svg_sprite(&self) -> Option<String> {
        self.svg_sprite.clone()
    }
    fn webp(&self) -> Option<String> {
        self.webp.clone()
    }
    fn lqip(&self) -> Option<String> {
        self.lqip.clone()
    }
    fn responsive(&self) -> Option<String> {
        self.responsive.clone()
    }
    fn responsive_adapter(&self) -> Option<ResizerBackend> {
        self.responsive_adapter
    }
}

/// Provider backed by real resolution probes.
///
/// Modules are probed concurrently on construction, resizer backends in a
/// second round only when the resizer resolved; the capability queries then
/// only read the settled results. A failed probe is simply
/// an absent capability.
#[derive(Debug, Clone)]
pub struct ProbingProvider {
    found: HashMap<&'static str, PathBuf>,
}

impl ProbingProvider {
    pub fn new(resolver: &impl ModuleResolver) -> Self {
        let mut found = probe_all(resolver, PROBED_MODULES);
        if found.contains_key(RESPONSIVE_LOADER) {
            found.extend(probe_all(resolver, BACKEND_MODULES));
        }
        Self { found }
    }

    fn named(&self, name: &'static str) -> Option<String> {
        self.found.contains_key(name).then(|| name.to_string())
    }
}

fn probe_all(
    resolver: &impl ModuleResolver,
    names: &[&'static str],
) -> HashMap<&'static str, PathBuf> {
    names
        .par_iter()
        .filter_map(|&name| {
            let resolved = resolver.resolve(name);
            debug!(module = name, found = resolved.is_some(), "probed module");
            resolved.map(|path| (name, path))
        })
        .collect()
}

impl CapabilityProvider for ProbingProvider {
    fn jpeg(&self) -> Option<String> {
        self.named(MOZJPEG)
    }
    fn png(&self) -> Option<String> {
        self.named(OPTIPNG).or_else(|| self.named(PNGQUANT))
    }
    fn gif(&self) -> Option<String> {
        self.named(GIFSICLE)
    }
    fn svg(&self) -> Option<String> {
        self.named(SVGO)
    }
    fn svg_sprite(&self) -> Option<String> {
        self.named(SVG_SPRITE_LOADER)
    }
    fn webp(&self) -> Option<String> {
        self.named(WEBP_LOADER)
    }
    fn lqip(&self) -> Option<String> {
        self.named(LQIP_LOADER)
    }
    fn responsive(&self) -> Option<String> {
        self.found
            .get(RESPONSIVE_LOADER)
            .map(|path| path.to_string_lossy().into_owned())
    }
    fn responsive_adapter(&self) -> Option<ResizerBackend> {
        if self.found.contains_key(SHARP) {
            Some(ResizerBackend::Sharp)
        } else if self.found.contains_key(JIMP) {
            Some(ResizerBackend::Jimp)
        } else {
            None
        }
    }
}

/// Collect a capability record from a provider.
///
/// The resizer backend is only consulted when the resizer itself is present.
pub fn detect(provider: &impl CapabilityProvider) -> Capabilities {
    let responsive = provider.responsive();
    let responsive_adapter = if responsive.is_some() {
        provider.responsive_adapter()
    } else {
        None
    };

    Capabilities {
        jpeg: provider.jpeg(),
        png: provider.png(),
        gif: provider.gif(),
        svg: provider.svg(),
        svg_sprite: provider.svg_sprite(),
        webp: provider.webp(),
        lqip: provider.lqip(),
        responsive,
        responsive_adapter,
    }
}

/// Probe the filesystem from `search_path` (or the current directory).
pub fn detect_installed(search_path: Option<&Path>) -> Capabilities {
    let resolver = NodeModuleResolver::new(search_path);
    detect(&ProbingProvider::new(&resolver))
}
