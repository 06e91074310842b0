//! Options for the icon sprite step (`svg-sprite-loader`).
//!
//! The sprite step imports a runtime generator module that wraps each symbol
//! for the page. This crate only names that module; the host integration
//! package must ship it under [`SVG_RUNTIME_GENERATOR`]. A project without it
//! points the step elsewhere with `runtimeGenerator` in the
//! `svg_sprite_loader` bag, which wins over the stock name.

use super::{Options, merge_options};
use crate::config::Configuration;
use serde_json::Value;

/// Runtime generator module the host integration package provides.
pub const SVG_RUNTIME_GENERATOR: &str = "optimg/svg-runtime-generator";

pub fn svg_sprite_loader_options(config: &Configuration) -> Options {
    let mut base = Options::new();
    base.insert(
        "runtimeGenerator".into(),
        Value::String(SVG_RUNTIME_GENERATOR.to_string()),
    );
    merge_options(&base, &config.svg_sprite_loader)
}
