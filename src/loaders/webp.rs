//! Options for the webp conversion step and output-name derivation.

use super::Options;
use crate::config::Configuration;

pub fn webp_loader_options(config: &Configuration) -> Options {
    config.webp.clone()
}

/// Output name for an image converted to webp.
///
/// The `[ext]` token becomes `webp` (or `[ext].webp` when the original
/// extension is kept). Templates without the token get `.webp` appended.
pub fn webp_output_name(template: &str, remove_original_extension: bool) -> String {
    if template.contains("[ext]") {
        let replacement = if remove_original_extension {
            "webp"
        } else {
            "[ext].webp"
        };
        template.replacen("[ext]", replacement, 1)
    } else {
        format!("{template}.webp")
    }
}
