//! Per-family rule building.
//!
//! Handled image types are grouped into families, each producing at most one
//! [`ProcessingRule`]:
//!
//! | Family | Types | Optimizer step |
//! |---|---|---|
//! | [`ImageFamily::Default`] | jpeg, png, svg, gif | `img-loader` |
//! | [`ImageFamily::Webp`] | webp | `webp-loader` |
//! | [`ImageFamily::Icon`] | ico | none, passthrough to a file |
//!
//! A rule's alternatives are the resource-query table, then the family's
//! extra queries (`?webp` conversion, `?sprite`), then the fallback that
//! inlines below the size limit and emits a file otherwise. Optimization is
//! active for a family only when the build optimizes now AND a tool for the
//! family is installed.
//!
//! The responsive resizer, when nominated as the default loader, gets its
//! own rule and claims jpeg and png away from the default family.

use crate::capability::Capabilities;
use crate::config::Configuration;
use crate::loaders::{Options, StepKind, StepOptions, sprite, webp};
use crate::optimizer::OptimizerSet;
use crate::query::resolve_query_rules;
use crate::rules::{Alternative, LoaderStep, Pattern, ProcessingRule};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Which image types a build dispatches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HandledTypes {
    pub jpeg: bool,
    pub png: bool,
    pub svg: bool,
    pub webp: bool,
    pub gif: bool,
    pub ico: bool,
}

impl HandledTypes {
    /// Read `handle_images`; `jpg` is accepted as an alias for `jpeg`.
    /// Unknown names are ignored.
    pub fn from_config(config: &Configuration) -> Self {
        let has = |name: &str| config.handle_images.iter().any(|h| h == name);
        Self {
            jpeg: has("jpeg") || has("jpg"),
            png: has("png"),
            svg: has("svg"),
            webp: has("webp"),
            gif: has("gif"),
            ico: has("ico"),
        }
    }

    /// Hand jpeg and png to another primary loader.
    pub fn without_raster(self) -> Self {
        Self {
            jpeg: false,
            png: false,
            ..self
        }
    }

    /// Extensions as they appear on disk, for exclusion lists.
    pub fn file_extensions(&self) -> Vec<&'static str> {
        let mut extensions = Vec::new();
        if self.jpeg {
            extensions.extend(["jpg", "jpeg"]);
        }
        for (handled, ext) in [
            (self.png, "png"),
            (self.svg, "svg"),
            (self.webp, "webp"),
            (self.gif, "gif"),
            (self.ico, "ico"),
        ] {
            if handled {
                extensions.push(ext);
            }
        }
        extensions
    }

    fn default_family_patterns(&self) -> Vec<&'static str> {
        [
            (self.jpeg, "jpe?g"),
            (self.png, "png"),
            (self.svg, "svg"),
            (self.gif, "gif"),
        ]
        .into_iter()
        .filter_map(|(handled, pattern)| handled.then_some(pattern))
        .collect()
    }
}

/// A group of image types sharing one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFamily {
    Default,
    Webp,
    Icon,
}

/// Order in which family rules are appended.
pub const FAMILY_ORDER: [ImageFamily; 3] =
    [ImageFamily::Default, ImageFamily::Webp, ImageFamily::Icon];

/// Everything rule building reads, computed once per build.
pub struct RuleInputs<'a> {
    pub config: &'a Configuration,
    pub capabilities: &'a Capabilities,
    pub step_options: &'a StepOptions,
    pub optimizers: &'a OptimizerSet,
    /// Whether this invocation optimizes at all.
    pub optimize: bool,
}

/// Build the rule for one family, or `None` when it is not dispatched.
pub fn build_family_rule(
    family: ImageFamily,
    inputs: &RuleInputs<'_>,
    types: &HandledTypes,
) -> Option<ProcessingRule> {
    match family {
        ImageFamily::Default => build_default_rule(inputs, types),
        ImageFamily::Webp => types.webp.then(|| build_webp_rule(inputs)),
        ImageFamily::Icon => types.ico.then(|| build_passthrough_rule(inputs)),
    }
}

/// Rule for jpeg/png/svg/gif through the default chain.
pub fn build_default_rule(inputs: &RuleInputs<'_>, types: &HandledTypes) -> Option<ProcessingRule> {
    let patterns = types.default_family_patterns();
    if patterns.is_empty() {
        return None;
    }

    let active = inputs.optimize && inputs.capabilities.has_img_optimizer();
    let img_step = LoaderStep::new(
        StepKind::Img,
        Some(if active {
            inputs.optimizers.img_loader_options()
        } else {
            OptimizerSet::default().img_loader_options()
        }),
    );
    debug!(extensions = ?patterns, optimize = active, "building default image rule");

    let mut one_of = resolve_query_rules(inputs.step_options, active.then_some(&img_step));

    if types.webp && (types.jpeg || types.png) {
        one_of.push(webp_conversion(inputs));
    }

    if types.svg && inputs.capabilities.svg_sprite.is_some() {
        let mut steps = vec![LoaderStep::new(
            StepKind::SvgSprite,
            Some(sprite::svg_sprite_loader_options(inputs.config)),
        )];
        if active && inputs.capabilities.svg.is_some() {
            steps.push(img_step.clone());
        }
        one_of.push(Alternative::when_query(Pattern::fixed("sprite"), steps));
    }

    one_of.push(fallback(inputs, active.then_some(img_step)));

    Some(ProcessingRule {
        test: Pattern::fixed_extensions(&patterns),
        one_of,
    })
}

/// Rule for webp sources, optimized by the webp converter itself.
pub fn build_webp_rule(inputs: &RuleInputs<'_>) -> ProcessingRule {
    let active = inputs.optimize && inputs.capabilities.webp.is_some();
    let webp_step = LoaderStep::new(
        StepKind::Webp,
        Some(webp::webp_loader_options(inputs.config)),
    );
    debug!(optimize = active, "building webp rule");

    let mut one_of = resolve_query_rules(inputs.step_options, active.then_some(&webp_step));
    one_of.push(fallback(inputs, active.then_some(webp_step)));

    ProcessingRule {
        test: Pattern::fixed_extensions(&["webp"]),
        one_of,
    }
}

/// Rule for formats nothing can optimize: always emit a file.
pub fn build_passthrough_rule(inputs: &RuleInputs<'_>) -> ProcessingRule {
    ProcessingRule {
        test: Pattern::fixed_extensions(&["ico"]),
        one_of: vec![Alternative::fallback(vec![LoaderStep::new(
            StepKind::File,
            Some(inputs.step_options.file.clone()),
        )])],
    }
}

/// Rule routing every jpeg/png through the responsive resizer.
pub fn build_responsive_rule(inputs: &RuleInputs<'_>) -> ProcessingRule {
    ProcessingRule {
        test: Pattern::fixed_extensions(&["jpe?g", "png"]),
        one_of: vec![Alternative::fallback(vec![LoaderStep::new(
            StepKind::Responsive,
            Some(inputs.step_options.responsive.clone()),
        )])],
    }
}

/// `?webp`: convert a jpeg/png to webp under a webp file name.
fn webp_conversion(inputs: &RuleInputs<'_>) -> Alternative {
    let mut url_options: Options = inputs.step_options.url.clone();
    let name = webp::webp_output_name(
        &inputs.config.images_name,
        inputs.config.remove_original_extension,
    );
    url_options.insert("name".into(), Value::String(name));
    url_options.insert("mimetype".into(), Value::String("image/webp".into()));

    Alternative::when_query(
        Pattern::fixed("webp"),
        vec![
            LoaderStep::new(StepKind::Url, Some(url_options)),
            LoaderStep::new(
                StepKind::Webp,
                Some(webp::webp_loader_options(inputs.config)),
            ),
        ],
    )
}

/// Inline below the limit, external file at or above it.
fn fallback(inputs: &RuleInputs<'_>, optimizer: Option<LoaderStep>) -> Alternative {
    let mut steps = vec![LoaderStep::new(
        StepKind::Url,
        Some(inputs.step_options.url.clone()),
    )];
    steps.extend(optimizer);
    Alternative::fallback(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{MOZJPEG, SVG_SPRITE_LOADER, SVGO, WEBP_LOADER};
    use crate::test_helpers::{fallback_of, find_query, step_options};

    struct Fixture {
        config: Configuration,
        capabilities: Capabilities,
        step_options: StepOptions,
        optimizers: OptimizerSet,
    }

    impl Fixture {
        fn new(handle: &[&str], capabilities: Capabilities) -> Self {
            let config = Configuration {
                handle_images: handle.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            };
            Self {
                config,
                capabilities,
                step_options: step_options(),
                optimizers: OptimizerSet {
                    plugins: vec![serde_json::json!({ "plugin": "stub" })],
                },
            }
        }

        fn inputs(&self, optimize: bool) -> RuleInputs<'_> {
            RuleInputs {
                config: &self.config,
                capabilities: &self.capabilities,
                step_options: &self.step_options,
                optimizers: &self.optimizers,
                optimize,
            }
        }

        fn types(&self) -> HandledTypes {
            HandledTypes::from_config(&self.config)
        }
    }

    #[test]
    fn jpg_is_an_alias_for_jpeg() {
        let fixture = Fixture::new(&["jpg"], Capabilities::none());
        assert!(fixture.types().jpeg);
    }

    #[test]
    fn extension_pattern_follows_enabled_types() {
        let fixture = Fixture::new(&["png", "gif"], Capabilities::none());
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        assert_eq!(rule.test.to_string(), r"/\.(png|gif)$/i");
    }

    #[test]
    fn no_default_types_no_rule() {
        let fixture = Fixture::new(&["webp", "ico"], Capabilities::none());
        assert!(build_default_rule(&fixture.inputs(true), &fixture.types()).is_none());
    }

    #[test]
    fn claimed_raster_leaves_svg_and_gif() {
        let fixture = Fixture::new(&["jpeg", "png", "svg", "gif"], Capabilities::none());
        let types = fixture.types().without_raster();
        let rule = build_default_rule(&fixture.inputs(true), &types).unwrap();
        assert_eq!(rule.test.to_string(), r"/\.(svg|gif)$/i");
        assert!(!rule.test.is_match("a.png"));
        assert!(!rule.test.is_match("a.jpg"));
    }

    #[test]
    fn fallback_without_optimizer_capability() {
        let fixture = Fixture::new(&["png"], Capabilities::none());
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        let fallback = fallback_of(&rule);
        assert!(std::ptr::eq(fallback, rule.one_of.last().unwrap()));
        assert_eq!(fallback.loader_names(), vec!["url-loader"]);
    }

    #[test]
    fn fallback_with_optimizer_when_optimizing() {
        let caps = Capabilities {
            jpeg: Some(MOZJPEG.into()),
            ..Capabilities::none()
        };
        let fixture = Fixture::new(&["jpeg"], caps);
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        let fallback = rule.one_of.last().unwrap();
        assert_eq!(fallback.loader_names(), vec!["url-loader", "img-loader"]);
        let plugins = &fallback.steps[1].options.as_ref().unwrap()["plugins"];
        assert_eq!(plugins.as_array().unwrap().len(), 1);
    }

    #[test]
    fn not_optimizing_drops_optimizer_everywhere() {
        let caps = Capabilities {
            jpeg: Some(MOZJPEG.into()),
            ..Capabilities::none()
        };
        let fixture = Fixture::new(&["jpeg"], caps);
        let rule = build_default_rule(&fixture.inputs(false), &fixture.types()).unwrap();
        assert!(
            rule.one_of
                .iter()
                .all(|alt| alt.step(StepKind::Img).is_none())
        );
    }

    #[test]
    fn webp_query_follows_handled_types_not_converter() {
        let fixture = Fixture::new(&["jpeg", "webp"], Capabilities::none());
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        let webp = find_query(&rule, "/webp/").unwrap();
        assert_eq!(webp.loader_names(), vec!["url-loader", "webp-loader"]);
        let url = webp.steps[0].options.as_ref().unwrap();
        assert_eq!(url["name"], "[name]-[hash].[ext].webp");
        assert_eq!(url["mimetype"], "image/webp");

        let fixture = Fixture::new(&["jpeg"], Capabilities::none());
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        assert!(find_query(&rule, "/webp/").is_none());

        let fixture = Fixture::new(&["svg", "webp"], Capabilities::none());
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        assert!(find_query(&rule, "/webp/").is_none());
    }

    #[test]
    fn webp_query_respects_remove_original_extension() {
        let caps = Capabilities {
            webp: Some(WEBP_LOADER.into()),
            ..Capabilities::none()
        };
        let mut fixture = Fixture::new(&["png", "webp"], caps);
        fixture.config.remove_original_extension = true;
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        let webp = find_query(&rule, "/webp/").unwrap();
        assert_eq!(
            webp.steps[0].options.as_ref().unwrap()["name"],
            "[name]-[hash].webp"
        );
    }

    #[test]
    fn sprite_precedes_fallback_and_optimizes_svg() {
        let caps = Capabilities {
            svg: Some(SVGO.into()),
            svg_sprite: Some(SVG_SPRITE_LOADER.into()),
            ..Capabilities::none()
        };
        let fixture = Fixture::new(&["svg"], caps);
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        let n = rule.one_of.len();
        let sprite = &rule.one_of[n - 2];
        assert_eq!(sprite.resource_query.as_ref().unwrap().to_string(), "/sprite/");
        assert_eq!(sprite.loader_names(), vec!["svg-sprite-loader", "img-loader"]);
    }

    #[test]
    fn sprite_absent_without_combiner() {
        let fixture = Fixture::new(&["svg"], Capabilities::none());
        let rule = build_default_rule(&fixture.inputs(true), &fixture.types()).unwrap();
        assert!(find_query(&rule, "/sprite/").is_none());
    }

    #[test]
    fn webp_rule_optimizes_with_converter() {
        let caps = Capabilities {
            webp: Some(WEBP_LOADER.into()),
            ..Capabilities::none()
        };
        let fixture = Fixture::new(&["webp"], caps);
        let rule = build_webp_rule(&fixture.inputs(true));
        assert_eq!(rule.test.to_string(), r"/\.(webp)$/i");
        assert_eq!(
            rule.one_of.last().unwrap().loader_names(),
            vec!["url-loader", "webp-loader"]
        );
    }

    #[test]
    fn webp_rule_degrades_without_converter() {
        let fixture = Fixture::new(&["webp"], Capabilities::none());
        let rule = build_webp_rule(&fixture.inputs(true));
        assert_eq!(rule.one_of.last().unwrap().loader_names(), vec!["url-loader"]);
    }

    #[test]
    fn passthrough_emits_file() {
        let fixture = Fixture::new(&["ico"], Capabilities::none());
        let rule = build_family_rule(ImageFamily::Icon, &fixture.inputs(true), &fixture.types())
            .unwrap();
        assert_eq!(rule.one_of.len(), 1);
        assert_eq!(rule.one_of[0].loader_names(), vec!["file-loader"]);
    }

    #[test]
    fn disabled_family_has_no_rule() {
        let fixture = Fixture::new(&["png"], Capabilities::none());
        let inputs = fixture.inputs(true);
        assert!(build_family_rule(ImageFamily::Webp, &inputs, &fixture.types()).is_none());
        assert!(build_family_rule(ImageFamily::Icon, &inputs, &fixture.types()).is_none());
    }

    #[test]
    fn file_extensions_for_exclusion() {
        let fixture = Fixture::new(&["jpeg", "svg", "ico"], Capabilities::none());
        assert_eq!(fixture.types().file_extensions(), vec!["jpg", "jpeg", "svg", "ico"]);
    }
}
