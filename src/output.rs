//! Terminal output: the missing-optimizer advisory and CLI displays.
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and, where the library prints, a `print_*` wrapper that writes
//! to stdout. Format functions are pure.
//!
//! ## Rule summary
//!
//! ```text
//! 001 /\.(jpe?g|png|svg|gif)$/i (14 alternatives)
//!     ?url&original → file-loader
//!     ?url → file-loader → img-loader
//!     ...
//!     default → url-loader → img-loader
//! ```

use crate::loaders::url::Delivery;
use crate::loaders::{Options, StepKind};
use crate::rules::{Alternative, ProcessingRule};

const PREFIX: &str = "optimg >";

/// Advisory shown when optimization is wanted but nothing can optimize.
pub fn format_missing_optimizer_warning() -> Vec<String> {
    [
        "WARNING!",
        "No package found which can optimize images.",
        "All optimization is optional: install the optimizer packages for the formats you use",
        "(imagemin-mozjpeg, imagemin-optipng or imagemin-pngquant, imagemin-gifsicle,",
        "imagemin-svgo, webp-loader, lqip-loader).",
        "If this is on purpose, set `optimize_images = false` to hide this warning.",
    ]
    .iter()
    .map(|line| format!("{PREFIX} {line}"))
    .collect()
}

pub fn print_missing_optimizer_warning() {
    for line in format_missing_optimizer_warning() {
        println!("{}", line);
    }
}

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn chain(alternative: &Alternative) -> String {
    alternative.loader_names().join(" → ")
}

fn query_label(alternative: &Alternative) -> String {
    match &alternative.resource_query {
        Some(pattern) => format!("?{}", pattern.source()),
        None => "default".to_string(),
    }
}

/// One header per rule, one indented line per alternative.
pub fn format_rules_summary(rules: &[ProcessingRule]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, rule) in rules.iter().enumerate() {
        lines.push(format!(
            "{} {} ({} alternatives)",
            format_index(i + 1),
            rule.test,
            rule.one_of.len()
        ));
        for alternative in &rule.one_of {
            lines.push(format!(
                "    {} → {}",
                query_label(alternative),
                chain(alternative)
            ));
        }
    }
    lines
}

/// Which rule and chain an import request resolves to.
///
/// With a size, reports whether the inline-or-file step inlines it.
pub fn format_resolution(
    request: &str,
    resolved: Option<(&ProcessingRule, &Alternative)>,
    size: Option<u64>,
) -> Vec<String> {
    let Some((rule, alternative)) = resolved else {
        return vec![format!("{request}: not handled")];
    };
    let mut lines = vec![
        request.to_string(),
        format!("    Rule: {}", rule.test),
        format!("    Match: {}", query_label(alternative)),
        format!("    Chain: {}", chain(alternative)),
    ];
    if let Some(size) = size {
        let url_options: Option<&Options> = alternative
            .step(StepKind::Url)
            .and_then(|step| step.options.as_ref());
        let delivery = match url_options {
            Some(options) => Delivery::for_size(options, size),
            None if alternative.step(StepKind::Raw).is_some() => Delivery::Inline,
            None => Delivery::External,
        };
        let label = match delivery {
            Delivery::Inline => "inline",
            Delivery::External => "external file",
        };
        lines.push(format!("    Delivery ({size} bytes): {label}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{LoaderStep, Pattern};
    use serde_json::json;

    fn rule() -> ProcessingRule {
        let url = json!({ "limit": 100 }).as_object().cloned();
        ProcessingRule {
            test: Pattern::extensions(&["png"]).unwrap(),
            one_of: vec![
                Alternative::when_query(
                    Pattern::new("url").unwrap(),
                    vec![LoaderStep::new(StepKind::File, None)],
                ),
                Alternative::fallback(vec![
                    LoaderStep::new(StepKind::Url, url),
                    LoaderStep::new(StepKind::Img, None),
                ]),
            ],
        }
    }

    #[test]
    fn warning_lines_are_prefixed() {
        let lines = format_missing_optimizer_warning();
        assert!(lines.iter().all(|l| l.starts_with(PREFIX)));
        assert!(lines[0].ends_with("WARNING!"));
    }

    #[test]
    fn summary_lists_alternatives() {
        let lines = format_rules_summary(&[rule()]);
        assert_eq!(
            lines,
            vec![
                r"001 /\.(png)$/i (2 alternatives)",
                "    ?url → file-loader",
                "    default → url-loader → img-loader",
            ]
        );
    }

    #[test]
    fn resolution_with_size() {
        let rule = rule();
        let lines = format_resolution("a.png", Some((&rule, &rule.one_of[1])), Some(100));
        assert_eq!(lines[3], "    Chain: url-loader → img-loader");
        assert_eq!(lines[4], "    Delivery (100 bytes): external file");
        let lines = format_resolution("a.png", Some((&rule, &rule.one_of[1])), Some(99));
        assert_eq!(lines[4], "    Delivery (99 bytes): inline");
    }

    #[test]
    fn resolution_of_file_step_is_external() {
        let rule = rule();
        let lines = format_resolution("a.png?url", Some((&rule, &rule.one_of[0])), Some(1));
        assert_eq!(lines[4], "    Delivery (1 bytes): external file");
    }

    #[test]
    fn unhandled_request() {
        assert_eq!(
            format_resolution("a.txt", None, None),
            vec!["a.txt: not handled"]
        );
    }
}
