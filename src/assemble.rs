//! Rule-set assembly for one build invocation.
//!
//! Order of the returned rules:
//!
//! 1. The responsive resizer rule, when it is the nominated default loader
//!    (jpeg and png are then claimed away from the default family).
//! 2. One rule per still-dispatched family, in [`FAMILY_ORDER`].
//!
//! Capability absence never fails assembly; it only removes optimizer steps.
//! The one failure is a detected optimizer that cannot be loaded.

use crate::capability::Capabilities;
use crate::config::{Configuration, DefaultImageLoader};
use crate::dispatch::{
    FAMILY_ORDER, HandledTypes, RuleInputs, build_family_rule, build_responsive_rule,
};
use crate::host::HostConfig;
use crate::loaders::StepOptions;
use crate::optimizer::{LoadError, ModuleLoader, OptimizerSet};
use crate::policy::{BuildContext, should_optimize_now};
use crate::rules::ProcessingRule;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("incompatible host integration: {0}")]
    IncompatibleHost(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Assemble the ordered rule list for this build.
pub fn assemble(
    config: &Configuration,
    capabilities: &Capabilities,
    context: &BuildContext,
    host: &HostConfig,
    loader: &dyn ModuleLoader,
) -> Result<Vec<ProcessingRule>, AssembleError> {
    let optimize = should_optimize_now(
        config.optimize_images,
        config.optimize_images_in_dev,
        context,
    );
    let step_options = StepOptions::new(config, host, context.is_server, capabilities);
    let optimizers = if optimize && capabilities.has_img_optimizer() {
        OptimizerSet::resolve(config, capabilities, loader)?
    } else {
        OptimizerSet::default()
    };
    let inputs = RuleInputs {
        config,
        capabilities,
        step_options: &step_options,
        optimizers: &optimizers,
        optimize,
    };

    let handled = HandledTypes::from_config(config);
    let mut dispatched = handled;
    let mut rules = Vec::new();

    if config.default_image_loader == DefaultImageLoader::ResponsiveLoader {
        debug!("responsive resizer claims jpeg and png");
        dispatched = handled.without_raster();
        rules.push(build_responsive_rule(&inputs));
    }

    rules.extend(
        FAMILY_ORDER
            .iter()
            .filter_map(|&family| build_family_rule(family, &inputs, &dispatched)),
    );

    info!(
        rules = rules.len(),
        optimize,
        server = context.is_server,
        "assembled image rules"
    );
    Ok(rules)
}
