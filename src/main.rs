use clap::{Args, Parser, Subcommand};
use optimg::capability::{NodeModuleResolver, detect_installed};
use optimg::config::{self, ConfigOverrides};
use optimg::host::HostConfig;
use optimg::optimizer::PluginDescriptorLoader;
use optimg::policy::{BuildContext, BuildPhase};
use optimg::rules::resolve_request;
use optimg::{assemble, normalize, output};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "optimg")]
#[command(version, about = "Image loader rule composition for bundler builds")]
#[command(long_about = "\
Image loader rule composition for bundler builds

Decides which processing chain every image import goes through, based on
file type, resource query (?url, ?inline, ?lqip, ?webp, ...), build context,
and which optional optimizer packages are installed in node_modules.

Settings are read from optimg.toml in the project directory. Only the keys
you set override the stock values; each key replaces its default wholesale.

Run 'optimg gen-config' to print the stock configuration.")]
struct Cli {
    /// Show debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: optimg.toml in the project directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Project directory probed for node_modules
    #[arg(long, default_value = ".", global = true)]
    search_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Flags describing the build invocation.
#[derive(Args, Clone)]
struct ContextArgs {
    /// Assemble for the server bundle
    #[arg(long)]
    server: bool,

    /// Assemble for a development build
    #[arg(long)]
    dev: bool,

    /// Build phase named by a composition layer (e.g. phase-production-build)
    #[arg(long)]
    phase: Option<String>,

    /// CDN prefix for emitted assets
    #[arg(long)]
    asset_prefix: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble and print the rule list for a build as JSON
    Rules {
        /// Print one line per alternative instead of JSON
        #[arg(long)]
        summary: bool,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Report which optional tools are installed
    Detect,
    /// Show which rule and chain an import request resolves to
    Explain {
        /// Import request, e.g. images/hero.png?lqip
        request: String,
        /// File size in bytes, to report inline vs external delivery
        #[arg(long)]
        size: Option<u64>,
        #[command(flatten)]
        context: ContextArgs,
    },
    /// Print the stock optimg.toml with every option
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Rules { summary, context } => {
            let rules = build_rules(&cli, context)?;
            if *summary {
                for line in output::format_rules_summary(&rules) {
                    println!("{}", line);
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&rules)?);
            }
        }
        Command::Detect => {
            let capabilities = detect_installed(Some(cli.search_path.as_path()));
            println!("{}", serde_json::to_string_pretty(&capabilities)?);
        }
        Command::Explain {
            request,
            size,
            context,
        } => {
            let rules = build_rules(&cli, context)?;
            let resolved = resolve_request(&rules, request);
            for line in output::format_resolution(request, resolved, *size) {
                println!("{}", line);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml()?);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn load_overrides(cli: &Cli) -> Result<ConfigOverrides, config::ConfigError> {
    match &cli.config {
        Some(path) => config::load_overrides_file(path),
        None => Ok(config::load_overrides(&cli.search_path)?.unwrap_or_default()),
    }
}

fn build_rules(
    cli: &Cli,
    args: &ContextArgs,
) -> Result<Vec<optimg::ProcessingRule>, Box<dyn std::error::Error>> {
    let configuration = normalize(&load_overrides(cli)?);
    let search_path: &Path = &cli.search_path;
    let capabilities = detect_installed(Some(search_path));
    debug!(?capabilities, "detected capabilities");

    let context = BuildContext {
        is_server: args.server,
        is_development: args.dev,
        phase: args.phase.as_deref().map(BuildPhase::parse),
    };
    let host = HostConfig {
        asset_prefix: args.asset_prefix.clone(),
        image_loader_search_path: Some(search_path.to_path_buf()),
        rule_hook: None,
    };
    let loader = PluginDescriptorLoader::new(NodeModuleResolver::new(Some(search_path)));

    Ok(assemble(
        &configuration,
        &capabilities,
        &context,
        &host,
        &loader,
    )?)
}
