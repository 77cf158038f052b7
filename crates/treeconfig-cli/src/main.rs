//! treeconfig - resolve the effective CI config for a change event.
//!
//! One-shot front end for the resolution engine: reads the engine
//! configuration from flags or the `PLUGIN_*` environment variables,
//! builds a resolution request from the event arguments, and resolves it
//! against a checkout on disk. Prints the merged YAML document to stdout.

mod local;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use treeconfig::allowlist::slug_allowed;
use treeconfig::fragment::validate_fragment;
use treeconfig::{Repo, ResolutionRequest, Resolver, ResolverConfig, ScmClient};

use crate::local::LocalDirClient;

#[derive(Parser)]
#[command(name = "treeconfig")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Resolve the effective CI config for a repository change event")]
struct Cli {
    /// Merge every discovered config instead of only the nearest one
    #[arg(long, env = "PLUGIN_CONCAT")]
    concat: bool,

    /// Full-scan the tree when an event carries no changed files
    #[arg(long, env = "PLUGIN_FALLBACK")]
    fallback: bool,

    /// Full-scan the tree on every event
    #[arg(long, env = "PLUGIN_ALWAYS_RUN_ALL")]
    always_run_all: bool,

    /// Make a fragment named "finalize" depend on all other fragments
    #[arg(long, env = "PLUGIN_FINALIZE")]
    finalize: bool,

    /// Maximum recursion depth of the full scan
    #[arg(long, env = "PLUGIN_MAXDEPTH", default_value_t = 2)]
    max_depth: u32,

    /// Repository-relative path of the consider manifest
    #[arg(long, env = "PLUGIN_CONSIDER_FILE")]
    consider_file: Option<String>,

    /// Fall back to unrestricted discovery when the consider manifest
    /// cannot be fetched, instead of failing the resolution
    #[arg(long, env = "PLUGIN_CONSIDER_FILE_OPTIONAL")]
    consider_file_optional: bool,

    /// Result-cache TTL in seconds, 0 disables caching
    #[arg(long, env = "PLUGIN_CACHE_TTL", default_value_t = 0, value_name = "SECONDS")]
    cache_ttl: u64,

    /// Flat file of regex patterns selecting enabled repo slugs
    #[arg(long, env = "PLUGIN_ALLOW_LIST_FILE")]
    allow_list_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, env = "PLUGIN_DEBUG")]
    debug: bool,

    /// Checkout to resolve against
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Repository namespace (owner)
    #[arg(long)]
    namespace: String,

    /// Repository name
    #[arg(long)]
    name: String,

    /// Config file name to discover
    #[arg(long, default_value = ".drone.yml")]
    config_file: String,

    /// Default branch of the repository
    #[arg(long, default_value = "main")]
    branch: String,

    /// Revision before the change
    #[arg(long, default_value = "")]
    before: String,

    /// Revision after the change
    #[arg(long, default_value = "HEAD")]
    after: String,

    /// Full git ref of the event
    #[arg(long = "ref", default_value = "refs/heads/main")]
    ref_name: String,

    /// Event kind reported by the CI host
    #[arg(long, default_value = "push")]
    event: String,

    /// Trigger string, "@cron" for scheduled builds
    #[arg(long, default_value = "")]
    trigger: String,

    /// Author of the change
    #[arg(long, default_value = "")]
    author: String,

    /// Changed file, repeatable; answers the event's diff queries
    #[arg(long = "changed", value_name = "PATH")]
    changed: Vec<String>,
}

impl Cli {
    fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            concat: self.concat,
            fallback: self.fallback,
            always_run_all: self.always_run_all,
            finalize: self.finalize,
            max_depth: self.max_depth,
            consider_file: self.consider_file.clone(),
            consider_file_required: !self.consider_file_optional,
            cache_ttl: Duration::from_secs(self.cache_ttl),
            cache_errors: true,
        }
    }

    fn request(&self) -> ResolutionRequest {
        let slug = format!("{}/{}", self.namespace, self.name);
        ResolutionRequest {
            repo: Repo {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
                slug,
            },
            config_file: self.config_file.clone(),
            branch: self.branch.clone(),
            before: self.before.clone(),
            after: self.after.clone(),
            ref_name: self.ref_name.clone(),
            event: self.event.clone(),
            trigger: self.trigger.clone(),
            author: self.author.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let request = cli.request();
    let client = LocalDirClient::new(cli.root.clone(), cli.changed.clone());

    if !slug_allowed(cli.allow_list_file.as_deref(), &request.repo.slug) {
        // Bypassed repos get the host's default behavior: the top-level
        // config, still validated.
        info!(slug = %request.repo.slug, "repo not allow-listed, using top-level config");
        let raw = client
            .get_file_contents(&request.config_file, &request.after)
            .await?;
        validate_fragment(&request.config_file, &raw)?;
        print!("{raw}");
        return Ok(());
    }

    let resolver = Resolver::new(cli.resolver_config());
    let document = resolver.resolve(&client, &request).await?;
    print!("{document}");
    Ok(())
}
