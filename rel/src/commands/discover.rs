use crate::context::{AppContext, VerbosityLevel};
use crate::format;
use clap::Args;
use clap::builder::RangedU64ValueParser;
use librel::discover::until_cancelled;
use librel::reference::StoreLocator;
use librel::{
    Config, DiscoverOptions, Discoverer, FilterCriteria, OutputFormat, PlatformSelector,
    ReferrersStrategy, Result,
};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Arguments of `rel discover`
#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Subject reference (registry/repository:tag or registry/repository@digest;
    /// path:tag or path@digest with --oci-layout)
    pub subject: String,

    /// Output format: tree, table, json, yaml
    #[arg(short, long)]
    pub output: Option<OutputFormat>,

    /// Only show referrers with this artifact type
    #[arg(long)]
    pub artifact_type: Option<String>,

    /// Only show referrers for this platform (os[/arch[/variant]])
    #[arg(long)]
    pub platform: Option<PlatformSelector>,

    /// Read the subject from an OCI image layout directory
    #[arg(long)]
    pub oci_layout: bool,

    /// Referrers protocol: v1.1-referrers-api or v1.1-referrers-tag
    /// (default: try the API, fall back to the tag)
    #[arg(long, value_name = "SPEC")]
    pub distribution_spec: Option<ReferrersStrategy>,

    /// Contact the subject's registry over plain HTTP
    #[arg(long)]
    pub plain_http: bool,

    /// Maximum concurrent referrer fetches per level
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub concurrency: Option<usize>,

    /// Maximum depth of referrers of referrers
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_depth: Option<usize>,
}

impl DiscoverArgs {
    /// Apply CLI flag overrides (highest priority)
    pub fn apply_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(concurrency) = self.concurrency {
            config.discovery.concurrency = concurrency;
        }
        if let Some(max_depth) = self.max_depth {
            config.discovery.max_depth = max_depth;
        }
        if let Some(format) = self.output {
            config.output.format = format;
        }
        if self.plain_http && !self.oci_layout {
            let reference = Discoverer::parse_reference(&self.subject, false)?;
            if let StoreLocator::Registry { registry, .. } = reference.locator()
                && !config.network.is_plain_http(registry)
            {
                config.network.plain_http.push(registry.clone());
            }
        }
        Ok(())
    }

    /// Build discovery options from the resolved config
    pub fn options(&self, config: &Config, verbosity: VerbosityLevel) -> DiscoverOptions {
        let mut filter = FilterCriteria::new();
        if let Some(artifact_type) = &self.artifact_type {
            filter = filter.with_artifact_type(artifact_type.as_str());
        }
        if let Some(platform) = &self.platform {
            filter = filter.with_platform(platform.clone());
        }

        DiscoverOptions::new(config.output.format)
            .with_filter(filter)
            .with_verbose(verbosity.is_verbose())
            .with_strategy(self.distribution_spec)
    }
}

/// Run discovery and return the rendered output
pub async fn execute(ctx: &AppContext, args: &DiscoverArgs) -> Result<String> {
    let mut config = ctx.config.clone();
    args.apply_overrides(&mut config)?;
    let options = args.options(&config, ctx.verbosity);
    debug!(subject = %args.subject, format = %options.format, "Running discover");

    let reference = Discoverer::parse_reference(&args.subject, args.oci_layout)?;
    let report = Discoverer::new(config)
        .discover(&reference, &options)
        .await?;
    report.render()
}

/// Handle the discover command, returning the process exit code
pub async fn handle_discover(
    config_path: Option<&Path>,
    verbosity: VerbosityLevel,
    args: &DiscoverArgs,
) -> i32 {
    let ctx = match AppContext::build(config_path, verbosity) {
        Ok(ctx) => ctx,
        Err(e) => {
            format::error(&e.to_string());
            return 1;
        }
    };

    let result = until_cancelled(execute(&ctx, args), ctrl_c()).await;

    match result {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout
                .write_all(output.as_bytes())
                .and_then(|_| stdout.flush())
            {
                format::error(&format!("Failed to write output: {}", e));
                return 1;
            }
            0
        }
        Err(e) => {
            format::error(&e.to_string());
            1
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
#[path = "discover_tests.rs"]
mod tests;
