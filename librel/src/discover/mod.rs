//! High-level discovery API.
//!
//! [`Discoverer`] runs the whole pipeline for one subject: parse the
//! reference, open the store it points at, resolve the subject, build the
//! referrer graph and hand it to a renderer.
//!
//! # Examples
//!
//! ```no_run
//! use librel::{Config, DiscoverOptions, Discoverer, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discoverer = Discoverer::new(Config::default());
//!     let reference = Discoverer::parse_reference("localhost:5000/foobar:v1", false)?;
//!     let options = DiscoverOptions::new(OutputFormat::Tree);
//!
//!     let report = discoverer.discover(&reference, &options).await?;
//!     print!("{}", report.render()?);
//!     Ok(())
//! }
//! ```

use crate::auth::Credentials;
use crate::config::Config;
use crate::error::{RelError, Result};
use crate::fetcher::{ReferrerFetcher, ReferrersStrategy};
use crate::filter::FilterCriteria;
use crate::graph::{GraphBuilder, ReferrerGraph};
use crate::oci::{Descriptor, digest_of};
use crate::reference::{StoreLocator, SubjectReference};
use crate::render::{OutputFormat, RenderContext, renderer_for};
use crate::store::{OciLayoutStore, RemoteStore, Store};
use std::future::Future;
use tracing::debug;

/// What to discover and how to present it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverOptions {
    /// Output format; also decides how deep discovery goes.
    pub format: OutputFormat,
    /// Which referrers to emit.
    pub filter: FilterCriteria,
    /// Include annotations in tree and table output.
    pub verbose: bool,
    /// Referrers protocol to use; detected on the first fetch when unset.
    pub strategy: Option<ReferrersStrategy>,
}

impl DiscoverOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            filter: FilterCriteria::new(),
            verbose: false,
            strategy: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterCriteria) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Forces the referrers protocol instead of probing the store.
    pub fn with_strategy(mut self, strategy: Option<ReferrersStrategy>) -> Self {
        self.strategy = strategy;
        self
    }
}

/// The outcome of one discovery.
#[derive(Debug)]
pub struct DiscoveryReport {
    canonical: String,
    graph: ReferrerGraph,
    strategy: Option<ReferrersStrategy>,
    options: DiscoverOptions,
}

impl DiscoveryReport {
    /// The subject reference pinned to the resolved digest.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// The resolved subject.
    pub fn subject(&self) -> &Descriptor {
        self.graph.subject()
    }

    /// The unfiltered referrer graph.
    pub fn graph(&self) -> &ReferrerGraph {
        &self.graph
    }

    /// How referrers were listed; `None` if no listing was needed.
    pub fn strategy(&self) -> Option<ReferrersStrategy> {
        self.strategy
    }

    /// Renders the report in the requested format.
    pub fn render(&self) -> Result<String> {
        let ctx = RenderContext {
            graph: &self.graph,
            filter: &self.options.filter,
            subject: &self.canonical,
        };
        renderer_for(self.options.format, self.options.verbose).render(&ctx)
    }
}

/// Entry point for referrer discovery.
pub struct Discoverer {
    config: Config,
    credentials: Credentials,
}

impl Discoverer {
    /// Creates a discoverer using the credentials from `config`.
    pub fn new(config: Config) -> Self {
        let credentials = config.credentials.to_credentials();
        Self {
            config,
            credentials,
        }
    }

    /// Replaces the credentials used for remote registries.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parses a subject as a registry reference, or as a layout reference
    /// when `layout` is set.
    pub fn parse_reference(subject: &str, layout: bool) -> Result<SubjectReference> {
        if layout {
            SubjectReference::parse_layout(subject)
        } else {
            SubjectReference::parse_remote(subject)
        }
    }

    /// Opens the store a reference points at.
    pub async fn open_store(&self, reference: &SubjectReference) -> Result<Box<dyn Store>> {
        match reference.locator() {
            StoreLocator::Registry {
                registry,
                repository,
            } => {
                let store = RemoteStore::new(
                    registry,
                    repository,
                    self.credentials.clone(),
                    self.config.network.client_config(),
                    self.config.network.is_plain_http(registry),
                )?;
                Ok(Box::new(store))
            }
            StoreLocator::Layout { path } => Ok(Box::new(OciLayoutStore::open(path).await?)),
        }
    }

    /// Opens the subject's store and discovers its referrers.
    pub async fn discover(
        &self,
        reference: &SubjectReference,
        options: &DiscoverOptions,
    ) -> Result<DiscoveryReport> {
        let store = self.open_store(reference).await?;
        self.discover_in(store.as_ref(), reference, options).await
    }

    /// Discovers the referrers of `reference` in an already opened store.
    pub async fn discover_in(
        &self,
        store: &dyn Store,
        reference: &SubjectReference,
        options: &DiscoverOptions,
    ) -> Result<DiscoveryReport> {
        let subject = reference.resolve(store).await?;
        let canonical = reference.canonical(&digest_of(&subject));
        let mode = options.format.traversal_mode();
        debug!(%canonical, ?mode, format = %options.format, "Starting discovery");

        let fetcher = match options.strategy {
            Some(strategy) => ReferrerFetcher::with_strategy(store, strategy),
            None => ReferrerFetcher::new(store),
        };
        let builder = GraphBuilder::new(fetcher, canonical.as_str())
            .with_mode(mode)
            .with_budget(self.config.discovery.budget())
            .with_concurrency(self.config.discovery.concurrency);
        let graph = builder.build(subject).await?;

        Ok(DiscoveryReport {
            canonical,
            graph,
            strategy: builder.fetcher().strategy(),
            options: options.clone(),
        })
    }
}

/// Runs `discovery` until it completes or `cancel` resolves.
///
/// On cancellation the discovery future is dropped, which aborts its
/// in-flight fetches, and `RelError::Cancelled` is returned.
pub async fn until_cancelled<T>(
    discovery: impl Future<Output = Result<T>>,
    cancel: impl Future<Output = ()>,
) -> Result<T> {
    tokio::select! {
        result = discovery => result,
        () = cancel => {
            debug!("Discovery cancelled");
            Err(RelError::Cancelled)
        }
    }
}
