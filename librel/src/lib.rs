//! Rel - Referrer Discovery Library
//!
//! Rel discovers the artifacts that refer to a container image: signatures,
//! SBOMs, attestations and anything else whose manifest names the image as
//! its `subject`. It reads from OCI-compliant registries and from OCI image
//! layout directories.
//!
//! # Quick Start
//!
//! ```no_run
//! use librel::{Config, DiscoverOptions, Discoverer, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let discoverer = Discoverer::new(Config::default());
//!
//!     // Discover everything referring to an image
//!     let reference = Discoverer::parse_reference("localhost:5000/foobar:v1", false)?;
//!     let report = discoverer
//!         .discover(&reference, &DiscoverOptions::new(OutputFormat::Tree))
//!         .await?;
//!
//!     print!("{}", report.render()?);
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - **Referrers API with fallback**: Uses the registry's Referrers API and
//!   falls back to the referrers tag schema when it is unavailable
//! - **Recursive discovery**: Referrers of referrers, fetched level by level
//!   with bounded concurrency
//! - **Filtering**: By artifact type and platform
//! - **Output formats**: Tree, table, JSON and YAML
//! - **Authentication**: Support for Basic and Bearer token authentication
//!
//! # Main Types
//!
//! - [`Discoverer`] - Main entry point for discovery
//! - [`DiscoveryReport`] - The discovered graph and its rendering
//! - [`SubjectReference`] - Registry and layout reference parsing
//! - [`FilterCriteria`] - Artifact type and platform filters
//! - [`Credentials`] - Authentication credentials
//! - [`Digest`] - Content digest validation and handling
//!
//! # Architecture
//!
//! - **High-level API** ([`discover`]) - Recommended for most users
//! - **Low-level modules** - Stores, fetcher, graph builder and renderers,
//!   available for advanced use cases (hidden from docs)

#![warn(clippy::all)]

/// Returns the librel crate version.
///
/// # Examples
///
/// ```
/// let version = librel::version();
/// assert!(!version.is_empty());
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// High-level public API (main entry point)
pub mod discover;
pub use discover::{DiscoverOptions, Discoverer, DiscoveryReport};

// Re-export commonly used types for convenience
pub use auth::Credentials;
pub use config::Config;
pub use digest::Digest;
pub use error::{RelError, Result};
pub use fetcher::ReferrersStrategy;
pub use filter::{FilterCriteria, PlatformSelector};
pub use graph::{ReferrerGraph, TraversalMode};
pub use reference::SubjectReference;
pub use render::OutputFormat;

// Low-level implementation modules (hidden from docs but still public)
#[doc(hidden)]
pub mod auth;
#[doc(hidden)]
pub mod client;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod digest;
#[doc(hidden)]
pub mod error;
#[doc(hidden)]
pub mod fetcher;
#[doc(hidden)]
pub mod filter;
#[doc(hidden)]
pub mod graph;
#[doc(hidden)]
pub mod oci;
#[doc(hidden)]
pub mod reference;
#[doc(hidden)]
pub mod render;
#[doc(hidden)]
pub mod store;
