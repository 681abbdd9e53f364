//! Rendering of discovery results.
//!
//! Three renderers share one input, a [`RenderContext`]: the structured
//! renderer emits an image-index-shaped document as JSON or YAML, the tree
//! renderer draws the whole referrer graph, and the table renderer lists
//! the direct referrers.

use crate::error::{Result, RelError};
use crate::filter::FilterCriteria;
use crate::graph::{ReferrerGraph, TraversalMode};
use crate::oci::{Descriptor, MEDIA_TYPE_IMAGE_INDEX, MediaType, Platform};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

mod table;
mod tree;

pub use table::TableRenderer;
pub use tree::TreeRenderer;


/// Output format for discovery results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Image index as JSON
    Json,
    /// Image index as YAML
    #[serde(alias = "yml")]
    Yaml,
    /// Nested referrer tree
    #[default]
    Tree,
    /// Table of direct referrers
    Table,
}

impl FromStr for OutputFormat {
    type Err = RelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "tree" => Ok(OutputFormat::Tree),
            "table" => Ok(OutputFormat::Table),
            other => Err(RelError::validation(format!(
                "Unknown output format '{}': expected json, yaml, tree or table",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Tree => "tree",
            OutputFormat::Table => "table",
        };
        f.write_str(name)
    }
}

impl OutputFormat {
    /// Returns how deep discovery must go for this format.
    ///
    /// Only the tree shows referrers of referrers.
    pub fn traversal_mode(&self) -> TraversalMode {
        match self {
            OutputFormat::Tree => TraversalMode::Recursive,
            OutputFormat::Json | OutputFormat::Yaml | OutputFormat::Table => TraversalMode::Direct,
        }
    }
}

/// The structured result: an image index listing the referrers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrersIndex {
    pub schema_version: u32,
    pub media_type: String,
    #[serde(serialize_with = "serialize_sorted")]
    pub manifests: Vec<Descriptor>,
}

/// Serialized form of a descriptor with its annotations ordered by key.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SortedDescriptor<'a> {
    media_type: &'a MediaType,
    digest: &'a oci_spec::image::Digest,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    urls: Option<&'a Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<BTreeMap<&'a str, &'a str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    platform: Option<&'a Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artifact_type: Option<&'a MediaType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a String>,
}

impl<'a> From<&'a Descriptor> for SortedDescriptor<'a> {
    fn from(d: &'a Descriptor) -> Self {
        Self {
            media_type: d.media_type(),
            digest: d.digest(),
            size: d.size(),
            urls: d.urls().as_ref(),
            annotations: d.annotations().as_ref().map(|a| {
                a.iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect()
            }),
            platform: d.platform().as_ref(),
            artifact_type: d.artifact_type().as_ref(),
            data: d.data().as_ref(),
        }
    }
}

fn serialize_sorted<S: Serializer>(
    manifests: &[Descriptor],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(manifests.iter().map(SortedDescriptor::from))
}

impl ReferrersIndex {
    /// Builds the index from the direct referrers that pass `filter`.
    pub fn from_graph(graph: &ReferrerGraph, filter: &FilterCriteria) -> Self {
        Self {
            schema_version: 2,
            media_type: MEDIA_TYPE_IMAGE_INDEX.to_string(),
            manifests: graph
                .direct_referrers()
                .filter(|d| filter.matches(d))
                .cloned()
                .collect(),
        }
    }
}

/// Everything a renderer needs.
pub struct RenderContext<'a> {
    /// The discovered graph.
    pub graph: &'a ReferrerGraph,
    /// Which nodes to emit.
    pub filter: &'a FilterCriteria,
    /// The subject reference pinned to its digest, e.g. `registry/repo@sha256:...`.
    pub subject: &'a str,
}

impl RenderContext<'_> {
    /// Returns the direct referrers that pass the filter.
    pub fn direct_referrers(&self) -> Vec<&Descriptor> {
        self.graph
            .direct_referrers()
            .filter(|d| self.filter.matches(d))
            .collect()
    }
}

/// Turns discovery results into text.
pub trait Render {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String>;
}

/// Renders the referrers index as JSON or YAML.
pub struct StructuredRenderer {
    yaml: bool,
}

impl StructuredRenderer {
    pub fn json() -> Self {
        Self { yaml: false }
    }

    pub fn yaml() -> Self {
        Self { yaml: true }
    }
}

impl Render for StructuredRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String> {
        let index = ReferrersIndex::from_graph(ctx.graph, ctx.filter);
        if self.yaml {
            serde_yaml::to_string(&index)
                .map_err(|e| RelError::validation_with_source("Failed to serialize to YAML", e))
        } else {
            serde_json::to_string_pretty(&index)
                .map(|mut json| {
                    json.push('\n');
                    json
                })
                .map_err(|e| RelError::validation_with_source("Failed to serialize to JSON", e))
        }
    }
}

/// Returns the renderer for `format`. `verbose` adds annotations to the
/// tree and table.
pub fn renderer_for(format: OutputFormat, verbose: bool) -> Box<dyn Render> {
    match format {
        OutputFormat::Json => Box::new(StructuredRenderer::json()),
        OutputFormat::Yaml => Box::new(StructuredRenderer::yaml()),
        OutputFormat::Tree => Box::new(TreeRenderer::new(verbose)),
        OutputFormat::Table => Box::new(TableRenderer::new(verbose)),
    }
}

/// Returns annotations sorted by key.
fn sorted_annotations(descriptor: &Descriptor) -> Vec<(&String, &String)> {
    let mut annotations: Vec<(&String, &String)> = descriptor
        .annotations()
        .as_ref()
        .map(|a| a.iter().collect())
        .unwrap_or_default();
    annotations.sort();
    annotations
}
