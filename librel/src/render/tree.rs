//! Tree rendering.

use super::{Render, RenderContext, sorted_annotations};
use crate::error::Result;
use crate::filter::FilterCriteria;
use crate::graph::{NodeId, ReferrerGraph};
use crate::oci::{Descriptor, artifact_type_of};
use serde::Serialize;
use std::collections::BTreeMap;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// An emitted node and its emitted descendants.
struct TreeItem<'a> {
    descriptor: &'a Descriptor,
    children: Vec<TreeItem<'a>>,
}

/// Draws the referrer graph with box-drawing branches.
///
/// Each node is printed as `<digest> <artifactType>`. Nodes that fail the
/// filter are left out and their children move up to the nearest emitted
/// ancestor.
pub struct TreeRenderer {
    verbose: bool,
}

impl TreeRenderer {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn write_items(&self, out: &mut String, items: &[TreeItem<'_>], prefix: &str) {
        for (i, item) in items.iter().enumerate() {
            let last = i + 1 == items.len();
            out.push_str(prefix);
            out.push_str(if last { LAST_BRANCH } else { BRANCH });
            out.push_str(&node_label(item.descriptor));
            out.push('\n');

            let child_prefix = format!("{}{}", prefix, if last { SPACE } else { PIPE });
            if self.verbose {
                let bar = if item.children.is_empty() { "  " } else { "│ " };
                for (key, value) in sorted_annotations(item.descriptor) {
                    out.push_str(&child_prefix);
                    out.push_str(bar);
                    out.push_str(&annotation_line(key, value));
                    out.push('\n');
                }
            }
            self.write_items(out, &item.children, &child_prefix);
        }
    }
}

impl Render for TreeRenderer {
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String> {
        let items = collect(ctx.graph, ctx.graph.root(), ctx.filter);
        let mut out = String::new();
        out.push_str(ctx.subject);
        out.push('\n');
        self.write_items(&mut out, &items, "");
        Ok(out)
    }
}

fn collect<'a>(graph: &'a ReferrerGraph, id: NodeId, filter: &FilterCriteria) -> Vec<TreeItem<'a>> {
    let mut items = Vec::new();
    for child in graph.children(id) {
        let descriptor = graph.descriptor(*child);
        let children = collect(graph, *child, filter);
        if filter.matches(descriptor) {
            items.push(TreeItem {
                descriptor,
                children,
            });
        } else {
            items.extend(children);
        }
    }
    items
}

fn node_label(descriptor: &Descriptor) -> String {
    match artifact_type_of(descriptor) {
        Some(artifact_type) => format!("{} {}", descriptor.digest(), artifact_type),
        None => descriptor.digest().to_string(),
    }
}

/// Encodes one annotation as a single-line YAML mapping entry.
///
/// Values YAML would write as a block scalar are JSON-quoted instead.
fn annotation_line(key: &str, value: &str) -> String {
    single_line_yaml(&BTreeMap::from([(key, value)])).unwrap_or_else(|| {
        let key = single_line_yaml(key).unwrap_or_else(|| json_string(key));
        format!("{}: {}", key, json_string(value))
    })
}

fn single_line_yaml<T: Serialize + ?Sized>(value: &T) -> Option<String> {
    serde_yaml::to_string(value)
        .ok()
        .map(|encoded| encoded.trim_end().to_string())
        .filter(|encoded| !encoded.contains('\n'))
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
