//! Referrer graph construction.
//!
//! The graph is a tree rooted at the subject. Every other node is a referrer
//! of its parent. A manifest reachable from two parents appears once under
//! each of them.
//!
//! Levels are expanded one at a time. Fetches within a level run
//! concurrently, but results are collected in submission order so sibling
//! order never depends on which fetch finished first.

use crate::error::{Result, RelError};
use crate::fetcher::ReferrerFetcher;
use crate::oci::Descriptor;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};


/// Default number of sibling fetches in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Default maximum number of referrers in one graph.
pub const DEFAULT_MAX_NODES: usize = 10_000;

/// Default maximum depth below the subject.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Index of a node in a [`ReferrerGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One node of the graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    descriptor: Descriptor,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    depth: usize,
}

impl GraphNode {
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Distance from the root; the root is at depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// A tree of referrers rooted at a subject descriptor.
#[derive(Debug, Clone)]
pub struct ReferrerGraph {
    nodes: Vec<GraphNode>,
}

impl ReferrerGraph {
    /// Creates a graph holding only the subject.
    pub fn new(subject: Descriptor) -> Self {
        Self {
            nodes: vec![GraphNode {
                descriptor: subject,
                parent: None,
                children: Vec::new(),
                depth: 0,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the subject descriptor.
    pub fn subject(&self) -> &Descriptor {
        &self.nodes[0].descriptor
    }

    /// Returns a node by id.
    ///
    /// Ids are only handed out by this graph, so they are always in range.
    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn descriptor(&self, id: NodeId) -> &Descriptor {
        &self.node(id).descriptor
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Returns the referrers of the subject, in sibling order.
    pub fn direct_referrers(&self) -> impl Iterator<Item = &Descriptor> {
        self.children(self.root())
            .iter()
            .map(|id| self.descriptor(*id))
    }

    /// Returns the number of referrer nodes, not counting the subject.
    pub fn referrer_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Returns the deepest level reached.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    fn add_child(&mut self, parent: NodeId, descriptor: Descriptor) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(GraphNode {
            descriptor,
            parent: Some(parent),
            children: Vec::new(),
            depth,
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

/// How far discovery goes below the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalMode {
    /// Only the referrers of the subject.
    Direct,
    /// Referrers of referrers, until none are left.
    Recursive,
}

/// Limits that keep a pathological registry from running discovery forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalBudget {
    pub max_nodes: usize,
    pub max_depth: usize,
}

impl Default for TraversalBudget {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_NODES,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Builds a [`ReferrerGraph`] by repeatedly fetching referrers.
pub struct GraphBuilder<'a> {
    fetcher: ReferrerFetcher<'a>,
    mode: TraversalMode,
    budget: TraversalBudget,
    concurrency: usize,
    reference: String,
}

impl<'a> GraphBuilder<'a> {
    /// Creates a builder. `reference` names the subject in budget errors.
    pub fn new(fetcher: ReferrerFetcher<'a>, reference: impl Into<String>) -> Self {
        Self {
            fetcher,
            mode: TraversalMode::Direct,
            budget: TraversalBudget::default(),
            concurrency: DEFAULT_CONCURRENCY,
            reference: reference.into(),
        }
    }

    pub fn with_mode(mut self, mode: TraversalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_budget(mut self, budget: TraversalBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Sets how many sibling fetches may be in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Returns the fetcher, e.g. to inspect the strategy it settled on.
    pub fn fetcher(&self) -> &ReferrerFetcher<'a> {
        &self.fetcher
    }

    /// Expands the graph below `subject`.
    ///
    /// Any fetch error aborts the whole build; no partial graph is returned.
    pub async fn build(&self, subject: Descriptor) -> Result<ReferrerGraph> {
        let max_depth = match self.mode {
            TraversalMode::Direct => 1,
            TraversalMode::Recursive => self.budget.max_depth.max(1),
        };
        let sort_siblings = !self.fetcher.store().preserves_order();

        let mut graph = ReferrerGraph::new(subject);
        let mut frontier = vec![graph.root()];
        let mut depth = 0;

        while !frontier.is_empty() {
            if self.mode == TraversalMode::Direct && depth == max_depth {
                break;
            }

            let level = self.fetch_level(&graph, &frontier).await?;
            let mut next = Vec::new();
            for (parent, mut referrers) in frontier.into_iter().zip(level) {
                if referrers.is_empty() {
                    continue;
                }
                if depth + 1 > max_depth {
                    return Err(RelError::recursion_limit(
                        self.reference.as_str(),
                        format!("maximum depth of {} exceeded", max_depth),
                    ));
                }
                if sort_siblings {
                    referrers.sort_by_key(|d| d.digest().to_string());
                }
                for referrer in referrers {
                    if graph.referrer_count() >= self.budget.max_nodes {
                        return Err(RelError::recursion_limit(
                            self.reference.as_str(),
                            format!("more than {} referrers", self.budget.max_nodes),
                        ));
                    }
                    next.push(graph.add_child(parent, referrer));
                }
            }

            depth += 1;
            debug!(depth, discovered = next.len(), "Expanded referrer level");
            frontier = next;
        }

        info!(
            subject = %graph.subject().digest(),
            referrers = graph.referrer_count(),
            depth = graph.depth(),
            "Discovery complete"
        );
        Ok(graph)
    }

    /// Fetches referrers for every node in `frontier`, in frontier order.
    async fn fetch_level(
        &self,
        graph: &ReferrerGraph,
        frontier: &[NodeId],
    ) -> Result<Vec<Vec<Descriptor>>> {
        let fetcher = &self.fetcher;
        stream::iter(frontier.iter().map(|id| fetcher.fetch(graph.descriptor(*id))))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}
