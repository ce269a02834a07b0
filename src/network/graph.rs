//! Arena-backed directed graph.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use super::edge::{Edge, EdgeId, EdgeTag};
use super::node::{Node, NodeId, NodeKey};

/// Directed graph of typed nodes and tagged edges.
///
/// Nodes and edges live in flat vectors and are addressed by [`NodeId`] /
/// [`EdgeId`]. Pool and trailer nodes are indexed by location and by
/// `(route, sequence)` as they are added. The source and sink always exist.
///
/// # Examples
///
/// ```
/// use u_trailerflow::network::{EdgeTag, FlowGraph, NodeKey};
///
/// let mut graph = FlowGraph::new();
/// let out = graph.add_node(NodeKey::LocationOut("A".into()), Some("A".into()), None);
/// graph.add_edge(graph.source(), out, EdgeTag::SourceToPool);
/// assert_eq!(graph.node_count(), 3);
/// assert_eq!(graph.count_by_tag(EdgeTag::SourceToPool), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
    source: NodeId,
    sink: NodeId,
    keys: HashMap<NodeKey, NodeId>,
    pools: BTreeMap<String, (Option<NodeId>, Option<NodeId>)>,
    trailers: HashMap<(String, u32), (Option<NodeId>, Option<NodeId>)>,
}

impl FlowGraph {
    /// Creates a graph holding only the source and the sink.
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            source: NodeId(0),
            sink: NodeId(1),
            keys: HashMap::new(),
            pools: BTreeMap::new(),
            trailers: HashMap::new(),
        };
        graph.source = graph.add_node(NodeKey::Source, None, None);
        graph.sink = graph.add_node(NodeKey::Sink, None, None);
        graph
    }

    /// Adds a node, or returns the existing id if `key` is already present.
    pub fn add_node(
        &mut self,
        key: NodeKey,
        location: Option<String>,
        time: Option<NaiveDateTime>,
    ) -> NodeId {
        if let Some(&id) = self.keys.get(&key) {
            return id;
        }
        let id = NodeId(self.nodes.len());
        match &key {
            NodeKey::LocationOut(loc) => self.pools.entry(loc.clone()).or_default().0 = Some(id),
            NodeKey::LocationIn(loc) => self.pools.entry(loc.clone()).or_default().1 = Some(id),
            NodeKey::TrailerStart { route, sequence } => {
                self.trailers
                    .entry((route.clone(), *sequence))
                    .or_default()
                    .0 = Some(id)
            }
            NodeKey::TrailerEnd { route, sequence } => {
                self.trailers
                    .entry((route.clone(), *sequence))
                    .or_default()
                    .1 = Some(id)
            }
            NodeKey::Source | NodeKey::Sink => {}
        }
        self.keys.insert(key.clone(), id);
        self.nodes.push(Node::new(id, key, location, time));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Adds a directed edge.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is not a node of this graph.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, tag: EdgeTag) -> EdgeId {
        assert!(
            from.index() < self.nodes.len() && to.index() < self.nodes.len(),
            "edge endpoint out of range"
        );
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge::new(id, from, to, tag));
        self.outgoing[from.index()].push(id);
        self.incoming[to.index()].push(id);
        id
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub fn outgoing(&self, id: NodeId) -> &[EdgeId] {
        &self.outgoing[id.index()]
    }

    pub fn incoming(&self, id: NodeId) -> &[EdgeId] {
        &self.incoming[id.index()]
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Looks up a node by identity.
    pub fn find_node(&self, key: &NodeKey) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    /// First edge `from → to`, if any.
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.outgoing
            .get(from.index())?
            .iter()
            .copied()
            .find(|&e| self.edges[e.index()].to() == to)
    }

    /// Locations with a complete out/in pool pair, in sorted order.
    pub fn locations(&self) -> impl Iterator<Item = &str> + '_ {
        self.pools
            .iter()
            .filter(|(_, (out, inn))| out.is_some() && inn.is_some())
            .map(|(loc, _)| loc.as_str())
    }

    /// `(LocationOut, LocationIn)` nodes of a location.
    pub fn pool(&self, location: &str) -> Option<(NodeId, NodeId)> {
        match self.pools.get(location)? {
            (Some(out), Some(inn)) => Some((*out, *inn)),
            _ => None,
        }
    }

    /// `(TrailerStart, TrailerEnd)` nodes of a leg.
    pub fn trailer(&self, route: &str, sequence: u32) -> Option<(NodeId, NodeId)> {
        match self.trailers.get(&(route.to_string(), sequence))? {
            (Some(start), Some(end)) => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn count_by_tag(&self, tag: EdgeTag) -> usize {
        self.edges.iter().filter(|e| e.tag() == tag).count()
    }

    /// Edge count per tag, including tags with no edges.
    pub fn tag_counts(&self) -> BTreeMap<EdgeTag, usize> {
        let mut counts: BTreeMap<EdgeTag, usize> = EdgeTag::ALL.iter().map(|&t| (t, 0)).collect();
        for edge in &self.edges {
            *counts.entry(edge.tag()).or_default() += 1;
        }
        counts
    }

    /// Every edge as `(from key, to key, tag)`, sorted.
    ///
    /// Two graphs with equal signatures have the same structure regardless
    /// of arena order.
    pub fn signature(&self) -> Vec<(NodeKey, NodeKey, EdgeTag)> {
        let mut sig: Vec<_> = self
            .edges
            .iter()
            .map(|e| {
                (
                    self.node(e.from()).key().clone(),
                    self.node(e.to()).key().clone(),
                    e.tag(),
                )
            })
            .collect();
        sig.sort();
        sig
    }
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}
