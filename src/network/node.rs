//! Network node types.

use std::fmt;

use chrono::NaiveDateTime;

/// Stable index of a node inside its [`FlowGraph`](super::FlowGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identity of a node, independent of its arena position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKey {
    Source,
    Sink,
    /// Outbound side of a location's trailer pool.
    LocationOut(String),
    /// Inbound side of a location's trailer pool.
    LocationIn(String),
    /// Trailer picked up for a leg.
    TrailerStart { route: String, sequence: u32 },
    /// Trailer released after a leg.
    TrailerEnd { route: String, sequence: u32 },
}

impl NodeKey {
    /// Whether this is the source or the sink.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKey::Source | NodeKey::Sink)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Source => write!(f, "s"),
            NodeKey::Sink => write!(f, "t"),
            NodeKey::LocationOut(loc) => write!(f, "({loc}, out)"),
            NodeKey::LocationIn(loc) => write!(f, "({loc}, in)"),
            NodeKey::TrailerStart { route, sequence } => write!(f, "({route}, {sequence}, start)"),
            NodeKey::TrailerEnd { route, sequence } => write!(f, "({route}, {sequence}, end)"),
        }
    }
}

/// A node of the time-expanded network.
///
/// Trailer nodes carry the location and instant at which the trailer is
/// picked up or released; location nodes carry only the location.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    key: NodeKey,
    location: Option<String>,
    time: Option<NaiveDateTime>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        key: NodeKey,
        location: Option<String>,
        time: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            id,
            key,
            location,
            time,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Ready time for a trailer start, release time for a trailer end.
    pub fn time(&self) -> Option<NaiveDateTime> {
        self.time
    }
}
