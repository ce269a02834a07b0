//! Network edge types.

use std::fmt;

use super::node::NodeId;

/// Stable index of an edge inside its [`FlowGraph`](super::FlowGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Role of an edge in the network; determines its flow bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeTag {
    /// Source → location out-pool.
    SourceToPool,
    /// Location in-pool → sink.
    PoolToSink,
    /// Out-pool → trailer start of a leg departing that location.
    Supply,
    /// Trailer end of a leg → in-pool of its destination.
    Return,
    /// Trailer start → trailer end of the same leg. Carries exactly one unit.
    Utilization,
    /// Trailer end of one leg → trailer start of a later leg at the same place.
    Reuse,
}

impl EdgeTag {
    pub const ALL: [EdgeTag; 6] = [
        EdgeTag::SourceToPool,
        EdgeTag::PoolToSink,
        EdgeTag::Supply,
        EdgeTag::Return,
        EdgeTag::Utilization,
        EdgeTag::Reuse,
    ];

    /// Whether the edge's flow is pinned to a single value.
    pub fn is_fixed(self) -> bool {
        matches!(self, EdgeTag::Utilization)
    }

    /// `(lower, upper)` flow bounds; `None` means unbounded above.
    pub fn bounds(self) -> (f64, Option<f64>) {
        if self.is_fixed() {
            (1.0, Some(1.0))
        } else {
            (0.0, None)
        }
    }
}

impl fmt::Display for EdgeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EdgeTag::SourceToPool => "src_pool",
            EdgeTag::PoolToSink => "sink_pool",
            EdgeTag::Supply => "trl_supp",
            EdgeTag::Return => "trl_rtrn",
            EdgeTag::Utilization => "trailer_utilization",
            EdgeTag::Reuse => "same_trailer",
        };
        f.write_str(name)
    }
}

/// A directed edge between two arena nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    id: EdgeId,
    from: NodeId,
    to: NodeId,
    tag: EdgeTag,
}

impl Edge {
    pub(crate) fn new(id: EdgeId, from: NodeId, to: NodeId, tag: EdgeTag) -> Self {
        Self { id, from, to, tag }
    }

    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn tag(&self) -> EdgeTag {
        self.tag
    }
}
