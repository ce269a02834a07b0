//! Time-expanded trailer network.
//!
//! Trailer supply, usage, and reuse are modeled as flow:
//!
//! - one pool per location, split into an outbound node fed by the source
//!   and an inbound node draining to the sink;
//! - one start/end node pair per leg joined by a utilization edge that must
//!   carry exactly one trailer;
//! - reuse edges from the end of a leg to the start of any later leg that
//!   departs where it arrived.
//!
//! Nodes and edges live in an arena ([`FlowGraph`]) addressed by integer ids.

mod builder;
mod edge;
mod graph;
mod node;

pub use builder::{BuilderConfig, GraphBuilder};
pub use edge::{Edge, EdgeId, EdgeTag};
pub use graph::FlowGraph;
pub use node::{Node, NodeId, NodeKey};
