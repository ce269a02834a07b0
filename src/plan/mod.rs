//! Solver output mapped back onto the trailer network.
//!
//! [`ResultExtractor`] turns a [`FlowSolution`](crate::flow::FlowSolution)
//! into a [`TrailerPlan`]: the minimum trailer count, the flow on every
//! edge keyed by node identity, per-location pool usage, and one
//! [`TrailerChain`] per trailer listing the legs it serves.

mod extract;

pub use extract::{FlowMap, LegRef, PoolUsage, ResultExtractor, TrailerChain, TrailerPlan};
