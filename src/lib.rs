//! Minimum trailer fleet sizing as a minimum-flow problem.
//!
//! Given the legs of driver routes, each tying one trailer to a location
//! for a time window, computes the smallest number of trailers that covers
//! every leg, reusing a trailer whenever it is released at a location
//! strictly before another leg departs from there.
//!
//! - **Schedule** ([`schedule`]): stop and leg records, stop-to-leg
//!   normalization with preload and drop offsets.
//! - **Network** ([`network`]): time-expanded flow graph with location
//!   pools, utilization edges and reuse edges.
//! - **Flow** ([`flow`]): minimum-flow model, LP lowering, and the
//!   circulation and simplex solvers behind the [`FlowSolver`] trait.
//! - **Plan** ([`plan`]): trailer count, per-edge flows, pool usage and
//!   per-trailer leg chains.
//!
//! # Architecture
//!
//! The pipeline is strictly one-way: legs → [`FlowGraph`] → [`FlowModel`] →
//! [`FlowSolution`] → [`TrailerPlan`]. [`TrailerPlanner`] runs it with
//! configurable settings; [`solve`] runs it with defaults.
//!
//! [`FlowGraph`]: network::FlowGraph
//! [`FlowModel`]: flow::FlowModel
//! [`FlowSolution`]: flow::FlowSolution
//! [`FlowSolver`]: flow::FlowSolver

pub mod error;
pub mod flow;
pub mod network;
pub mod plan;
pub mod planner;
pub mod schedule;

pub use error::SolveError;
pub use flow::SolverKind;
pub use plan::{FlowMap, TrailerPlan};
pub use planner::{solve, TrailerPlanner};
