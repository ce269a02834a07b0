//! Minimum-flow formulation and solvers.
//!
//! # Key Components
//!
//! - **Model** ([`FlowModel`]): bounded edge flows, conservation rows,
//!   optional pool-balance rows, objective `min v`
//! - **Program** ([`LinearProgram`]): solver-agnostic lowering of a model
//! - **Solver**: [`FlowSolver`] trait with two implementations:
//!   - [`CirculationSolver`]: combinatorial min-cost circulation, the default
//!   - [`SimplexSolver`]: dense two-phase simplex over the lowered program
//!
//! # Design
//!
//! The model never depends on a particular solver. A solver receives the
//! model (and through it the graph), and may use the network structure
//! directly or go through [`FlowModel::to_linear_program`] to target any LP
//! engine. Every bundled solver verifies its answer against
//! [`FlowModel::check`] before returning it.

mod circulation;
mod lp;
mod model;
mod simplex;
mod solver;

pub use circulation::CirculationSolver;
pub use lp::{LinearProgram, LpRow, LpVariable};
pub use model::{BalancePair, Bounds, ConstraintKind, FlowConstraint, FlowModel, FlowVar};
pub use simplex::{solve_lp, LpOutcome, SimplexSolver};
pub use solver::{FlowSolution, FlowSolver, SolverConfig, SolverKind};
