//! End-to-end trailer planning.
//!
//! [`TrailerPlanner`] runs the full pipeline: legs → network → flow model →
//! solver → [`TrailerPlan`]. [`solve`] is the one-call form with default
//! settings.

use std::time::Instant;

use tracing::info;

use crate::error::SolveError;
use crate::flow::{FlowModel, SolverConfig, SolverKind};
use crate::network::{BuilderConfig, GraphBuilder};
use crate::plan::{FlowMap, ResultExtractor, TrailerPlan};
use crate::schedule::{legs_from_stops, Leg, ScheduleConfig, Stop};

/// Minimum trailer count and per-edge flows for `legs`.
///
/// With `bal_pool` set, every location must end with as many trailers as
/// it started with.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_trailerflow::schedule::Leg;
///
/// let t = |h| NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, 0, 0).unwrap();
/// let legs = vec![
///     Leg::new("1", 0, "A", "B", t(0), t(4)),
///     Leg::new("2", 0, "B", "C", t(14), t(18)),
/// ];
/// let (trailers, flows) = u_trailerflow::solve(&legs, false).unwrap();
/// assert_eq!(trailers, 1.0);
/// assert!(!flows.is_empty());
/// ```
pub fn solve(legs: &[Leg], bal_pool: bool) -> Result<(f64, FlowMap), SolveError> {
    let plan = TrailerPlanner::default().with_bal_pool(bal_pool).plan(legs)?;
    Ok(plan.into_parts())
}

/// Planner settings and entry points.
///
/// # Examples
///
/// ```
/// use u_trailerflow::{SolverKind, TrailerPlanner};
///
/// let planner = TrailerPlanner::default()
///     .with_bal_pool(true)
///     .with_solver(SolverKind::Simplex);
/// assert!(planner.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrailerPlanner {
    /// Require every location's pool to end balanced.
    pub bal_pool: bool,

    /// Graph construction settings.
    pub builder: BuilderConfig,

    /// Solver used for the flow model.
    pub solver: SolverKind,

    /// Solver tolerances and limits.
    pub solver_config: SolverConfig,
}

impl TrailerPlanner {
    pub fn with_bal_pool(mut self, bal_pool: bool) -> Self {
        self.bal_pool = bal_pool;
        self
    }

    pub fn with_builder(mut self, builder: BuilderConfig) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_solver(mut self, solver: SolverKind) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.solver_config = config;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.solver_config.validate()
    }

    /// Plans trailers for already derived legs.
    ///
    /// # Errors
    ///
    /// - [`SolveError::MalformedInput`] for invalid legs or settings
    /// - [`SolveError::ModelConstructionError`] when the network cannot be
    ///   expressed as a flow model
    /// - [`SolveError::Infeasible`] when no flow satisfies the bounds,
    ///   typically an unclosable pool balance
    /// - [`SolveError::InternalError`] when solver output is inconsistent
    pub fn plan(&self, legs: &[Leg]) -> Result<TrailerPlan, SolveError> {
        self.validate().map_err(SolveError::MalformedInput)?;
        let started = Instant::now();

        let graph = GraphBuilder::new(self.builder.clone()).build(legs)?;
        let model = FlowModel::build(&graph, self.bal_pool)?;
        let solver = self.solver.instantiate();
        let solution = solver.solve(&model, &self.solver_config)?;
        let plan = ResultExtractor::new(self.solver_config.epsilon).extract(&graph, &solution)?;

        info!(
            solver = solver.name(),
            legs = legs.len(),
            trailers = plan.trailer_count(),
            iterations = solution.iterations,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "trailer plan solved"
        );
        Ok(plan)
    }

    /// Derives legs from `stops`, then plans them.
    pub fn plan_stops(
        &self,
        stops: &[Stop],
        schedule: &ScheduleConfig,
    ) -> Result<TrailerPlan, SolveError> {
        let legs = legs_from_stops(stops, schedule)?;
        self.plan(&legs)
    }
}
