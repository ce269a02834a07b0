//! Flow solver interface.

use super::model::FlowModel;
use crate::error::SolveError;

/// Solution of a flow model.
#[derive(Debug, Clone)]
pub struct FlowSolution {
    /// Minimized flow value `v`.
    pub value: f64,
    /// Flow per edge, indexed by [`EdgeId::index`](crate::network::EdgeId::index).
    pub flows: Vec<f64>,
    /// Augmentations (circulation) or pivots (simplex) performed.
    pub iterations: usize,
    /// Solve time in milliseconds.
    pub solve_time_ms: i64,
}

impl FlowSolution {
    /// `v` rounded to the nearest whole trailer.
    pub fn trailer_count(&self) -> usize {
        self.value.round().max(0.0) as usize
    }
}

/// Solver configuration.
///
/// # Examples
///
/// ```
/// use u_trailerflow::flow::SolverConfig;
///
/// let config = SolverConfig::default().with_epsilon(1e-8).with_max_iterations(10_000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Values within `epsilon` of an integer are treated as that integer,
    /// and constraint residuals up to `epsilon` are accepted.
    pub epsilon: f64,

    /// Pivot budget for LP-based solvers. 0 = derived from problem size.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_iterations: 0,
        }
    }
}

impl SolverConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.epsilon > 0.0 && self.epsilon < 0.5) {
            return Err(format!("epsilon must be in (0, 0.5), got {}", self.epsilon));
        }
        Ok(())
    }
}

/// Trait for flow solver implementations.
///
/// Implementors must honor every bound exactly (fixed edges carry their
/// fixed value), return the provably minimum `v`, and report
/// [`SolveError::Infeasible`] rather than a relaxed answer.
pub trait FlowSolver {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Solves the model.
    fn solve(&self, model: &FlowModel<'_>, config: &SolverConfig)
        -> Result<FlowSolution, SolveError>;
}

/// Bundled solver choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverKind {
    /// Combinatorial min-cost circulation. Polynomial; the default.
    #[default]
    Circulation,
    /// Dense two-phase simplex on the lowered linear program.
    Simplex,
}

impl SolverKind {
    /// Instantiates the solver.
    pub fn instantiate(self) -> Box<dyn FlowSolver> {
        match self {
            SolverKind::Circulation => Box::new(super::CirculationSolver::new()),
            SolverKind::Simplex => Box::new(super::SimplexSolver::new()),
        }
    }
}

/// Rounds `x` to the nearest integer when it is within `eps` of it.
pub(crate) fn snap(x: f64, eps: f64) -> f64 {
    let r = x.round();
    if (x - r).abs() <= eps {
        r
    } else {
        x
    }
}

/// Snaps a solution and verifies it against the model.
pub(crate) fn finalize(
    model: &FlowModel<'_>,
    config: &SolverConfig,
    mut flows: Vec<f64>,
    value: f64,
    iterations: usize,
    started: std::time::Instant,
) -> Result<FlowSolution, SolveError> {
    for x in flows.iter_mut() {
        *x = snap(*x, config.epsilon);
    }
    let value = snap(value, config.epsilon);
    model.check(&flows, value, config.epsilon).map_err(|violated| {
        SolveError::InternalError(format!(
            "solver returned an assignment violating: {}",
            violated.join(", ")
        ))
    })?;
    Ok(FlowSolution {
        value,
        flows,
        iterations,
        solve_time_ms: started.elapsed().as_millis() as i64,
    })
}
