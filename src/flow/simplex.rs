//! Dense two-phase simplex for [`LinearProgram`]s.
//!
//! # Algorithm
//!
//! 1. Shift every variable by its lower bound (`x = l + y`, `y >= 0`) and
//!    turn each finite upper bound into a row `y + slack = u - l`.
//! 2. Flip rows to a non-negative right-hand side and add one artificial
//!    variable per row as the starting basis.
//! 3. Phase one minimizes the sum of artificials. A positive optimum means
//!    the rows are infeasible; the rows still carrying artificial value are
//!    reported.
//! 4. Artificials left in the basis at zero are pivoted out; rows where
//!    that is impossible are linearly dependent and dropped. Flow
//!    conservation always has at least one such row.
//! 5. Phase two minimizes the real objective from the phase-one basis.
//!
//! Bland's rule (lowest index enters, lowest basic index leaves on ties)
//! rules out cycling on the heavily degenerate flow polytopes.
//!
//! The tableau is dense, so memory grows with rows × columns. Use
//! [`CirculationSolver`](super::CirculationSolver) for large networks.
//!
//! # Reference
//!
//! Dantzig (1963), *Linear Programming and Extensions*; Bland (1977), "New
//! finite pivoting rules for the simplex method".

use std::time::Instant;

use tracing::debug;

use super::lp::LinearProgram;
use super::model::FlowModel;
use super::solver::{finalize, FlowSolution, FlowSolver, SolverConfig};
use crate::error::SolveError;

/// Magnitude below which a tableau entry is treated as zero.
const PIVOT_TOL: f64 = 1e-9;

/// Solution of a [`LinearProgram`].
#[derive(Debug, Clone)]
pub struct LpOutcome {
    /// Value per program variable.
    pub values: Vec<f64>,
    /// Objective value at `values`.
    pub objective: f64,
    /// Pivots over both phases.
    pub pivots: usize,
}

/// Flow solver that lowers the model to a [`LinearProgram`] and runs
/// [`solve_lp`] on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver;

impl SimplexSolver {
    pub fn new() -> Self {
        Self
    }
}

impl FlowSolver for SimplexSolver {
    fn name(&self) -> &'static str {
        "simplex"
    }

    fn solve(
        &self,
        model: &FlowModel<'_>,
        config: &SolverConfig,
    ) -> Result<FlowSolution, SolveError> {
        let started = Instant::now();
        let lp = model.to_linear_program();
        let outcome = solve_lp(&lp, config)?;
        let mut flows = outcome.values;
        let value = flows.get(model.value_column()).copied().ok_or_else(|| {
            SolveError::InternalError("linear program lost the flow value column".into())
        })?;
        flows.truncate(model.value_column());
        finalize(model, config, flows, value, outcome.pivots, started)
    }
}

/// Minimizes a linear program.
///
/// # Errors
///
/// - [`SolveError::MalformedInput`] for an invalid config.
/// - [`SolveError::ModelConstructionError`] for an invalid or unbounded program.
/// - [`SolveError::Infeasible`] with the labels of unsatisfiable rows.
/// - [`SolveError::InternalError`] when the pivot budget runs out.
///
/// # Examples
///
/// ```
/// use u_trailerflow::flow::{solve_lp, LinearProgram, LpVariable, SolverConfig};
///
/// // min x + y  s.t.  x + y = 3, x in [1, 2], y >= 0
/// let mut lp = LinearProgram::new("toy");
/// let x = lp.add_variable(LpVariable::bounded("x", 1.0, Some(2.0)));
/// let y = lp.add_variable(LpVariable::non_negative("y"));
/// lp.add_row("sum", vec![(x, 1.0), (y, 1.0)], 3.0);
/// lp.set_objective(vec![(x, 1.0), (y, 1.0)]);
///
/// let out = solve_lp(&lp, &SolverConfig::default()).unwrap();
/// assert!((out.objective - 3.0).abs() < 1e-9);
/// ```
pub fn solve_lp(lp: &LinearProgram, config: &SolverConfig) -> Result<LpOutcome, SolveError> {
    config.validate().map_err(SolveError::MalformedInput)?;
    lp.validate().map_err(SolveError::ModelConstructionError)?;

    let mut tableau = Tableau::standard_form(lp);
    let limit = if config.max_iterations == 0 {
        (50 * (tableau.rows.len() + tableau.ncols)).max(1_000)
    } else {
        config.max_iterations
    };

    // Phase one
    tableau.load_phase_one_cost();
    let mut pivots = tableau.run(limit)?;
    let residual = -tableau.cost[tableau.ncols];
    if residual > config.epsilon {
        let mut violated: Vec<String> = (0..tableau.rows.len())
            .filter(|&i| tableau.is_artificial(tableau.basis[i]))
            .filter(|&i| tableau.rows[i][tableau.ncols] > config.epsilon)
            .map(|i| tableau.labels[i].clone())
            .collect();
        if violated.is_empty() {
            violated.push(format!("phase-one residual {residual}"));
        }
        return Err(SolveError::Infeasible { violated });
    }
    let dropped = tableau.expel_artificials();
    pivots += dropped.pivots;

    // Phase two
    tableau.load_phase_two_cost(lp);
    pivots += tableau.run(limit.saturating_sub(pivots))?;

    let mut values: Vec<f64> = lp.variables.iter().map(|v| v.lower).collect();
    for (i, &b) in tableau.basis.iter().enumerate() {
        if b < values.len() {
            values[b] += tableau.rows[i][tableau.ncols];
        }
    }
    let objective = lp.objective_value(&values);
    debug!(
        rows = tableau.rows.len(),
        redundant = dropped.rows,
        pivots,
        objective,
        "simplex finished"
    );
    Ok(LpOutcome {
        values,
        objective,
        pivots,
    })
}

struct Expelled {
    pivots: usize,
    rows: usize,
}

/// Dense tableau: `rows[i][ncols]` is the right-hand side, `cost[ncols]`
/// the negated objective value.
struct Tableau {
    rows: Vec<Vec<f64>>,
    cost: Vec<f64>,
    basis: Vec<usize>,
    labels: Vec<String>,
    ncols: usize,
    /// First artificial column; columns before it are structural or slack.
    artificial_start: usize,
}

impl Tableau {
    fn standard_form(lp: &LinearProgram) -> Self {
        let n = lp.variable_count();
        let upper: Vec<(usize, f64)> = lp
            .variables
            .iter()
            .enumerate()
            .filter_map(|(j, v)| v.upper.map(|u| (j, u - v.lower)))
            .collect();
        let m = lp.row_count() + upper.len();
        let artificial_start = n + upper.len();
        let ncols = artificial_start + m;

        let mut rows = vec![vec![0.0; ncols + 1]; m];
        let mut labels = Vec::with_capacity(m);
        for (i, row) in lp.rows.iter().enumerate() {
            let mut rhs = row.rhs;
            for &(j, coef) in &row.terms {
                rows[i][j] += coef;
                rhs -= coef * lp.variables[j].lower;
            }
            rows[i][ncols] = rhs;
            labels.push(row.label.clone());
        }
        for (s, &(j, span)) in upper.iter().enumerate() {
            let i = lp.row_count() + s;
            rows[i][j] = 1.0;
            rows[i][n + s] = 1.0;
            rows[i][ncols] = span;
            labels.push(format!("upper bound of {}", lp.variables[j].name));
        }
        for (i, row) in rows.iter_mut().enumerate() {
            if row[ncols] < 0.0 {
                row.iter_mut().for_each(|x| *x = -*x);
            }
            row[artificial_start + i] = 1.0;
        }

        Self {
            rows,
            cost: vec![0.0; ncols + 1],
            basis: (artificial_start..ncols).collect(),
            labels,
            ncols,
            artificial_start,
        }
    }

    fn is_artificial(&self, col: usize) -> bool {
        col >= self.artificial_start
    }

    /// Reduced costs of "minimize the sum of artificials" for the
    /// all-artificial basis.
    fn load_phase_one_cost(&mut self) {
        self.cost.iter_mut().for_each(|c| *c = 0.0);
        for row in &self.rows {
            for j in 0..self.artificial_start {
                self.cost[j] -= row[j];
            }
            self.cost[self.ncols] -= row[self.ncols];
        }
    }

    /// Reduced costs of the program objective for the current basis.
    fn load_phase_two_cost(&mut self, lp: &LinearProgram) {
        let mut dense = vec![0.0; self.ncols + 1];
        for &(j, coef) in &lp.objective {
            dense[j] += coef;
        }
        self.cost.clone_from(&dense);
        for (i, row) in self.rows.iter().enumerate() {
            let cb = dense[self.basis[i]];
            if cb != 0.0 {
                for (c, &a) in self.cost.iter_mut().zip(row) {
                    *c -= cb * a;
                }
            }
        }
    }

    /// Pivots until no non-artificial column has negative reduced cost.
    fn run(&mut self, limit: usize) -> Result<usize, SolveError> {
        let mut pivots = 0;
        loop {
            let Some(col) = (0..self.artificial_start).find(|&j| self.cost[j] < -PIVOT_TOL) else {
                return Ok(pivots);
            };
            if pivots >= limit {
                return Err(SolveError::InternalError(format!(
                    "simplex stopped after {pivots} pivots without converging"
                )));
            }
            let Some(row) = self.leaving_row(col) else {
                return Err(SolveError::ModelConstructionError(
                    "objective is unbounded below".into(),
                ));
            };
            self.pivot(row, col);
            pivots += 1;
        }
    }

    /// Minimum-ratio row for `col`, ties broken by lowest basic index.
    fn leaving_row(&self, col: usize) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, row) in self.rows.iter().enumerate() {
            let a = row[col];
            if a <= PIVOT_TOL {
                continue;
            }
            let ratio = row[self.ncols] / a;
            best = match best {
                None => Some((i, ratio)),
                Some((r, min)) => {
                    let tie = (ratio - min).abs() <= PIVOT_TOL;
                    if (ratio < min && !tie) || (tie && self.basis[i] < self.basis[r]) {
                        Some((i, ratio))
                    } else {
                        Some((r, min))
                    }
                }
            };
        }
        best.map(|(i, _)| i)
    }

    fn pivot(&mut self, r: usize, c: usize) {
        let p = self.rows[r][c];
        self.rows[r].iter_mut().for_each(|x| *x /= p);
        let pivot_row = self.rows[r].clone();

        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r {
                continue;
            }
            let f = row[c];
            if f != 0.0 {
                for (x, &y) in row.iter_mut().zip(&pivot_row) {
                    *x -= f * y;
                }
                row[c] = 0.0;
            }
        }
        let f = self.cost[c];
        if f != 0.0 {
            for (x, &y) in self.cost.iter_mut().zip(&pivot_row) {
                *x -= f * y;
            }
            self.cost[c] = 0.0;
        }
        self.basis[r] = c;
    }

    /// Drives zero-valued artificials out of the basis and drops the rows
    /// where no structural column can replace them.
    fn expel_artificials(&mut self) -> Expelled {
        let mut pivots = 0;
        let mut redundant = vec![false; self.rows.len()];
        for r in 0..self.rows.len() {
            if !self.is_artificial(self.basis[r]) {
                continue;
            }
            match (0..self.artificial_start).find(|&j| self.rows[r][j].abs() > PIVOT_TOL) {
                Some(c) => {
                    self.pivot(r, c);
                    pivots += 1;
                }
                None => redundant[r] = true,
            }
        }

        let dropped = redundant.iter().filter(|&&d| d).count();
        let mut keep = redundant.iter().map(|&d| !d);
        self.rows.retain(|_| keep.next().unwrap_or(true));
        let mut keep = redundant.iter().map(|&d| !d);
        self.basis.retain(|_| keep.next().unwrap_or(true));
        let mut keep = redundant.iter().map(|&d| !d);
        self.labels.retain(|_| keep.next().unwrap_or(true));

        Expelled {
            pivots,
            rows: dropped,
        }
    }
}
