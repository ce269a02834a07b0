//! Solver-agnostic linear program.

/// A continuous decision variable with bounds `[lower, upper]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LpVariable {
    /// Variable name (unique identifier within a program).
    pub name: String,
    /// Lower bound. Must be finite.
    pub lower: f64,
    /// Upper bound, or `None` for unbounded above.
    pub upper: Option<f64>,
}

impl LpVariable {
    /// Creates a non-negative variable with no upper bound.
    pub fn non_negative(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lower: 0.0,
            upper: None,
        }
    }

    /// Creates a variable with the given bounds.
    pub fn bounded(name: impl Into<String>, lower: f64, upper: Option<f64>) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }

    /// Whether lower and upper bound coincide.
    pub fn is_fixed(&self) -> bool {
        self.upper == Some(self.lower)
    }
}

/// A labelled linear equality `sum(coef * x[var]) == rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LpRow {
    pub label: String,
    /// `(variable index, coefficient)` pairs.
    pub terms: Vec<(usize, f64)>,
    pub rhs: f64,
}

/// A minimization problem over bounded variables and equality rows.
///
/// This is the narrow contract between the flow model and any LP engine:
/// bounded variables, linear equalities, a linear objective to minimize.
///
/// # Examples
///
/// ```
/// use u_trailerflow::flow::{LinearProgram, LpVariable};
///
/// let mut lp = LinearProgram::new("toy");
/// let x = lp.add_variable(LpVariable::non_negative("x"));
/// let y = lp.add_variable(LpVariable::bounded("y", 1.0, Some(1.0)));
/// lp.add_row("x equals y", vec![(x, 1.0), (y, -1.0)], 0.0);
/// lp.set_objective(vec![(x, 1.0)]);
/// assert!(lp.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LinearProgram {
    /// Program name.
    pub name: String,
    /// Decision variables.
    pub variables: Vec<LpVariable>,
    /// Equality rows.
    pub rows: Vec<LpRow>,
    /// Objective terms, minimized.
    pub objective: Vec<(usize, f64)>,
}

impl LinearProgram {
    /// Creates an empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a variable and returns its index.
    pub fn add_variable(&mut self, var: LpVariable) -> usize {
        self.variables.push(var);
        self.variables.len() - 1
    }

    /// Adds an equality row.
    pub fn add_row(&mut self, label: impl Into<String>, terms: Vec<(usize, f64)>, rhs: f64) {
        self.rows.push(LpRow {
            label: label.into(),
            terms,
            rhs,
        });
    }

    /// Sets the objective to minimize.
    pub fn set_objective(&mut self, terms: Vec<(usize, f64)>) {
        self.objective = terms;
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Objective value of an assignment.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.iter().map(|&(j, c)| c * values[j]).sum()
    }

    /// Validates the program for consistency.
    ///
    /// Checks that bounds are finite and ordered and that every referenced
    /// variable index exists.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.variables.len();
        for var in &self.variables {
            if !var.lower.is_finite() {
                return Err(format!("variable {}: lower bound must be finite", var.name));
            }
            if let Some(upper) = var.upper {
                if !upper.is_finite() || upper < var.lower {
                    return Err(format!(
                        "variable {}: invalid bounds [{}, {}]",
                        var.name, var.lower, upper
                    ));
                }
            }
        }
        for row in &self.rows {
            if !row.rhs.is_finite() {
                return Err(format!("row {}: rhs must be finite", row.label));
            }
            if let Some(&(j, _)) = row.terms.iter().find(|&&(j, _)| j >= n) {
                return Err(format!("row {}: undefined variable index {j}", row.label));
            }
        }
        if let Some(&(j, _)) = self.objective.iter().find(|&&(j, _)| j >= n) {
            return Err(format!("objective: undefined variable index {j}"));
        }
        Ok(())
    }
}
