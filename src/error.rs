//! Error type shared by every stage of the pipeline.

use std::fmt;

/// Failure raised while normalizing, modeling, solving, or extracting.
///
/// No stage retries or relaxes on failure: every error is surfaced to the
/// caller as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// Input legs or stops are unusable: duplicate `(route, sequence)` keys,
    /// missing or unparseable timestamps, empty identifiers.
    MalformedInput(String),

    /// The graph contains a node that can never satisfy conservation,
    /// e.g. one with forced inflow and no outgoing edge.
    ModelConstructionError(String),

    /// No assignment satisfies all constraints.
    Infeasible {
        /// Labels of the constraints left unsatisfied by the solver.
        violated: Vec<String>,
    },

    /// Components disagree about shared structure (e.g. the solver returned
    /// a flow vector that does not match the graph's edge set).
    InternalError(String),
}

impl SolveError {
    /// Whether this error reports an infeasible model.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolveError::Infeasible { .. })
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            SolveError::ModelConstructionError(msg) => {
                write!(f, "model construction error: {msg}")
            }
            SolveError::Infeasible { violated } if violated.is_empty() => {
                write!(f, "problem is infeasible")
            }
            SolveError::Infeasible { violated } => {
                write!(f, "problem is infeasible; violated: {}", violated.join(", "))
            }
            SolveError::InternalError(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for SolveError {}
