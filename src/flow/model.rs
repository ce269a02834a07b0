//! Flow constraints over a trailer network.

use tracing::{info, warn};

use super::lp::{LinearProgram, LpVariable};
use crate::error::SolveError;
use crate::network::{EdgeId, EdgeTag, FlowGraph, NodeId};

/// A decision variable of the flow model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowVar {
    /// Flow on one edge.
    Edge(EdgeId),
    /// Total flow value `v` (number of trailers).
    Value,
}

/// Flow bounds of an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    /// `None` means unbounded above.
    pub upper: Option<f64>,
}

impl Bounds {
    /// Whether `x` lies within the bounds up to `eps`.
    pub fn contains(&self, x: f64, eps: f64) -> bool {
        x >= self.lower - eps && self.upper.map_or(true, |u| x <= u + eps)
    }
}

/// What a constraint row enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Outflow equals inflow at a non-terminal node.
    Conservation(NodeId),
    /// Source outflow equals `v`.
    SourceValue,
    /// Sink inflow equals `v`.
    SinkValue,
    /// Trailers drawn from a location's pool equal trailers returned to it.
    PoolBalance(String),
}

/// A labelled linear equality over flow variables.
#[derive(Debug, Clone)]
pub struct FlowConstraint {
    pub kind: ConstraintKind,
    pub label: String,
    pub terms: Vec<(FlowVar, f64)>,
    pub rhs: f64,
}

impl FlowConstraint {
    /// Left-hand side minus right-hand side under an assignment.
    pub fn residual(&self, flows: &[f64], value: f64) -> f64 {
        let lhs: f64 = self
            .terms
            .iter()
            .map(|&(var, coef)| {
                coef * match var {
                    FlowVar::Edge(e) => flows[e.index()],
                    FlowVar::Value => value,
                }
            })
            .sum();
        lhs - self.rhs
    }
}

/// Pool balance pair: `(Source → Out(l), In(l) → Sink)` edges of one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancePair {
    pub location: String,
    pub drawn: EdgeId,
    pub returned: EdgeId,
}

/// Minimum-flow model over a [`FlowGraph`].
///
/// Variables: one flow per edge (bounds from the edge tag) plus the flow
/// value `v`. Rows: conservation at every non-terminal node, source outflow
/// and sink inflow equal to `v`, and optionally one pool-balance row per
/// location. Objective: minimize `v`.
#[derive(Debug, Clone)]
pub struct FlowModel<'g> {
    graph: &'g FlowGraph,
    bounds: Vec<Bounds>,
    constraints: Vec<FlowConstraint>,
    balance: Vec<BalancePair>,
}

impl<'g> FlowModel<'g> {
    /// Formulates the constraints for `graph`.
    ///
    /// With `bal_pool`, every location's pool must return as many trailers
    /// to the sink as it draws from the source.
    ///
    /// # Errors
    ///
    /// [`SolveError::ModelConstructionError`] when a non-terminal node has
    /// forced inflow but no outgoing edge (or forced outflow but no incoming
    /// edge), or when a location lacks its source/sink edges in `bal_pool`
    /// mode.
    pub fn build(graph: &'g FlowGraph, bal_pool: bool) -> Result<Self, SolveError> {
        let bounds: Vec<Bounds> = graph
            .edges()
            .iter()
            .map(|e| {
                let (lower, upper) = e.tag().bounds();
                Bounds { lower, upper }
            })
            .collect();

        check_structure(graph, &bounds)?;

        let (source, sink) = (graph.source(), graph.sink());
        let mut constraints = Vec::with_capacity(graph.node_count());
        for node in graph.nodes() {
            let id = node.id();
            let outflow = graph.outgoing(id).iter().map(|&e| (FlowVar::Edge(e), 1.0));
            let inflow = graph.incoming(id).iter().map(|&e| (FlowVar::Edge(e), -1.0));
            let (kind, terms): (ConstraintKind, Vec<(FlowVar, f64)>) = if id == source {
                (
                    ConstraintKind::SourceValue,
                    outflow.chain([(FlowVar::Value, -1.0)]).collect(),
                )
            } else if id == sink {
                (
                    ConstraintKind::SinkValue,
                    graph
                        .incoming(id)
                        .iter()
                        .map(|&e| (FlowVar::Edge(e), 1.0))
                        .chain([(FlowVar::Value, -1.0)])
                        .collect(),
                )
            } else {
                (ConstraintKind::Conservation(id), outflow.chain(inflow).collect())
            };
            let label = match kind {
                ConstraintKind::SourceValue => "source outflow equals v".to_string(),
                ConstraintKind::SinkValue => "sink inflow equals v".to_string(),
                _ => format!("conservation at {}", node.key()),
            };
            constraints.push(FlowConstraint {
                kind,
                label,
                terms,
                rhs: 0.0,
            });
        }

        let mut balance = Vec::new();
        if bal_pool {
            for location in graph.locations() {
                let pair = balance_pair(graph, location)?;
                if graph.outgoing(graph.edge(pair.drawn).to()).is_empty() {
                    warn!(
                        location,
                        "pool only receives trailers; balancing it cannot release any"
                    );
                }
                constraints.push(FlowConstraint {
                    kind: ConstraintKind::PoolBalance(location.to_string()),
                    label: format!("pool balance at {location}"),
                    terms: vec![
                        (FlowVar::Edge(pair.drawn), 1.0),
                        (FlowVar::Edge(pair.returned), -1.0),
                    ],
                    rhs: 0.0,
                });
                balance.push(pair);
            }
        }

        info!(
            variables = graph.edge_count() + 1,
            constraints = constraints.len(),
            bal_pool,
            "formulated flow model"
        );
        Ok(Self {
            graph,
            bounds,
            constraints,
            balance,
        })
    }

    pub fn graph(&self) -> &'g FlowGraph {
        self.graph
    }

    pub fn bounds(&self, edge: EdgeId) -> Bounds {
        self.bounds[edge.index()]
    }

    pub fn constraints(&self) -> &[FlowConstraint] {
        &self.constraints
    }

    /// Pool-balance pairs; empty unless built with `bal_pool`.
    pub fn balance_pairs(&self) -> &[BalancePair] {
        &self.balance
    }

    pub fn is_balanced(&self) -> bool {
        !self.balance.is_empty()
    }

    /// Edge variables plus `v`.
    pub fn variable_count(&self) -> usize {
        self.bounds.len() + 1
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Column of `v` in [`to_linear_program`](Self::to_linear_program).
    pub fn value_column(&self) -> usize {
        self.bounds.len()
    }

    /// Lowers the model to a generic [`LinearProgram`].
    ///
    /// Column `i` is edge `i`; the last column is `v`.
    pub fn to_linear_program(&self) -> LinearProgram {
        let mut lp = LinearProgram::new("trailer planning");
        for edge in self.graph.edges() {
            let b = self.bounds[edge.id().index()];
            lp.add_variable(LpVariable::bounded(
                format!(
                    "{}_{}_{}",
                    self.graph.node(edge.from()).key(),
                    self.graph.node(edge.to()).key(),
                    edge.tag()
                ),
                b.lower,
                b.upper,
            ));
        }
        let v = lp.add_variable(LpVariable::non_negative("flow value"));
        for c in &self.constraints {
            let terms = c
                .terms
                .iter()
                .map(|&(var, coef)| match var {
                    FlowVar::Edge(e) => (e.index(), coef),
                    FlowVar::Value => (v, coef),
                })
                .collect();
            lp.add_row(c.label.clone(), terms, c.rhs);
        }
        lp.set_objective(vec![(v, 1.0)]);
        lp
    }

    /// Checks an assignment against every bound and row.
    ///
    /// Returns the labels of violated bounds and constraints.
    pub fn check(&self, flows: &[f64], value: f64, eps: f64) -> Result<(), Vec<String>> {
        if flows.len() != self.bounds.len() {
            return Err(vec![format!(
                "expected {} edge flows, got {}",
                self.bounds.len(),
                flows.len()
            )]);
        }
        let mut violated = Vec::new();
        if value < -eps {
            violated.push(format!("flow value {value} is negative"));
        }
        for edge in self.graph.edges() {
            let x = flows[edge.id().index()];
            if !self.bounds[edge.id().index()].contains(x, eps) {
                violated.push(format!(
                    "bounds of {} -> {} ({}) with flow {x}",
                    self.graph.node(edge.from()).key(),
                    self.graph.node(edge.to()).key(),
                    edge.tag()
                ));
            }
        }
        for c in &self.constraints {
            if c.residual(flows, value).abs() > eps {
                violated.push(c.label.clone());
            }
        }
        if violated.is_empty() {
            Ok(())
        } else {
            Err(violated)
        }
    }
}

/// Rejects nodes that conservation can never satisfy.
fn check_structure(graph: &FlowGraph, bounds: &[Bounds]) -> Result<(), SolveError> {
    for node in graph.nodes() {
        if node.key().is_terminal() {
            continue;
        }
        let id = node.id();
        let forced_in: f64 = graph.incoming(id).iter().map(|e| bounds[e.index()].lower).sum();
        let forced_out: f64 = graph.outgoing(id).iter().map(|e| bounds[e.index()].lower).sum();
        if forced_in > 0.0 && graph.outgoing(id).is_empty() {
            return Err(SolveError::ModelConstructionError(format!(
                "{} must receive {forced_in} unit(s) but has no outgoing edge",
                node.key()
            )));
        }
        if forced_out > 0.0 && graph.incoming(id).is_empty() {
            return Err(SolveError::ModelConstructionError(format!(
                "{} must send {forced_out} unit(s) but has no incoming edge",
                node.key()
            )));
        }
    }
    Ok(())
}

fn balance_pair(graph: &FlowGraph, location: &str) -> Result<BalancePair, SolveError> {
    let missing = |what: &str| {
        SolveError::ModelConstructionError(format!(
            "pool balance at {location}: missing {what} edge"
        ))
    };
    let (out, inn) = graph
        .pool(location)
        .ok_or_else(|| missing("pool node"))?;
    let drawn = graph
        .find_edge(graph.source(), out)
        .ok_or_else(|| missing("source-to-pool"))?;
    let returned = graph
        .find_edge(inn, graph.sink())
        .ok_or_else(|| missing("pool-to-sink"))?;
    debug_assert_eq!(graph.edge(drawn).tag(), EdgeTag::SourceToPool);
    debug_assert_eq!(graph.edge(returned).tag(), EdgeTag::PoolToSink);
    Ok(BalancePair {
        location: location.to_string(),
        drawn,
        returned,
    })
}
