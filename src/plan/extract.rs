//! Solved flow to trailer plan.

use std::collections::BTreeMap;

use crate::error::SolveError;
use crate::flow::FlowSolution;
use crate::network::{EdgeTag, FlowGraph, NodeId, NodeKey};

/// Flow per edge, keyed by `(from, to)` node identity.
pub type FlowMap = BTreeMap<(NodeKey, NodeKey), f64>;

/// Trailers a location's pool hands out and takes back.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolUsage {
    /// Flow on `Source → LocationOut`.
    pub drawn: f64,
    /// Flow on `LocationIn → Sink`.
    pub returned: f64,
}

impl PoolUsage {
    /// `returned - drawn`: positive when trailers accumulate at the location.
    pub fn net(&self) -> f64 {
        self.returned - self.drawn
    }
}

/// `(route, sequence)` of a served leg.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LegRef {
    pub route: String,
    pub sequence: u32,
}

/// The legs one trailer serves, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrailerChain {
    /// Pool the trailer is drawn from.
    pub origin: String,
    /// Pool the trailer ends up in.
    pub destination: String,
    pub legs: Vec<LegRef>,
}

/// Minimum trailer count with the flows that realize it.
#[derive(Debug, Clone)]
pub struct TrailerPlan {
    value: f64,
    flows: FlowMap,
    tag_totals: BTreeMap<EdgeTag, f64>,
    pools: BTreeMap<String, PoolUsage>,
    chains: Vec<TrailerChain>,
}

impl TrailerPlan {
    /// Minimum number of trailers.
    pub fn trailer_count(&self) -> usize {
        self.value.round().max(0.0) as usize
    }

    /// Raw flow value `v` as returned by the solver.
    pub fn trailer_value(&self) -> f64 {
        self.value
    }

    pub fn flows(&self) -> &FlowMap {
        &self.flows
    }

    /// Flow on the edge `from → to`.
    pub fn flow(&self, from: &NodeKey, to: &NodeKey) -> Option<f64> {
        self.flows.get(&(from.clone(), to.clone())).copied()
    }

    /// Total flow per edge tag.
    pub fn tag_totals(&self) -> &BTreeMap<EdgeTag, f64> {
        &self.tag_totals
    }

    /// Total flow on edges tagged `tag`.
    pub fn edges_by_tag(&self, tag: EdgeTag) -> f64 {
        self.tag_totals.get(&tag).copied().unwrap_or(0.0)
    }

    /// Pool usage per location.
    pub fn pool_usage(&self) -> &BTreeMap<String, PoolUsage> {
        &self.pools
    }

    /// One entry per trailer, listing the legs it serves.
    pub fn trailer_chains(&self) -> &[TrailerChain] {
        &self.chains
    }

    /// `(trailer count value, flow map)`.
    pub fn into_parts(self) -> (f64, FlowMap) {
        (self.value, self.flows)
    }
}

/// Projects solver output back onto the graph.
#[derive(Debug, Clone, Copy)]
pub struct ResultExtractor {
    epsilon: f64,
}

impl Default for ResultExtractor {
    fn default() -> Self {
        Self { epsilon: 1e-6 }
    }
}

impl ResultExtractor {
    /// Creates an extractor treating values within `epsilon` of an integer
    /// as integral when decomposing flow into trailer chains.
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Builds the plan for `graph` from `solution`.
    ///
    /// # Errors
    ///
    /// [`SolveError::InternalError`] when the solution does not cover the
    /// graph's edges, or its flows cannot be decomposed into whole trailers.
    pub fn extract(
        &self,
        graph: &FlowGraph,
        solution: &FlowSolution,
    ) -> Result<TrailerPlan, SolveError> {
        if solution.flows.len() != graph.edge_count() {
            return Err(SolveError::InternalError(format!(
                "solution has {} edge flows for a graph with {} edges",
                solution.flows.len(),
                graph.edge_count()
            )));
        }

        let mut flows = FlowMap::new();
        let mut tag_totals: BTreeMap<EdgeTag, f64> =
            EdgeTag::ALL.iter().map(|&t| (t, 0.0)).collect();
        for edge in graph.edges() {
            let x = edge_flow(solution, edge.id().index())?;
            let key = (
                graph.node(edge.from()).key().clone(),
                graph.node(edge.to()).key().clone(),
            );
            *flows.entry(key).or_insert(0.0) += x;
            *tag_totals.entry(edge.tag()).or_insert(0.0) += x;
        }

        let mut pools = BTreeMap::new();
        for location in graph.locations() {
            let missing = || {
                SolveError::InternalError(format!("pool edges of {location} are missing"))
            };
            let (out, inn) = graph.pool(location).ok_or_else(missing)?;
            let drawn = graph.find_edge(graph.source(), out).ok_or_else(missing)?;
            let returned = graph.find_edge(inn, graph.sink()).ok_or_else(missing)?;
            pools.insert(
                location.to_string(),
                PoolUsage {
                    drawn: edge_flow(solution, drawn.index())?,
                    returned: edge_flow(solution, returned.index())?,
                },
            );
        }

        let chains = self.decompose(graph, solution)?;

        Ok(TrailerPlan {
            value: solution.value,
            flows,
            tag_totals,
            pools,
            chains,
        })
    }

    /// Splits the integral flow into source-to-sink walks, one per trailer.
    fn decompose(
        &self,
        graph: &FlowGraph,
        solution: &FlowSolution,
    ) -> Result<Vec<TrailerChain>, SolveError> {
        let mut remaining = Vec::with_capacity(solution.flows.len());
        for &x in &solution.flows {
            let r = x.round();
            if (x - r).abs() > self.epsilon || r < 0.0 {
                return Err(SolveError::InternalError(format!(
                    "flow {x} is not a whole number of trailers"
                )));
            }
            remaining.push(r as u64);
        }

        let mut chains = Vec::new();
        let source = graph.source();
        // every walk is bounded by the node count since the network is acyclic
        let max_steps = graph.node_count();
        while let Some(first) = next_hop(graph, source, &mut remaining) {
            let mut chain = TrailerChain {
                origin: graph.node(first).location().unwrap_or_default().to_string(),
                destination: String::new(),
                legs: Vec::new(),
            };
            let mut node = first;
            let mut steps = 0;
            while node != graph.sink() {
                let prev = node;
                node = next_hop(graph, node, &mut remaining).ok_or_else(|| {
                    SolveError::InternalError(format!(
                        "flow stops at {} before reaching the sink",
                        graph.node(prev).key()
                    ))
                })?;
                if let NodeKey::TrailerStart { route, sequence } = graph.node(prev).key() {
                    chain.legs.push(LegRef {
                        route: route.clone(),
                        sequence: *sequence,
                    });
                }
                if node == graph.sink() {
                    chain.destination = graph.node(prev).location().unwrap_or_default().to_string();
                }
                steps += 1;
                if steps > max_steps {
                    return Err(SolveError::InternalError(
                        "flow contains a cycle".into(),
                    ));
                }
            }
            chains.push(chain);
        }

        if let Some(e) = remaining.iter().position(|&r| r > 0) {
            let edge = graph.edge(crate::network::EdgeId(e));
            return Err(SolveError::InternalError(format!(
                "flow on {} -> {} is not reachable from the source",
                graph.node(edge.from()).key(),
                graph.node(edge.to()).key()
            )));
        }
        Ok(chains)
    }
}

/// Follows one unit of remaining flow out of `node`.
fn next_hop(graph: &FlowGraph, node: NodeId, remaining: &mut [u64]) -> Option<NodeId> {
    let e = graph
        .outgoing(node)
        .iter()
        .copied()
        .find(|e| remaining[e.index()] > 0)?;
    remaining[e.index()] -= 1;
    Some(graph.edge(e).to())
}

fn edge_flow(solution: &FlowSolution, index: usize) -> Result<f64, SolveError> {
    solution
        .flows
        .get(index)
        .copied()
        .ok_or_else(|| SolveError::InternalError(format!("no flow for edge {index}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{CirculationSolver, FlowModel, FlowSolver, SolverConfig};
    use crate::network::GraphBuilder;
    use crate::schedule::Leg;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

    fn at(hour: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::hours(hour)
    }

    fn plan(legs: &[Leg], bal_pool: bool) -> TrailerPlan {
        let graph = GraphBuilder::default().build(legs).unwrap();
        let model = FlowModel::build(&graph, bal_pool).unwrap();
        let solution = CirculationSolver::new()
            .solve(&model, &SolverConfig::default())
            .unwrap();
        ResultExtractor::default().extract(&graph, &solution).unwrap()
    }

    fn start(route: &str, sequence: u32) -> NodeKey {
        NodeKey::TrailerStart {
            route: route.into(),
            sequence,
        }
    }

    fn end(route: &str, sequence: u32) -> NodeKey {
        NodeKey::TrailerEnd {
            route: route.into(),
            sequence,
        }
    }

    #[test]
    fn test_flow_map_covers_every_edge() {
        let legs = vec![
            Leg::new("1", 1, "A", "B", at(0), at(4)),
            Leg::new("2", 1, "B", "A", at(10), at(14)),
        ];
        let graph = GraphBuilder::default().build(&legs).unwrap();
        let plan = plan(&legs, false);

        assert_eq!(plan.flows().len(), graph.edge_count());
        assert_eq!(plan.flow(&start("1", 1), &end("1", 1)), Some(1.0));
        assert_eq!(plan.flow(&end("1", 1), &start("2", 1)), Some(1.0));
        assert_eq!(plan.flow(&end("2", 1), &start("1", 1)), None);
        assert_eq!(plan.tag_totals()[&EdgeTag::Utilization], 2.0);
        assert_eq!(plan.edges_by_tag(EdgeTag::Reuse), 1.0);
    }

    #[test]
    fn test_chain_follows_reuse() {
        let legs = vec![
            Leg::new("1", 1, "A", "B", at(0), at(4)),
            Leg::new("2", 1, "B", "C", at(14), at(20)),
        ];
        let plan = plan(&legs, false);
        assert_eq!(plan.trailer_count(), 1);
        assert_eq!(
            plan.trailer_chains(),
            &[TrailerChain {
                origin: "A".into(),
                destination: "C".into(),
                legs: vec![
                    LegRef {
                        route: "1".into(),
                        sequence: 1
                    },
                    LegRef {
                        route: "2".into(),
                        sequence: 1
                    },
                ],
            }]
        );
    }

    #[test]
    fn test_pool_usage() {
        let legs = vec![
            Leg::new("1", 1, "A", "B", at(0), at(4)),
            Leg::new("2", 1, "C", "D", at(0), at(4)),
        ];
        let plan = plan(&legs, false);
        let pools = plan.pool_usage();
        assert_eq!(pools["A"], PoolUsage { drawn: 1.0, returned: 0.0 });
        assert_eq!(pools["B"].net(), 1.0);
        assert_eq!(pools["C"].drawn, 1.0);
        assert_eq!(pools["D"].returned, 1.0);
        assert_eq!(plan.trailer_chains().len(), 2);
    }

    #[test]
    fn test_into_parts() {
        let legs = vec![Leg::new("1", 1, "A", "B", at(0), at(4))];
        let (value, flows) = plan(&legs, false).into_parts();
        assert_eq!(value, 1.0);
        assert_eq!(
            flows[&(NodeKey::Source, NodeKey::LocationOut("A".into()))],
            1.0
        );
    }

    #[test]
    fn test_mismatched_solution_is_internal_error() {
        let legs = vec![Leg::new("1", 1, "A", "B", at(0), at(4))];
        let graph = GraphBuilder::default().build(&legs).unwrap();
        let solution = FlowSolution {
            value: 1.0,
            flows: vec![1.0; graph.edge_count() - 1],
            iterations: 0,
            solve_time_ms: 0,
        };
        assert!(matches!(
            ResultExtractor::default().extract(&graph, &solution),
            Err(SolveError::InternalError(_))
        ));
    }

    #[test]
    fn test_fractional_flow_is_internal_error() {
        let legs = vec![Leg::new("1", 1, "A", "B", at(0), at(4))];
        let graph = GraphBuilder::default().build(&legs).unwrap();
        let solution = FlowSolution {
            value: 0.5,
            flows: vec![0.5; graph.edge_count()],
            iterations: 0,
            solve_time_ms: 0,
        };
        assert!(matches!(
            ResultExtractor::default().extract(&graph, &solution),
            Err(SolveError::InternalError(_))
        ));
    }
}
