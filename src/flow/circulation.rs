//! Combinatorial minimum-flow solver.
//!
//! # Algorithm
//!
//! 1. Close the network into a circulation. Each pool-balance pair
//!    `(s → Out(l), In(l) → t)` is replaced by a single return arc
//!    `In(l) → Out(l)`; all remaining source/sink traffic closes through a
//!    `t → s` arc. Both kinds of closing arc cost 1, every other arc 0, so
//!    the circulation cost equals the flow value `v`.
//! 2. Shift lower bounds into node excesses: an arc with bounds `[l, u]`
//!    becomes capacity `u - l`, its head gains `l`, its tail loses `l`.
//! 3. Route all excess from a super-source to a super-sink with successive
//!    shortest augmenting paths (SPFA on the residual network). Starting
//!    from zero flow with non-negative costs, each augmentation keeps the
//!    residual network free of negative cycles, so the final circulation
//!    has minimum cost.
//! 4. If some excess cannot be routed, the bounds and conservation rows are
//!    jointly infeasible.
//!
//! The number of augmentations is bounded by the total lower bound (one per
//! leg), each costing one shortest-path search.
//!
//! # Reference
//!
//! Ahuja, Magnanti & Orlin (1993), *Network Flows*, §6.7 (flows with lower
//! bounds) and §9.7 (successive shortest paths).

use std::collections::VecDeque;
use std::time::Instant;

use tracing::debug;

use super::model::FlowModel;
use super::solver::{finalize, FlowSolution, FlowSolver, SolverConfig};
use crate::error::SolveError;
use crate::network::{FlowGraph, NodeId, NodeKey};

/// Capacity standing in for "no upper bound".
const UNBOUNDED: i64 = i64::MAX / 4;

/// Min-cost circulation solver for [`FlowModel`]s.
///
/// Requires integral bounds, which trailer networks always have.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_trailerflow::flow::{CirculationSolver, FlowModel, FlowSolver, SolverConfig};
/// use u_trailerflow::network::GraphBuilder;
/// use u_trailerflow::schedule::Leg;
///
/// let t = |h| NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, 0, 0).unwrap();
/// let legs = vec![
///     Leg::new("1", 0, "A", "B", t(0), t(4)),
///     Leg::new("2", 0, "B", "A", t(10), t(14)),
/// ];
/// let graph = GraphBuilder::default().build(&legs).unwrap();
/// let model = FlowModel::build(&graph, false).unwrap();
/// let solution = CirculationSolver::new().solve(&model, &SolverConfig::default()).unwrap();
/// assert_eq!(solution.trailer_count(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CirculationSolver;

impl CirculationSolver {
    pub fn new() -> Self {
        Self
    }
}

impl FlowSolver for CirculationSolver {
    fn name(&self) -> &'static str {
        "circulation"
    }

    fn solve(
        &self,
        model: &FlowModel<'_>,
        config: &SolverConfig,
    ) -> Result<FlowSolution, SolveError> {
        config.validate().map_err(SolveError::MalformedInput)?;
        let started = Instant::now();
        let eps = config.epsilon;

        let graph = model.graph();
        let n = graph.node_count();
        let (super_source, super_sink) = (n, n + 1);
        let mut net = Residual::new(n + 2);
        let mut excess = vec![0i64; n];

        // Balance pairs collapse into one return arc per location.
        let mut paired: Vec<Option<usize>> = vec![None; graph.edge_count()];
        let mut return_arcs = Vec::with_capacity(model.balance_pairs().len());
        for (k, pair) in model.balance_pairs().iter().enumerate() {
            let drawn = graph.edge(pair.drawn);
            let returned = graph.edge(pair.returned);
            let free = |e| {
                let b = model.bounds(e);
                b.lower == 0.0 && b.upper.is_none()
            };
            if drawn.from() != graph.source()
                || returned.to() != graph.sink()
                || !free(pair.drawn)
                || !free(pair.returned)
            {
                return Err(SolveError::ModelConstructionError(format!(
                    "pool balance at {} must pair free source and sink edges",
                    pair.location
                )));
            }
            paired[pair.drawn.index()] = Some(k);
            paired[pair.returned.index()] = Some(k);
            return_arcs.push(net.add_arc(returned.from().index(), drawn.to().index(), UNBOUNDED, 1));
        }

        let mut arcs: Vec<Option<(usize, usize)>> = vec![None; graph.edge_count()];
        let mut lowers = vec![0i64; graph.edge_count()];
        for edge in graph.edges() {
            let idx = edge.id().index();
            if paired[idx].is_some() {
                continue;
            }
            let bounds = model.bounds(edge.id());
            let lower = integral(bounds.lower, eps)?;
            let upper = match bounds.upper {
                Some(u) => integral(u, eps)?,
                None => UNBOUNDED,
            };
            if upper < lower {
                return Err(SolveError::ModelConstructionError(format!(
                    "edge {idx} has upper bound {upper} below lower bound {lower}"
                )));
            }
            let (from, to) = (edge.from().index(), edge.to().index());
            arcs[idx] = Some(net.add_arc(from, to, upper - lower, 0));
            lowers[idx] = lower;
            excess[to] += lower;
            excess[from] -= lower;
        }
        let closing = net.add_arc(graph.sink().index(), graph.source().index(), UNBOUNDED, 1);

        let mut demand = 0i64;
        let mut feeders: Vec<(usize, (usize, usize))> = Vec::new();
        for (node, &e) in excess.iter().enumerate() {
            if e > 0 {
                feeders.push((node, net.add_arc(super_source, node, e, 0)));
                demand += e;
            } else if e < 0 {
                feeders.push((node, net.add_arc(node, super_sink, -e, 0)));
            }
        }

        let mut routed = 0i64;
        let mut augmentations = 0usize;
        while routed < demand {
            let Some(path) = net.shortest_path(super_source, super_sink) else {
                break;
            };
            let bottleneck = path
                .iter()
                .map(|&(u, i)| net.adj[u][i].cap)
                .min()
                .unwrap_or(0);
            let push = bottleneck.min(demand - routed);
            if push <= 0 {
                break;
            }
            net.augment(&path, push);
            routed += push;
            augmentations += 1;
        }
        debug!(demand, routed, augmentations, "routed lower-bound excess");

        if routed < demand {
            let mut violated: Vec<String> = feeders
                .iter()
                .filter(|&&(_, at)| net.residual(at) > 0)
                .map(|&(node, _)| node_label(graph, NodeId(node)))
                .collect();
            violated.dedup();
            return Err(SolveError::Infeasible { violated });
        }

        let mut flows = vec![0.0; graph.edge_count()];
        for (idx, flow) in flows.iter_mut().enumerate() {
            *flow = match (paired[idx], arcs[idx]) {
                (Some(k), _) => net.flow(return_arcs[k]) as f64,
                (None, Some(at)) => (lowers[idx] + net.flow(at)) as f64,
                (None, None) => 0.0,
            };
        }
        let value = net.flow(closing) + return_arcs.iter().map(|&at| net.flow(at)).sum::<i64>();

        finalize(model, config, flows, value as f64, augmentations, started)
    }
}

fn integral(x: f64, eps: f64) -> Result<i64, SolveError> {
    let r = x.round();
    if !x.is_finite() || (x - r).abs() > eps {
        return Err(SolveError::ModelConstructionError(format!(
            "circulation solver requires integral bounds, got {x}"
        )));
    }
    Ok(r as i64)
}

fn node_label(graph: &FlowGraph, id: NodeId) -> String {
    match graph.node(id).key() {
        NodeKey::Source => "source outflow equals v".to_string(),
        NodeKey::Sink => "sink inflow equals v".to_string(),
        key => format!("conservation at {key}"),
    }
}

#[derive(Debug, Clone)]
struct Arc {
    to: usize,
    cap: i64,
    cost: i64,
    rev: usize,
}

/// Residual network stored as adjacency lists of paired arcs.
#[derive(Debug, Clone)]
struct Residual {
    adj: Vec<Vec<Arc>>,
}

impl Residual {
    fn new(n: usize) -> Self {
        Self {
            adj: vec![Vec::new(); n],
        }
    }

    /// Adds `from → to` and its zero-capacity reverse; returns the forward
    /// arc's position.
    fn add_arc(&mut self, from: usize, to: usize, cap: i64, cost: i64) -> (usize, usize) {
        let fwd = self.adj[from].len();
        let back = self.adj[to].len() + usize::from(from == to);
        self.adj[from].push(Arc {
            to,
            cap,
            cost,
            rev: back,
        });
        self.adj[to].push(Arc {
            to: from,
            cap: 0,
            cost: -cost,
            rev: fwd,
        });
        (from, fwd)
    }

    /// Flow currently on a forward arc.
    fn flow(&self, (u, i): (usize, usize)) -> i64 {
        let arc = &self.adj[u][i];
        self.adj[arc.to][arc.rev].cap
    }

    fn residual(&self, (u, i): (usize, usize)) -> i64 {
        self.adj[u][i].cap
    }

    /// Cheapest path with positive residual capacity, as arc positions from
    /// `s` to `t`.
    fn shortest_path(&self, s: usize, t: usize) -> Option<Vec<(usize, usize)>> {
        let n = self.adj.len();
        let mut dist = vec![i64::MAX; n];
        let mut prev: Vec<Option<(usize, usize)>> = vec![None; n];
        let mut queued = vec![false; n];
        let mut queue = VecDeque::new();

        dist[s] = 0;
        queue.push_back(s);
        queued[s] = true;
        while let Some(u) = queue.pop_front() {
            queued[u] = false;
            for (i, arc) in self.adj[u].iter().enumerate() {
                if arc.cap <= 0 {
                    continue;
                }
                let candidate = dist[u] + arc.cost;
                if candidate < dist[arc.to] {
                    dist[arc.to] = candidate;
                    prev[arc.to] = Some((u, i));
                    if !queued[arc.to] {
                        queued[arc.to] = true;
                        queue.push_back(arc.to);
                    }
                }
            }
        }
        if dist[t] == i64::MAX {
            return None;
        }

        let mut path = Vec::new();
        let mut v = t;
        while v != s {
            let (u, i) = prev[v]?;
            path.push((u, i));
            v = u;
        }
        path.reverse();
        Some(path)
    }

    fn augment(&mut self, path: &[(usize, usize)], amount: i64) {
        for &(u, i) in path {
            let (to, rev) = {
                let arc = &mut self.adj[u][i];
                arc.cap -= amount;
                (arc.to, arc.rev)
            };
            self.adj[to][rev].cap += amount;
        }
    }
}
