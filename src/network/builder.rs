//! Time-expanded network construction.
//!
//! # Topology
//!
//! ```text
//!            SourceToPool          Supply           Utilization          Return          PoolToSink
//!   s ──────────────▶ (A, out) ──────────▶ start ══════════════▶ end ──────────▶ (B, in) ──────────▶ t
//!                                            ▲                     │
//!                                            └──── Reuse ◀─────────┘ (other legs)
//! ```
//!
//! Utilization edges are pinned to one unit; every other edge is free.
//! A Reuse edge joins the end of leg `a` to the start of leg `b` when
//! `a.destination == b.origin` and `a.release < b.ready`.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::edge::EdgeTag;
use super::graph::FlowGraph;
use super::node::{NodeId, NodeKey};
use crate::error::SolveError;
use crate::schedule::Leg;

/// Graph construction settings.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuilderConfig {
    /// Enumerate reuse edges on the rayon thread pool.
    ///
    /// Only honored when the crate is built with the `parallel` feature.
    /// The resulting edge order is identical either way.
    pub parallel: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl BuilderConfig {
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Builds a [`FlowGraph`] from leg records.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use u_trailerflow::network::{EdgeTag, GraphBuilder};
/// use u_trailerflow::schedule::Leg;
///
/// let t = |h| NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(h, 0, 0).unwrap();
/// let legs = vec![
///     Leg::new("1", 0, "A", "B", t(0), t(4)),
///     Leg::new("2", 0, "B", "A", t(10), t(14)),
/// ];
/// let graph = GraphBuilder::default().build(&legs).unwrap();
/// assert_eq!(graph.count_by_tag(EdgeTag::Utilization), 2);
/// assert_eq!(graph.count_by_tag(EdgeTag::Reuse), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: BuilderConfig,
}

impl GraphBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Builds the network for `legs`.
    ///
    /// Node and edge order depend only on the set of legs, not on the
    /// order they are passed in.
    ///
    /// # Errors
    ///
    /// [`SolveError::MalformedInput`] when a `(route, sequence)` pair repeats,
    /// an identifier is blank, or a leg is released before it is ready.
    pub fn build(&self, legs: &[Leg]) -> Result<FlowGraph, SolveError> {
        let legs = validated(legs)?;

        let locations: BTreeSet<&str> = legs
            .iter()
            .flat_map(|l| [l.origin.as_str(), l.destination.as_str()])
            .collect();
        let routes: BTreeSet<&str> = legs.iter().map(|l| l.route.as_str()).collect();

        let mut graph = FlowGraph::new();
        let (source, sink) = (graph.source(), graph.sink());

        let mut pools: HashMap<&str, (NodeId, NodeId)> = HashMap::with_capacity(locations.len());
        for &loc in &locations {
            let out = graph.add_node(NodeKey::LocationOut(loc.into()), Some(loc.into()), None);
            let inn = graph.add_node(NodeKey::LocationIn(loc.into()), Some(loc.into()), None);
            pools.insert(loc, (out, inn));
        }

        let mut trailers: Vec<(NodeId, NodeId)> = Vec::with_capacity(legs.len());
        for leg in &legs {
            let start = graph.add_node(
                NodeKey::TrailerStart {
                    route: leg.route.clone(),
                    sequence: leg.sequence,
                },
                Some(leg.origin.clone()),
                Some(leg.ready),
            );
            let end = graph.add_node(
                NodeKey::TrailerEnd {
                    route: leg.route.clone(),
                    sequence: leg.sequence,
                },
                Some(leg.destination.clone()),
                Some(leg.release),
            );
            graph.add_edge(start, end, EdgeTag::Utilization);
            trailers.push((start, end));
        }

        for loc in &locations {
            let (out, inn) = pools[loc];
            graph.add_edge(source, out, EdgeTag::SourceToPool);
            graph.add_edge(inn, sink, EdgeTag::PoolToSink);
        }

        for (leg, &(start, end)) in legs.iter().zip(&trailers) {
            graph.add_edge(pools[leg.origin.as_str()].0, start, EdgeTag::Supply);
            graph.add_edge(end, pools[leg.destination.as_str()].1, EdgeTag::Return);
        }

        let index = StartIndex::new(&legs, &trailers);
        let ends: Vec<EndPoint<'_>> = legs
            .iter()
            .zip(&trailers)
            .map(|(leg, &(_, end))| EndPoint {
                node: end,
                location: leg.destination.as_str(),
                release: leg.release,
            })
            .collect();
        let reuse = collect_reuse(&ends, &index, self.config.parallel);
        debug!(reuse_edges = reuse.len(), "enumerated reuse transitions");
        for (end, start) in reuse {
            graph.add_edge(end, start, EdgeTag::Reuse);
        }

        info!(
            legs = legs.len(),
            routes = routes.len(),
            locations = locations.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built trailer network"
        );
        Ok(graph)
    }
}

/// Checks leg records and returns them sorted by `(route, sequence)`.
fn validated(legs: &[Leg]) -> Result<Vec<&Leg>, SolveError> {
    let mut seen: HashSet<(&str, u32)> = HashSet::with_capacity(legs.len());
    for leg in legs {
        if leg.route.trim().is_empty() {
            return Err(SolveError::MalformedInput(format!(
                "leg {} has an empty route id",
                leg.sequence
            )));
        }
        if leg.origin.trim().is_empty() || leg.destination.trim().is_empty() {
            return Err(SolveError::MalformedInput(format!(
                "leg ({}, {}) has an empty location code",
                leg.route, leg.sequence
            )));
        }
        if leg.release < leg.ready {
            return Err(SolveError::MalformedInput(format!(
                "leg ({}, {}) is released at {} before it is ready at {}",
                leg.route, leg.sequence, leg.release, leg.ready
            )));
        }
        if !seen.insert(leg.key()) {
            return Err(SolveError::MalformedInput(format!(
                "duplicate leg ({}, {})",
                leg.route, leg.sequence
            )));
        }
    }
    let mut sorted: Vec<&Leg> = legs.iter().collect();
    sorted.sort_by(|a, b| a.key().cmp(&b.key()));
    Ok(sorted)
}

/// Trailer-end side of a candidate reuse transition.
struct EndPoint<'a> {
    node: NodeId,
    location: &'a str,
    release: NaiveDateTime,
}

/// Trailer-start nodes grouped by origin, sorted by ready time.
struct StartIndex<'a> {
    by_origin: HashMap<&'a str, Vec<(NaiveDateTime, NodeId)>>,
}

impl<'a> StartIndex<'a> {
    fn new(legs: &[&'a Leg], trailers: &[(NodeId, NodeId)]) -> Self {
        let mut by_origin: HashMap<&'a str, Vec<(NaiveDateTime, NodeId)>> = HashMap::new();
        for (&leg, &(start, _)) in legs.iter().zip(trailers) {
            by_origin
                .entry(leg.origin.as_str())
                .or_default()
                .push((leg.ready, start));
        }
        for starts in by_origin.values_mut() {
            starts.sort();
        }
        Self { by_origin }
    }

    /// Start nodes at `end.location` that become ready strictly after
    /// `end.release`, as `(end, start)` pairs.
    fn successors(&self, end: &EndPoint<'_>) -> Vec<(NodeId, NodeId)> {
        let Some(starts) = self.by_origin.get(end.location) else {
            return Vec::new();
        };
        let first = starts.partition_point(|&(ready, _)| ready <= end.release);
        starts[first..]
            .iter()
            .map(|&(_, start)| (end.node, start))
            .collect()
    }
}

#[cfg(feature = "parallel")]
fn collect_reuse(
    ends: &[EndPoint<'_>],
    index: &StartIndex<'_>,
    parallel: bool,
) -> Vec<(NodeId, NodeId)> {
    use rayon::prelude::*;

    if parallel {
        let chunks: Vec<Vec<(NodeId, NodeId)>> =
            ends.par_iter().map(|end| index.successors(end)).collect();
        chunks.into_iter().flatten().collect()
    } else {
        ends.iter().flat_map(|end| index.successors(end)).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn collect_reuse(
    ends: &[EndPoint<'_>],
    index: &StartIndex<'_>,
    _parallel: bool,
) -> Vec<(NodeId, NodeId)> {
    ends.iter().flat_map(|end| index.successors(end)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::TimeDelta::hours(hour as i64)
    }

    fn leg(route: &str, seq: u32, from: &str, to: &str, ready: u32, release: u32) -> Leg {
        Leg::new(route, seq, from, to, at(ready), at(release))
    }

    fn reuse_pairs(graph: &FlowGraph) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = graph
            .edges()
            .iter()
            .filter(|e| e.tag() == EdgeTag::Reuse)
            .map(|e| {
                (
                    graph.node(e.from()).key().to_string(),
                    graph.node(e.to()).key().to_string(),
                )
            })
            .collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_counts_per_tag() {
        let legs = vec![
            leg("1", 1, "A", "B", 0, 5),
            leg("1", 2, "B", "C", 6, 12),
            leg("2", 1, "C", "A", 20, 30),
        ];
        let graph = GraphBuilder::default().build(&legs).unwrap();

        // s, t, 3 locations x 2, 3 legs x 2
        assert_eq!(graph.node_count(), 2 + 6 + 6);
        assert_eq!(graph.count_by_tag(EdgeTag::SourceToPool), 3);
        assert_eq!(graph.count_by_tag(EdgeTag::PoolToSink), 3);
        assert_eq!(graph.count_by_tag(EdgeTag::Supply), 3);
        assert_eq!(graph.count_by_tag(EdgeTag::Return), 3);
        assert_eq!(graph.count_by_tag(EdgeTag::Utilization), 3);
        // (1,1)->(1,2) at B: 5 < 6; (1,2)->(2,1) at C: 12 < 20
        assert_eq!(graph.count_by_tag(EdgeTag::Reuse), 2);
    }

    #[test]
    fn test_node_attributes() {
        let legs = vec![leg("1", 1, "A", "B", 2, 9)];
        let graph = GraphBuilder::default().build(&legs).unwrap();
        let (start, end) = graph.trailer("1", 1).unwrap();
        assert_eq!(graph.node(start).location(), Some("A"));
        assert_eq!(graph.node(start).time(), Some(at(2)));
        assert_eq!(graph.node(end).location(), Some("B"));
        assert_eq!(graph.node(end).time(), Some(at(9)));
        assert_eq!(graph.find_edge(start, end).map(|e| graph.edge(e).tag()), Some(EdgeTag::Utilization));
    }

    #[test]
    fn test_destination_only_location_gets_pool() {
        let legs = vec![leg("1", 1, "A", "Z", 0, 5)];
        let graph = GraphBuilder::default().build(&legs).unwrap();
        assert!(graph.pool("Z").is_some());
        assert_eq!(graph.locations().collect::<Vec<_>>(), vec!["A", "Z"]);
    }

    #[test]
    fn test_reuse_requires_matching_location() {
        let legs = vec![leg("1", 1, "A", "B", 0, 5), leg("2", 1, "C", "D", 10, 15)];
        let graph = GraphBuilder::default().build(&legs).unwrap();
        assert_eq!(graph.count_by_tag(EdgeTag::Reuse), 0);
    }

    #[test]
    fn test_reuse_requires_strictly_earlier_release() {
        let equal = vec![leg("1", 1, "A", "B", 0, 5), leg("2", 1, "B", "C", 5, 9)];
        let graph = GraphBuilder::default().build(&equal).unwrap();
        assert_eq!(graph.count_by_tag(EdgeTag::Reuse), 0);

        let later = vec![leg("1", 1, "A", "B", 0, 5), leg("2", 1, "B", "C", 4, 9)];
        let graph = GraphBuilder::default().build(&later).unwrap();
        assert_eq!(graph.count_by_tag(EdgeTag::Reuse), 0);

        let earlier = vec![leg("1", 1, "A", "B", 0, 5), leg("2", 1, "B", "C", 6, 9)];
        let graph = GraphBuilder::default().build(&earlier).unwrap();
        assert_eq!(
            reuse_pairs(&graph),
            vec![("(1, 1, end)".to_string(), "(2, 1, start)".to_string())]
        );
    }

    #[test]
    fn test_reuse_matches_brute_force_predicate() {
        let legs = vec![
            leg("1", 1, "A", "B", 0, 4),
            leg("1", 2, "B", "A", 5, 9),
            leg("2", 1, "B", "A", 3, 8),
            leg("2", 2, "A", "B", 9, 14),
            leg("3", 1, "A", "A", 10, 11),
            leg("3", 2, "A", "B", 12, 20),
        ];
        let graph = GraphBuilder::default().build(&legs).unwrap();

        let mut expected: Vec<(String, String)> = Vec::new();
        for a in &legs {
            for b in &legs {
                if a.key() != b.key() && a.can_precede(b) {
                    expected.push((
                        format!("({}, {}, end)", a.route, a.sequence),
                        format!("({}, {}, start)", b.route, b.sequence),
                    ));
                }
            }
        }
        expected.sort();
        assert_eq!(reuse_pairs(&graph), expected);
    }

    #[test]
    fn test_duplicate_leg_rejected() {
        let legs = vec![leg("1", 1, "A", "B", 0, 5), leg("1", 1, "B", "C", 6, 9)];
        let err = GraphBuilder::default().build(&legs).unwrap_err();
        assert!(matches!(err, SolveError::MalformedInput(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_release_before_ready_rejected() {
        let legs = vec![leg("1", 1, "A", "B", 5, 4)];
        assert!(GraphBuilder::default().build(&legs).is_err());
    }

    #[test]
    fn test_blank_location_rejected() {
        let legs = vec![leg("1", 1, "A", " ", 0, 4)];
        assert!(GraphBuilder::default().build(&legs).is_err());
    }

    #[test]
    fn test_empty_input_gives_terminals_only() {
        let graph = GraphBuilder::default().build(&[]).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_build_is_order_independent() {
        let legs = vec![
            leg("1", 1, "A", "B", 0, 4),
            leg("1", 2, "B", "A", 5, 9),
            leg("2", 1, "B", "A", 3, 8),
            leg("2", 2, "A", "B", 9, 14),
        ];
        let mut reversed = legs.clone();
        reversed.reverse();

        let builder = GraphBuilder::new(BuilderConfig::default().with_parallel(false));
        let a = builder.build(&legs).unwrap();
        let b = builder.build(&reversed).unwrap();
        let c = builder.build(&legs).unwrap();

        assert_eq!(a.tag_counts(), b.tag_counts());
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature(), c.signature());
        // arena order is canonical too
        let keys = |g: &FlowGraph| g.nodes().iter().map(|n| n.key().clone()).collect::<Vec<_>>();
        assert_eq!(keys(&a), keys(&b));
    }

    #[test]
    fn test_parallel_flag_does_not_change_graph() {
        let legs = vec![
            leg("1", 1, "A", "B", 0, 4),
            leg("2", 1, "B", "A", 6, 8),
            leg("3", 1, "A", "B", 10, 12),
            leg("4", 1, "B", "A", 14, 16),
        ];
        let seq = GraphBuilder::new(BuilderConfig::default().with_parallel(false))
            .build(&legs)
            .unwrap();
        let par = GraphBuilder::new(BuilderConfig::default().with_parallel(true))
            .build(&legs)
            .unwrap();
        let edges = |g: &FlowGraph| {
            g.edges()
                .iter()
                .map(|e| (e.from(), e.to(), e.tag()))
                .collect::<Vec<_>>()
        };
        assert_eq!(edges(&seq), edges(&par));
    }
}
