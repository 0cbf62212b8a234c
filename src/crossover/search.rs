//! Best-first branch and bound over group commitments.
//!
//! The open nodes live in a plain vector and the next node is found by a
//! linear scan for the smallest bound (first found wins ties). Pruning is
//! aggressive enough that the buffer stays small in practice; swapping in a
//! heap keyed by `(bound, insertion order)` would not change the result.
//!
//! A node is expanded by resolving its relaxation. A single cycle is a tour
//! and may replace the incumbent. Otherwise the search branches on the
//! subtour with the fewest free arcs. With `g_0 .. g_{m-1}` the free groups
//! on that subtour, child `j` keeps `g_0 .. g_{j-1}` on their relaxed parent
//! and forces `g_j` to the other one, so `g_j` is the first group that breaks
//! the subtour.

use super::grouping::ArcGrouping;
use super::relaxation::{AssignmentRelaxation, Decision};
use super::subtour::{SubtourDetector, SubtourScan};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How often (in expanded nodes) the clock is read
const TIME_CHECK_INTERVAL: usize = 256;

/// Limits that end the search early with the incumbent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchLimits {
    pub max_expanded_nodes: Option<usize>,
    pub max_open_nodes: usize,
    /// Seconds
    pub time_limit: Option<f64>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_expanded_nodes: Some(1_000_000),
            max_open_nodes: 1_000_000,
            time_limit: None,
        }
    }
}

/// Why the search stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Termination {
    /// No open node can beat the incumbent: the result is optimal over all
    /// group combinations.
    #[default]
    Exhausted,
    NodeLimit,
    OpenNodeLimit,
    TimeLimit,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Termination::Exhausted => "exhausted",
            Termination::NodeLimit => "node-limit",
            Termination::OpenNodeLimit => "open-node-limit",
            Termination::TimeLimit => "time-limit",
        };
        f.write_str(s)
    }
}

/// Counters collected during one search
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStatistics {
    pub groups: usize,
    pub shared_arcs: usize,
    pub root_bound: i64,
    pub nodes_expanded: usize,
    pub nodes_pruned: usize,
    /// Children dropped because their fixed arcs already close a subtour,
    /// plus nodes whose smallest subtour has no free group left
    pub nodes_infeasible: usize,
    pub peak_open_nodes: usize,
    pub improvements: usize,
    pub termination: Termination,
    /// Seconds
    pub elapsed: f64,
}

/// Best complete assignment found so far
#[derive(Debug, Default)]
pub struct Incumbent {
    pub length: i64,
    pub adjacency: Vec<usize>,
    pub improved: bool,
}

impl Incumbent {
    pub fn seed(&mut self, length: i64, adjacency: &[usize]) {
        self.length = length;
        self.adjacency.clear();
        self.adjacency.extend_from_slice(adjacency);
        self.improved = false;
    }

    fn update(&mut self, length: i64, adjacency: &[usize]) {
        self.length = length;
        self.adjacency.copy_from_slice(adjacency);
        self.improved = true;
    }
}

/// A partial commitment and its lower bound
#[derive(Debug)]
struct SearchNode {
    bound: i64,
    decisions: Vec<Decision>,
}

/// Search engine. Keeps its open buffer and a pool of decision vectors
/// across runs.
#[derive(Debug, Default)]
pub struct BranchAndBound {
    open: Vec<SearchNode>,
    pool: Vec<Vec<Decision>>,
    branch: Vec<usize>,
    stats: SearchStatistics,
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preallocated(n: usize) -> Self {
        BranchAndBound {
            open: Vec::with_capacity(64),
            pool: Vec::with_capacity(64),
            branch: Vec::with_capacity(n),
            stats: SearchStatistics::default(),
        }
    }

    pub fn statistics(&self) -> &SearchStatistics {
        &self.stats
    }

    fn take_decisions(&mut self) -> Vec<Decision> {
        self.pool.pop().unwrap_or_default()
    }

    fn recycle(&mut self, mut decisions: Vec<Decision>) {
        decisions.clear();
        self.pool.push(decisions);
    }

    fn clear_open(&mut self) {
        while let Some(node) = self.open.pop() {
            self.recycle(node.decisions);
        }
    }

    /// Search for a tour shorter than `incumbent.length`.
    ///
    /// `incumbent` must already hold a complete tour (one of the parents).
    pub fn run(
        &mut self,
        grouping: &ArcGrouping,
        relaxation: &mut AssignmentRelaxation,
        detector: &mut SubtourDetector,
        incumbent: &mut Incumbent,
        limits: &SearchLimits,
    ) -> Termination {
        let started = Instant::now();
        self.clear_open();
        relaxation.prepare(grouping);
        detector.prepare(grouping);

        let root_bound = relaxation.lower_bound(grouping, &[]);
        self.stats = SearchStatistics {
            groups: grouping.len(),
            shared_arcs: grouping.shared_rows().len(),
            root_bound,
            ..SearchStatistics::default()
        };

        let root = self.take_decisions();
        self.open.push(SearchNode {
            bound: root_bound,
            decisions: root,
        });

        let termination = loop {
            let Some(index) = self.select(incumbent.length) else {
                break Termination::Exhausted;
            };

            if limits.max_expanded_nodes.is_some_and(|max| self.stats.nodes_expanded >= max) {
                break Termination::NodeLimit;
            }
            if let Some(limit) = limits.time_limit {
                if self.stats.nodes_expanded % TIME_CHECK_INTERVAL == 0 && started.elapsed().as_secs_f64() >= limit {
                    break Termination::TimeLimit;
                }
            }

            let node = self.open.swap_remove(index);
            self.stats.nodes_expanded += 1;
            let overflow = self.expand(&node, grouping, relaxation, detector, incumbent, limits);
            self.recycle(node.decisions);

            if overflow {
                break Termination::OpenNodeLimit;
            }
        };

        self.clear_open();
        self.stats.termination = termination;
        self.stats.elapsed = started.elapsed().as_secs_f64();
        termination
    }

    /// Drop nodes that cannot beat `best` and return the index of the
    /// smallest remaining bound.
    fn select(&mut self, best: i64) -> Option<usize> {
        let mut selected: Option<usize> = None;
        let mut i = 0;
        while i < self.open.len() {
            if self.open[i].bound >= best {
                let node = self.open.swap_remove(i);
                self.recycle(node.decisions);
                self.stats.nodes_pruned += 1;
                continue;
            }
            if selected.map_or(true, |s| self.open[i].bound < self.open[s].bound) {
                selected = Some(i);
            }
            i += 1;
        }
        selected
    }

    /// Returns true if the open buffer hit its cap.
    fn expand(
        &mut self,
        node: &SearchNode,
        grouping: &ArcGrouping,
        relaxation: &mut AssignmentRelaxation,
        detector: &mut SubtourDetector,
        incumbent: &mut Incumbent,
        limits: &SearchLimits,
    ) -> bool {
        let cost = relaxation.resolve(grouping, &node.decisions);
        debug_assert_eq!(cost, node.bound, "cached bound out of sync with relaxation");

        let scan = detector.scan(relaxation.assigned(), grouping, relaxation.committed());
        let start = match scan {
            SubtourScan::Complete => {
                if cost < incumbent.length {
                    log::debug!(
                        "incumbent improved {} -> {} after {} nodes",
                        incumbent.length,
                        cost,
                        self.stats.nodes_expanded
                    );
                    incumbent.update(cost, relaxation.assigned());
                    self.stats.improvements += 1;
                }
                relaxation.release(&node.decisions);
                return false;
            }
            SubtourScan::Subtour { start, .. } => start,
        };

        let mut branch = std::mem::take(&mut self.branch);
        detector.free_groups_on(start, relaxation.assigned(), grouping, relaxation.committed(), &mut branch);
        relaxation.release(&node.decisions);

        if branch.is_empty() {
            self.stats.nodes_infeasible += 1;
        }

        let mut overflow = false;
        for (j, &group) in branch.iter().enumerate() {
            let weights = grouping.weights(group);
            let bound = node.bound + weights.switch_cost();
            if bound >= incumbent.length {
                self.stats.nodes_pruned += 1;
                continue;
            }

            let mut decisions = self.take_decisions();
            decisions.extend_from_slice(&node.decisions);
            decisions.extend(
                branch[..j]
                    .iter()
                    .map(|&g| Decision::new(g, grouping.weights(g).relaxed())),
            );
            decisions.push(Decision::new(group, weights.relaxed().opposite()));

            if detector.closes_fixed_cycle(grouping, &decisions) {
                self.stats.nodes_infeasible += 1;
                self.recycle(decisions);
                continue;
            }

            if self.open.len() >= limits.max_open_nodes {
                self.recycle(decisions);
                overflow = true;
                break;
            }

            self.open.push(SearchNode { bound, decisions });
            self.stats.peak_open_nodes = self.stats.peak_open_nodes.max(self.open.len());
        }

        self.branch = branch;
        overflow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{DistanceOracle, Instance, Point};
    use crate::crossover::grouping::Parent;

    fn run_search(inst: &Instance, p1: &[usize], p2: &[usize], limits: SearchLimits) -> (Incumbent, SearchStatistics) {
        let mut grouping = ArcGrouping::new();
        grouping.preprocess(inst, p1, p2);
        let l1 = grouping.parent_length(Parent::First);
        let l2 = grouping.parent_length(Parent::Second);
        let seed = if l2 < l1 { Parent::Second } else { Parent::First };

        let mut incumbent = Incumbent::default();
        incumbent.seed(l1.min(l2), grouping.adjacency(seed));

        let mut relaxation = AssignmentRelaxation::new();
        let mut detector = SubtourDetector::new();
        let mut search = BranchAndBound::new();
        search.run(&grouping, &mut relaxation, &mut detector, &mut incumbent, &limits);
        (incumbent, *search.statistics())
    }

    /// Two parallel rows of cities; the best tour runs along both rows.
    fn ladder() -> Instance {
        let mut points = Vec::new();
        for i in 0..4 {
            points.push(Point::new(i as f64 * 10.0, 0.0));
        }
        for i in (0..4).rev() {
            points.push(Point::new(i as f64 * 10.0, 10.0));
        }
        Instance::euclidean("ladder", points).unwrap()
    }

    #[test]
    fn test_search_finds_recombined_tour() {
        let inst = ladder();
        // each parent is good on one row and bad on the other
        let p1 = [0, 1, 2, 3, 5, 4, 6, 7];
        let p2 = [0, 2, 1, 3, 4, 5, 6, 7];
        let (incumbent, stats) = run_search(&inst, &p1, &p2, SearchLimits::default());

        assert_eq!(stats.termination, Termination::Exhausted);
        assert!(incumbent.improved);
        assert_eq!(incumbent.length, 80);
        assert!(incumbent.length < inst.evaluate(&p1).min(inst.evaluate(&p2)));
        assert!(stats.root_bound <= incumbent.length);
    }

    #[test]
    fn test_identical_parents_explore_nothing() {
        let inst = ladder();
        let p = [0, 1, 2, 3, 4, 5, 6, 7];
        let (incumbent, stats) = run_search(&inst, &p, &p, SearchLimits::default());

        assert!(!incumbent.improved);
        assert_eq!(incumbent.length, 80);
        assert_eq!(stats.groups, 0);
        assert_eq!(stats.shared_arcs, 8);
        assert_eq!(stats.nodes_expanded, 0);
        assert_eq!(stats.nodes_pruned, 1);
    }

    #[test]
    fn test_node_limit_keeps_incumbent() {
        let inst = ladder();
        let p1 = [0, 1, 2, 3, 5, 4, 6, 7];
        let p2 = [0, 2, 1, 3, 4, 5, 6, 7];
        let limits = SearchLimits {
            max_expanded_nodes: Some(0),
            ..SearchLimits::default()
        };
        let (incumbent, stats) = run_search(&inst, &p1, &p2, limits);

        assert_eq!(stats.termination, Termination::NodeLimit);
        assert!(!incumbent.improved);
        assert_eq!(incumbent.length, inst.evaluate(&p1).min(inst.evaluate(&p2)));
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(Termination::Exhausted.to_string(), "exhausted");
        assert_eq!(Termination::OpenNodeLimit.to_string(), "open-node-limit");
    }
}
