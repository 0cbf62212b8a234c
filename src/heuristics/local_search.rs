//! Local search improvement heuristics.
//!
//! Used by the benchmark harness to turn random tours into locally optimal
//! parents, which is what a memetic algorithm hands to its crossover.

use crate::instance::DistanceOracle;
use crate::solution::Individual;

/// Trait for local search improvement methods
pub trait LocalSearch {
    fn improve(&self, oracle: &dyn DistanceOracle, individual: &mut Individual) -> bool;
    fn name(&self) -> &str;
}

/// 2-Opt Local Search
///
/// Reverses segments of the tour while that shortens it.
pub struct TwoOptSearch {
    /// Use first improvement instead of best improvement
    pub first_improvement: bool,
    /// Maximum number of improving passes
    pub max_passes: usize,
}

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch {
            first_improvement: false,
            max_passes: 1000,
        }
    }

    pub fn first_improvement() -> Self {
        TwoOptSearch {
            first_improvement: true,
            max_passes: 1000,
        }
    }

    /// Change in length when reversing `tour[i + 1..=j]`
    fn delta(oracle: &dyn DistanceOracle, tour: &[usize], i: usize, j: usize) -> i64 {
        let n = tour.len();
        let a = tour[i];
        let b = tour[i + 1];
        let c = tour[j];
        let d = tour[(j + 1) % n];

        if oracle.is_symmetric() {
            return oracle.distance(a, c) + oracle.distance(b, d) - oracle.distance(a, b) - oracle.distance(c, d);
        }

        // the reversed segment runs backwards, so its inner arcs change too
        let mut before = oracle.distance(a, b) + oracle.distance(c, d);
        let mut after = oracle.distance(a, c) + oracle.distance(b, d);
        for k in i + 1..j {
            before += oracle.distance(tour[k], tour[k + 1]);
            after += oracle.distance(tour[k + 1], tour[k]);
        }
        after - before
    }
}

impl Default for TwoOptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, oracle: &dyn DistanceOracle, individual: &mut Individual) -> bool {
        let n = individual.solution.len();
        if n < 4 {
            return false;
        }

        let tour = &mut individual.solution;
        let mut total_improved = false;

        for _ in 0..self.max_passes {
            let mut best_delta = 0;
            let mut best_move = None;

            'outer: for i in 0..n - 2 {
                for j in i + 2..n {
                    if i == 0 && j == n - 1 {
                        continue; // reversing everything but one city is the same tour
                    }

                    let delta = Self::delta(oracle, tour, i, j);
                    if delta < best_delta {
                        best_delta = delta;
                        best_move = Some((i, j));
                        if self.first_improvement {
                            break 'outer;
                        }
                    }
                }
            }

            match best_move {
                Some((i, j)) => {
                    tour[i + 1..=j].reverse();
                    individual.tour_length += best_delta;
                    total_improved = true;
                }
                None => break,
            }
        }

        debug_assert_eq!(individual.tour_length, oracle.evaluate(&individual.solution));
        total_improved
    }

    fn name(&self) -> &str {
        if self.first_improvement {
            "2-Opt-FI"
        } else {
            "2-Opt-BI"
        }
    }
}
