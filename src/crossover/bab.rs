//! Branch-and-bound assisted crossover.
//!
//! The child of two tours is assembled from their arcs: arcs both parents
//! share are always kept, and each group of conflicting arcs (see
//! [`ArcGrouping`]) is taken from one parent or the other. Letting every group
//! pick its cheaper parent gives a lower bound on any such child. Branch and
//! bound over the group choices then finds the shortest combination that is a
//! single tour, seeded with the better parent so the child is never longer
//! than either parent.

use super::grouping::{ArcGrouping, Parent};
use super::relaxation::AssignmentRelaxation;
use super::search::{BranchAndBound, Incumbent, SearchLimits, SearchStatistics};
use super::subtour::SubtourDetector;
use super::BinaryOperator;
use crate::codec;
use crate::error::{Error, Result};
use crate::instance::DistanceOracle;
use crate::solution::{is_permutation, Individual};
use serde::{Deserialize, Serialize};

/// Crossover configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BabConfig {
    /// Caps on the search
    pub limits: SearchLimits,
    /// On symmetric instances, reverse the second parent when that gives
    /// strictly more shared arcs
    pub align_orientation: bool,
}

impl Default for BabConfig {
    fn default() -> Self {
        BabConfig {
            limits: SearchLimits::default(),
            align_orientation: false,
        }
    }
}

/// Buffers for one thread of recombination. Everything is overwritten on
/// each call; nothing relies on zeroed memory.
#[derive(Debug)]
struct Workspace {
    grouping: ArcGrouping,
    relaxation: AssignmentRelaxation,
    detector: SubtourDetector,
    search: BranchAndBound,
    incumbent: Incumbent,
}

impl Workspace {
    fn preallocated(n: usize) -> Self {
        Workspace {
            grouping: ArcGrouping::preallocated(n),
            relaxation: AssignmentRelaxation::preallocated(n),
            detector: SubtourDetector::preallocated(n),
            search: BranchAndBound::preallocated(n),
            incumbent: Incumbent {
                length: i64::MAX,
                adjacency: Vec::with_capacity(n),
                improved: false,
            },
        }
    }
}

/// The branch-and-bound crossover operator.
///
/// Cloning (or [`BabCrossover::fork`]) yields an operator with the same
/// configuration and no buffers, ready to be moved to another thread.
#[derive(Debug)]
pub struct BabCrossover {
    config: BabConfig,
    workspace: Option<Workspace>,
    last_statistics: SearchStatistics,
}

impl BabCrossover {
    pub const NAME: &'static str = "bab-crossover";

    pub fn new() -> Self {
        Self::with_config(BabConfig::default())
    }

    pub fn with_config(config: BabConfig) -> Self {
        BabCrossover {
            config,
            workspace: None,
            last_statistics: SearchStatistics::default(),
        }
    }

    /// A fresh operator with the same configuration
    pub fn fork(&self) -> Self {
        Self::with_config(self.config)
    }

    pub fn config(&self) -> &BabConfig {
        &self.config
    }

    /// Statistics of the most recent `recombine`
    pub fn last_statistics(&self) -> &SearchStatistics {
        &self.last_statistics
    }

    fn check_parent(which: usize, parent: &Individual, n: usize) -> Result<()> {
        if !is_permutation(&parent.solution, n) {
            return Err(Error::invalid_parent(
                which,
                format!(
                    "solution of length {} is not a permutation of 0..{}",
                    parent.solution.len(),
                    n
                ),
            ));
        }
        Ok(())
    }
}

impl Default for BabCrossover {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BabCrossover {
    fn clone(&self) -> Self {
        self.fork()
    }
}

impl BinaryOperator for BabCrossover {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn begin_run(&mut self, oracle: &dyn DistanceOracle) {
        log::debug!("{}: preparing buffers for n={}", Self::NAME, oracle.n());
        self.workspace = Some(Workspace::preallocated(oracle.n()));
        self.last_statistics = SearchStatistics::default();
    }

    fn recombine(
        &mut self,
        dest: &mut Individual,
        oracle: &dyn DistanceOracle,
        parent1: &Individual,
        parent2: &Individual,
    ) -> Result<()> {
        let n = oracle.n();
        if n == 0 {
            return Err(Error::invalid_instance("instance has no cities"));
        }
        Self::check_parent(1, parent1, n)?;
        Self::check_parent(2, parent2, n)?;

        let ws = self.workspace.get_or_insert_with(|| Workspace::preallocated(n));
        ws.grouping.preprocess(oracle, &parent1.solution, &parent2.solution);

        let l1 = ws.grouping.parent_length(Parent::First);
        let l2 = ws.grouping.parent_length(Parent::Second);
        for (which, parent, measured) in [(1, parent1, l1), (2, parent2, l2)] {
            if parent.tour_length != measured {
                return Err(Error::invalid_parent(
                    which,
                    format!("tour_length is {} but the tour measures {}", parent.tour_length, measured),
                ));
            }
        }

        if self.config.align_orientation && oracle.is_symmetric() {
            let p1 = ws.grouping.adjacency(Parent::First);
            let p2 = ws.grouping.adjacency(Parent::Second);
            let reversed_shared = (0..n).filter(|&row| p2[p1[row]] == row).count();
            if reversed_shared > ws.grouping.shared_rows().len() {
                ws.grouping.reverse_second(oracle);
            }
        }

        let seed = if l2 < l1 { Parent::Second } else { Parent::First };
        ws.incumbent.seed(l1.min(l2), ws.grouping.adjacency(seed));

        let termination = ws.search.run(
            &ws.grouping,
            &mut ws.relaxation,
            &mut ws.detector,
            &mut ws.incumbent,
            &self.config.limits,
        );
        self.last_statistics = *ws.search.statistics();

        if ws.incumbent.improved {
            codec::adjacency_to_path(&ws.incumbent.adjacency, parent1.solution[0], &mut dest.solution)
                .map_err(|e| Error::internal(format!("incumbent does not decode to a tour: {}", e)))?;
            let measured = oracle.evaluate(&dest.solution);
            if measured != ws.incumbent.length {
                return Err(Error::internal(format!(
                    "child measures {} but the search reported {}",
                    measured, ws.incumbent.length
                )));
            }
            dest.tour_length = measured;
        } else {
            let better = match seed {
                Parent::First => parent1,
                Parent::Second => parent2,
            };
            dest.solution.clear();
            dest.solution.extend_from_slice(&better.solution);
            dest.tour_length = better.tour_length;
        }
        dest.producer.clear();
        dest.producer.push_str(Self::NAME);

        if termination != super::Termination::Exhausted {
            log::warn!(
                "{}: search stopped early ({}) after {} nodes",
                Self::NAME,
                termination,
                self.last_statistics.nodes_expanded
            );
        }
        log::trace!(
            "{}: n={} groups={} parents=({}, {}) child={} nodes={}",
            Self::NAME,
            n,
            self.last_statistics.groups,
            l1,
            l2,
            dest.tour_length,
            self.last_statistics.nodes_expanded
        );
        Ok(())
    }

    fn end_run(&mut self) {
        self.workspace = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossover::Termination;
    use crate::instance::{Instance, Point};
    use crate::solution::Individual;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn five_points() -> Instance {
        Instance::euclidean(
            "five",
            vec![
                Point::new(0.0, 0.0),
                Point::new(30.0, 5.0),
                Point::new(25.0, 40.0),
                Point::new(-10.0, 35.0),
                Point::new(5.0, 18.0),
            ],
        )
        .unwrap()
    }

    fn recombine(op: &mut BabCrossover, inst: &Instance, a: &[usize], b: &[usize]) -> Individual {
        let p1 = Individual::from_tour(inst, a.to_vec(), "p1");
        let p2 = Individual::from_tour(inst, b.to_vec(), "p2");
        let mut child = Individual::new();
        op.recombine(&mut child, inst, &p1, &p2).unwrap();
        child
    }

    #[test]
    fn test_five_city_scenario() {
        let inst = five_points();
        let mut op = BabCrossover::new();
        let p1 = [0, 1, 2, 3, 4];
        let p2 = [0, 2, 1, 4, 3];
        let child = recombine(&mut op, &inst, &p1, &p2);

        assert!(child.is_valid(&inst));
        assert!(child.tour_length <= inst.evaluate(&p1).min(inst.evaluate(&p2)));
        assert_eq!(child.producer, BabCrossover::NAME);
        assert_eq!(op.last_statistics().termination, Termination::Exhausted);
    }

    #[test]
    fn test_identical_parents_return_same_tour() {
        let inst = five_points();
        let mut op = BabCrossover::new();
        let tour = [3, 1, 4, 0, 2];
        let child = recombine(&mut op, &inst, &tour, &tour);

        assert_eq!(child.solution, tour.to_vec());
        assert_eq!(child.tour_length, inst.evaluate(&tour));
        assert_eq!(op.last_statistics().groups, 0);
    }

    #[test]
    fn test_tiny_instances() {
        let one = Instance::from_matrix("one", vec![vec![0]]).unwrap();
        let child = recombine(&mut BabCrossover::new(), &one, &[0], &[0]);
        assert_eq!(child.solution, vec![0]);
        assert_eq!(child.tour_length, 0);

        let two = Instance::from_matrix("two", vec![vec![0, 4], vec![6, 0]]).unwrap();
        let child = recombine(&mut BabCrossover::new(), &two, &[0, 1], &[1, 0]);
        assert_eq!(child.tour_length, 10);
        assert!(child.is_valid(&two));

        let three = Instance::from_matrix("three", vec![vec![0, 1, 9], vec![9, 0, 1], vec![1, 9, 0]]).unwrap();
        let child = recombine(&mut BabCrossover::new(), &three, &[0, 2, 1], &[0, 1, 2]);
        assert_eq!(child.tour_length, 3);
        assert_eq!(child.solution, vec![0, 1, 2]);
    }

    #[test]
    fn test_rejects_malformed_parents() {
        let inst = five_points();
        let mut op = BabCrossover::new();
        let good = Individual::from_tour(&inst, vec![0, 1, 2, 3, 4], "good");
        let mut child = Individual::new();

        let short = Individual::from_tour(&inst, vec![0, 1, 2, 3], "short");
        let err = op.recombine(&mut child, &inst, &good, &short).unwrap_err();
        assert!(matches!(err, Error::InvalidParent { which: 2, .. }));

        let dup = Individual {
            solution: vec![0, 1, 1, 3, 4],
            tour_length: 0,
            producer: String::new(),
        };
        let err = op.recombine(&mut child, &inst, &dup, &good).unwrap_err();
        assert!(matches!(err, Error::InvalidParent { which: 1, .. }));

        let mut wrong_length = good.clone();
        wrong_length.tour_length += 1;
        let err = op.recombine(&mut child, &inst, &good, &wrong_length).unwrap_err();
        assert!(matches!(err, Error::InvalidParent { which: 2, .. }));
        assert!(child.solution.is_empty());
    }

    #[test]
    fn test_parents_are_not_modified() {
        let inst = five_points();
        let p1 = Individual::from_tour(&inst, vec![0, 1, 2, 3, 4], "p1");
        let p2 = Individual::from_tour(&inst, vec![0, 2, 1, 4, 3], "p2");
        let (c1, c2) = (p1.clone(), p2.clone());
        let mut child = Individual::new();
        BabCrossover::new().recombine(&mut child, &inst, &p1, &p2).unwrap();
        assert_eq!(p1, c1);
        assert_eq!(p2, c2);
    }

    #[test]
    fn test_workspace_reuse_across_sizes() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut op = BabCrossover::new();
        let big = Instance::random_euclidean("big", 40, 1000.0, &mut rng).unwrap();
        op.begin_run(&big);

        for inst in [big.clone(), five_points(), big] {
            let a = Individual::random(&inst, &mut rng);
            let b = Individual::random(&inst, &mut rng);
            let mut child = Individual::new();
            op.recombine(&mut child, &inst, &a, &b).unwrap();
            assert!(child.is_valid(&inst));
            assert!(child.tour_length <= a.tour_length.min(b.tour_length));
        }
        op.end_run();
    }

    #[test]
    fn test_fork_has_no_buffers() {
        let inst = five_points();
        let mut op = BabCrossover::with_config(BabConfig {
            align_orientation: true,
            ..BabConfig::default()
        });
        op.begin_run(&inst);
        let forked = op.clone();
        assert!(forked.workspace.is_none());
        assert_eq!(forked.config(), op.config());
    }

    #[test]
    fn test_align_orientation_on_reversed_parent() {
        let inst = five_points();
        let mut op = BabCrossover::with_config(BabConfig {
            align_orientation: true,
            ..BabConfig::default()
        });
        let child = recombine(&mut op, &inst, &[0, 1, 2, 3, 4], &[4, 3, 2, 1, 0]);
        assert_eq!(op.last_statistics().shared_arcs, 5);
        assert_eq!(child.tour_length, inst.evaluate(&[0, 1, 2, 3, 4]));
    }
}
