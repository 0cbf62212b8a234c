//! Two-parent recombination operators.
//!
//! The only operator shipped here is [`BabCrossover`], which solves the
//! recombination of two tours exactly (over all combinations of their
//! conflicting arc groups) by branch and bound.

pub mod bab;
pub mod grouping;
pub mod relaxation;
pub mod search;
pub mod subtour;

pub use bab::{BabConfig, BabCrossover};
pub use grouping::{ArcGrouping, GroupWeights, Parent};
pub use relaxation::{AssignmentRelaxation, Decision};
pub use search::{BranchAndBound, SearchLimits, SearchStatistics, Termination};
pub use subtour::{SubtourDetector, SubtourScan};

use crate::error::Result;
use crate::instance::DistanceOracle;
use crate::solution::Individual;

/// Contract between an evolutionary algorithm and a binary operator.
///
/// An algorithm running on several threads gives each thread its own
/// operator instance; implementations keep per-run buffers and are not
/// meant to be shared.
pub trait BinaryOperator {
    fn name(&self) -> &str;

    /// Prepare for a run on `oracle`
    fn begin_run(&mut self, oracle: &dyn DistanceOracle);

    /// Write a child of `parent1` and `parent2` into `dest`
    fn recombine(
        &mut self,
        dest: &mut Individual,
        oracle: &dyn DistanceOracle,
        parent1: &Individual,
        parent2: &Individual,
    ) -> Result<()>;

    /// Release per-run resources
    fn end_run(&mut self);
}
