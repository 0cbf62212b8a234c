//! Assignment relaxation: complete a partial commitment by letting every free
//! group take its cheaper parent, ignoring whether the result is one tour.

use super::grouping::{ArcGrouping, Parent};

/// A group committed to one parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub group: usize,
    pub parent: Parent,
}

impl Decision {
    #[inline]
    pub fn new(group: usize, parent: Parent) -> Self {
        Decision { group, parent }
    }
}

/// Resolves search nodes into full assignments.
///
/// `committed` holds the decisions of the node being resolved and is cleared
/// again by [`AssignmentRelaxation::release`].
#[derive(Debug, Default)]
pub struct AssignmentRelaxation {
    committed: Vec<Option<Parent>>,
    assigned: Vec<usize>,
}

impl AssignmentRelaxation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preallocated(n: usize) -> Self {
        AssignmentRelaxation {
            committed: Vec::with_capacity(n),
            assigned: vec![0; n],
        }
    }

    /// Size the buffers for `grouping` and write the shared arcs, which never change.
    pub fn prepare(&mut self, grouping: &ArcGrouping) {
        self.committed.clear();
        self.committed.resize(grouping.len(), None);
        self.assigned.resize(grouping.n(), 0);
        for &row in grouping.shared_rows() {
            self.assigned[row] = grouping.successor(row, Parent::First);
        }
    }

    /// Lower bound of a partial commitment without building the assignment
    pub fn lower_bound(&self, grouping: &ArcGrouping, decisions: &[Decision]) -> i64 {
        let mut bound = grouping.relaxed_cost();
        for d in decisions {
            let w = grouping.weights(d.group);
            bound += w.of(d.parent) - w.min();
        }
        bound
    }

    /// Commit `decisions`, complete the free groups and write the assignment.
    /// Returns its cost.
    pub fn resolve(&mut self, grouping: &ArcGrouping, decisions: &[Decision]) -> i64 {
        for d in decisions {
            debug_assert!(self.committed[d.group].is_none(), "group {} committed twice", d.group);
            self.committed[d.group] = Some(d.parent);
        }

        let mut cost = grouping.shared_cost();
        for group in 0..grouping.len() {
            let w = grouping.weights(group);
            let parent = self.committed[group].unwrap_or_else(|| w.relaxed());
            cost += w.of(parent);
            for &row in grouping.rows(group) {
                self.assigned[row] = grouping.successor(row, parent);
            }
        }
        cost
    }

    /// Undo the commitments made by [`AssignmentRelaxation::resolve`]
    pub fn release(&mut self, decisions: &[Decision]) {
        for d in decisions {
            self.committed[d.group] = None;
        }
    }

    /// Assignment written by the last `resolve`
    #[inline]
    pub fn assigned(&self) -> &[usize] {
        &self.assigned
    }

    /// Commitments of the node currently resolved
    #[inline]
    pub fn committed(&self) -> &[Option<Parent>] {
        &self.committed
    }
}
