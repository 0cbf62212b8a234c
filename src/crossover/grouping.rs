//! Partition of the rows (cities) of two parent tours into shared arcs and
//! groups of conflicting arcs.
//!
//! Think of a tour as an assignment of every row `r` to the column `succ(r)`.
//! If row `r` takes the second parent's column `p2[r]`, the row that the first
//! parent sends to that column (`rev1[p2[r]]`) has lost its column and must
//! switch to the second parent as well. Following `r -> rev1[p2[r]]` until it
//! closes gives one group. Every group decides as a whole, so any combination
//! of group choices is again a permutation (possibly made of several subtours).

use crate::codec;
use crate::instance::DistanceOracle;

/// Which parent a group takes its arcs from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    First,
    Second,
}

impl Parent {
    #[inline]
    pub fn opposite(self) -> Parent {
        match self {
            Parent::First => Parent::Second,
            Parent::Second => Parent::First,
        }
    }
}

/// Cost of a group under either parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupWeights {
    pub first: i64,
    pub second: i64,
}

impl GroupWeights {
    #[inline]
    pub fn of(&self, parent: Parent) -> i64 {
        match parent {
            Parent::First => self.first,
            Parent::Second => self.second,
        }
    }

    /// The cheaper parent, ties going to the first
    #[inline]
    pub fn relaxed(&self) -> Parent {
        if self.second < self.first {
            Parent::Second
        } else {
            Parent::First
        }
    }

    #[inline]
    pub fn min(&self) -> i64 {
        self.first.min(self.second)
    }

    /// Extra cost of taking the more expensive parent
    #[inline]
    pub fn switch_cost(&self) -> i64 {
        (self.first - self.second).abs()
    }
}

/// Group structure of one parent pair. Buffers are reused between calls.
#[derive(Debug, Default)]
pub struct ArcGrouping {
    p1: Vec<usize>,
    p2: Vec<usize>,
    rev1: Vec<usize>,
    /// Scratch for `reverse_second`
    reversed: Vec<usize>,
    group_of: Vec<Option<usize>>,
    group_start: Vec<usize>,
    group_rows: Vec<usize>,
    weights: Vec<GroupWeights>,
    shared_rows: Vec<usize>,
    shared_cost: i64,
}

impl ArcGrouping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preallocated(n: usize) -> Self {
        ArcGrouping {
            p1: vec![0; n],
            p2: vec![0; n],
            rev1: vec![0; n],
            reversed: Vec::with_capacity(n),
            group_of: vec![None; n],
            group_start: Vec::with_capacity(n + 1),
            group_rows: Vec::with_capacity(n),
            weights: Vec::with_capacity(n),
            shared_rows: Vec::with_capacity(n),
            shared_cost: 0,
        }
    }

    /// Encode both parents and split their rows into shared arcs and groups.
    ///
    /// Both paths must be permutations of `0..oracle.n()`.
    pub fn preprocess(&mut self, oracle: &dyn DistanceOracle, parent1: &[usize], parent2: &[usize]) {
        let n = oracle.n();
        self.p1.resize(n, 0);
        self.p2.resize(n, 0);
        self.rev1.resize(n, 0);
        codec::path_to_adjacency(parent1, &mut self.p1, Some(&mut self.rev1));
        codec::path_to_adjacency(parent2, &mut self.p2, None);
        self.build_groups(oracle);
    }

    /// Replace the second parent by its reversal.
    ///
    /// Only meaningful on symmetric instances, where the reversed tour has the
    /// same length.
    pub fn reverse_second(&mut self, oracle: &dyn DistanceOracle) {
        self.reversed.clear();
        self.reversed.resize(self.p2.len(), 0);
        for (row, &succ) in self.p2.iter().enumerate() {
            self.reversed[succ] = row;
        }
        std::mem::swap(&mut self.p2, &mut self.reversed);
        self.build_groups(oracle);
    }

    fn build_groups(&mut self, oracle: &dyn DistanceOracle) {
        let n = self.p1.len();
        self.group_of.clear();
        self.group_of.resize(n, None);
        self.group_start.clear();
        self.group_rows.clear();
        self.weights.clear();
        self.shared_rows.clear();
        self.shared_cost = 0;

        // Shared rows first, so the orbit walk below never starts on one.
        for row in 0..n {
            if self.p1[row] == self.p2[row] {
                self.shared_rows.push(row);
                self.shared_cost += oracle.distance(row, self.p1[row]);
            }
        }

        for start in 0..n {
            if self.p1[start] == self.p2[start] || self.group_of[start].is_some() {
                continue;
            }

            let group = self.weights.len();
            self.group_start.push(self.group_rows.len());

            let mut weights = GroupWeights { first: 0, second: 0 };
            let mut row = start;
            loop {
                self.group_of[row] = Some(group);
                self.group_rows.push(row);
                weights.first += oracle.distance(row, self.p1[row]);
                weights.second += oracle.distance(row, self.p2[row]);

                row = self.rev1[self.p2[row]];
                if row == start {
                    break;
                }
            }
            self.weights.push(weights);
        }
        self.group_start.push(self.group_rows.len());
    }

    /// Number of cities
    #[inline]
    pub fn n(&self) -> usize {
        self.p1.len()
    }

    /// Number of groups
    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    #[inline]
    pub fn group_of(&self, row: usize) -> Option<usize> {
        self.group_of[row]
    }

    /// Rows of `group` in orbit order, starting at its anchor row
    #[inline]
    pub fn rows(&self, group: usize) -> &[usize] {
        &self.group_rows[self.group_start[group]..self.group_start[group + 1]]
    }

    #[inline]
    pub fn weights(&self, group: usize) -> GroupWeights {
        self.weights[group]
    }

    #[inline]
    pub fn shared_rows(&self) -> &[usize] {
        &self.shared_rows
    }

    #[inline]
    pub fn shared_cost(&self) -> i64 {
        self.shared_cost
    }

    /// Successor of `row` in the given parent
    #[inline]
    pub fn successor(&self, row: usize, parent: Parent) -> usize {
        match parent {
            Parent::First => self.p1[row],
            Parent::Second => self.p2[row],
        }
    }

    /// Successor array of the given parent
    #[inline]
    pub fn adjacency(&self, parent: Parent) -> &[usize] {
        match parent {
            Parent::First => &self.p1,
            Parent::Second => &self.p2,
        }
    }

    /// Length of the given parent's tour
    pub fn parent_length(&self, parent: Parent) -> i64 {
        self.shared_cost + self.weights.iter().map(|w| w.of(parent)).sum::<i64>()
    }

    /// Cost of the assignment where every group takes its relaxed choice
    pub fn relaxed_cost(&self) -> i64 {
        self.shared_cost + self.weights.iter().map(GroupWeights::min).sum::<i64>()
    }
}
