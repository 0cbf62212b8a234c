//! Cycle analysis of resolved assignments.

use super::grouping::{ArcGrouping, Parent};
use super::relaxation::Decision;

/// Outcome of scanning an assignment for subtours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtourScan {
    /// One cycle through all cities
    Complete,
    /// Several cycles. `start` is a row on the cycle with the fewest arcs
    /// belonging to free groups.
    Subtour {
        start: usize,
        free_arcs: usize,
        cycles: usize,
    },
}

/// Epoch-stamped marks: a slot is set iff it holds the current epoch.
#[derive(Debug, Default)]
struct Marks {
    stamps: Vec<u32>,
    epoch: u32,
}

impl Marks {
    fn reset(&mut self, len: usize) {
        self.stamps.resize(len, 0);
        if self.epoch == u32::MAX {
            self.stamps.iter_mut().for_each(|s| *s = 0);
            self.epoch = 0;
        }
        self.epoch += 1;
    }

    #[inline]
    fn is_set(&self, i: usize) -> bool {
        self.stamps[i] == self.epoch
    }

    #[inline]
    fn set(&mut self, i: usize) {
        self.stamps[i] = self.epoch;
    }
}

#[derive(Debug, Default)]
pub struct SubtourDetector {
    rows: Marks,
    groups: Marks,
    fixed: Vec<Option<Parent>>,
}

impl SubtourDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preallocated(n: usize) -> Self {
        SubtourDetector {
            rows: Marks {
                stamps: vec![0; n],
                epoch: 0,
            },
            groups: Marks {
                stamps: Vec::with_capacity(n),
                epoch: 0,
            },
            fixed: Vec::with_capacity(n),
        }
    }

    pub fn prepare(&mut self, grouping: &ArcGrouping) {
        self.fixed.clear();
        self.fixed.resize(grouping.len(), None);
    }

    #[inline]
    fn is_free(grouping: &ArcGrouping, committed: &[Option<Parent>], row: usize) -> bool {
        matches!(grouping.group_of(row), Some(g) if committed[g].is_none())
    }

    /// Split `assigned` into cycles and pick the one cheapest to branch on
    pub fn scan(&mut self, assigned: &[usize], grouping: &ArcGrouping, committed: &[Option<Parent>]) -> SubtourScan {
        let n = assigned.len();
        self.rows.reset(n);

        let mut best: Option<(usize, usize)> = None;
        let mut cycles = 0;

        for start in 0..n {
            if self.rows.is_set(start) {
                continue;
            }

            let mut len = 0;
            let mut free_arcs = 0;
            let mut row = start;
            loop {
                self.rows.set(row);
                len += 1;
                if Self::is_free(grouping, committed, row) {
                    free_arcs += 1;
                }
                row = assigned[row];
                if row == start {
                    break;
                }
                debug_assert!(len < n, "assignment is not a permutation");
            }

            if len == n {
                return SubtourScan::Complete;
            }

            cycles += 1;
            if best.map_or(true, |(_, f)| free_arcs < f) {
                best = Some((start, free_arcs));
            }
        }

        match best {
            Some((start, free_arcs)) => SubtourScan::Subtour {
                start,
                free_arcs,
                cycles,
            },
            // only reachable for n == 0
            None => SubtourScan::Complete,
        }
    }

    /// Collect the distinct free groups met along the cycle through `start`,
    /// in traversal order.
    pub fn free_groups_on(
        &mut self,
        start: usize,
        assigned: &[usize],
        grouping: &ArcGrouping,
        committed: &[Option<Parent>],
        out: &mut Vec<usize>,
    ) {
        out.clear();
        self.groups.reset(grouping.len());

        let mut row = start;
        loop {
            if let Some(g) = grouping.group_of(row) {
                if committed[g].is_none() && !self.groups.is_set(g) {
                    self.groups.set(g);
                    out.push(g);
                }
            }
            row = assigned[row];
            if row == start {
                break;
            }
        }
    }

    /// Whether the shared arcs plus the arcs of the groups fixed by
    /// `decisions` already close a cycle shorter than `n`.
    pub fn closes_fixed_cycle(&mut self, grouping: &ArcGrouping, decisions: &[Decision]) -> bool {
        for d in decisions {
            self.fixed[d.group] = Some(d.parent);
        }

        let n = grouping.n();
        self.rows.reset(n);
        let mut found = false;

        'rows: for start in 0..n {
            if self.rows.is_set(start) {
                continue;
            }
            let Some(mut succ) = self.fixed_successor(grouping, start) else {
                continue;
            };

            self.rows.set(start);
            let mut len = 1;
            loop {
                if succ == start {
                    if len < n {
                        found = true;
                        break 'rows;
                    }
                    break;
                }
                // already part of an earlier chain, which cannot lead back here
                if self.rows.is_set(succ) {
                    break;
                }
                match self.fixed_successor(grouping, succ) {
                    Some(next) => {
                        self.rows.set(succ);
                        len += 1;
                        succ = next;
                    }
                    None => break,
                }
            }
        }

        for d in decisions {
            self.fixed[d.group] = None;
        }
        found
    }

    #[inline]
    fn fixed_successor(&self, grouping: &ArcGrouping, row: usize) -> Option<usize> {
        match grouping.group_of(row) {
            None => Some(grouping.successor(row, Parent::First)),
            Some(g) => self.fixed[g].map(|p| grouping.successor(row, p)),
        }
    }
}
