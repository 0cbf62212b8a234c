//! Candidate tours exchanged between operators.

use crate::instance::DistanceOracle;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A tour together with its length and the operator that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Individual {
    /// Cities in visiting order, each of `0..n` exactly once
    pub solution: Vec<usize>,
    /// Length of the closed tour
    pub tour_length: i64,
    /// Name of the operator that produced this individual
    pub producer: String,
}

impl Individual {
    /// An empty individual, to be filled in by an operator
    pub fn new() -> Self {
        Individual {
            solution: Vec::new(),
            tour_length: i64::MAX,
            producer: String::new(),
        }
    }

    /// Wrap a tour, computing its length
    pub fn from_tour<D: DistanceOracle + ?Sized>(oracle: &D, tour: Vec<usize>, producer: &str) -> Self {
        let tour_length = oracle.evaluate(&tour);
        Individual {
            solution: tour,
            tour_length,
            producer: producer.to_string(),
        }
    }

    /// A uniformly random tour
    pub fn random<D: DistanceOracle + ?Sized, R: Rng + ?Sized>(oracle: &D, rng: &mut R) -> Self {
        let mut tour: Vec<usize> = (0..oracle.n()).collect();
        tour.shuffle(rng);
        Self::from_tour(oracle, tour, "random")
    }

    /// Check that the solution is a permutation of `0..n` and the length is exact
    pub fn is_valid<D: DistanceOracle + ?Sized>(&self, oracle: &D) -> bool {
        is_permutation(&self.solution, oracle.n()) && oracle.evaluate(&self.solution) == self.tour_length
    }
}

impl Default for Individual {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Individual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Individual ({})", self.producer)?;
        writeln!(f, "  Length: {}", self.tour_length)?;
        writeln!(f, "  Tour: {:?}", self.solution)
    }
}

/// Whether `tour` visits every city of `0..n` exactly once
pub fn is_permutation(tour: &[usize], n: usize) -> bool {
    if tour.len() != n {
        return false;
    }

    let mut seen = vec![false; n];
    for &city in tour {
        if city >= n || seen[city] {
            return false;
        }
        seen[city] = true;
    }
    true
}
