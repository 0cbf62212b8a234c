//! Problem instances and the distance oracle seen by the solvers.
//!
//! Instances hold a precomputed integer distance matrix. Euclidean instances use
//! the TSPLIB `EUC_2D` convention: distances are rounded to the nearest integer.

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Provides the problem size and arc costs to operators and local searches.
///
/// Cities are numbered `0..n()`.
pub trait DistanceOracle: Send + Sync {
    /// Number of cities
    fn n(&self) -> usize;

    /// Cost of the arc `i -> j`
    fn distance(&self, i: usize, j: usize) -> i64;

    /// Whether `distance(i, j) == distance(j, i)` for every pair
    fn is_symmetric(&self) -> bool;

    /// Length of the closed tour visiting `tour` in order
    fn evaluate(&self, tour: &[usize]) -> i64 {
        if tour.len() < 2 {
            return tour.first().map(|&c| self.distance(c, c)).unwrap_or(0);
        }

        let mut length = 0;
        for w in tour.windows(2) {
            length += self.distance(w[0], w[1]);
        }
        length + self.distance(tour[tour.len() - 1], tour[0])
    }
}

/// A point in the plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// TSPLIB `EUC_2D` distance
    pub fn euc_2d(&self, other: &Point) -> i64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt().round() as i64
    }
}

/// A TSP instance backed by a dense distance matrix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Name of the instance
    pub name: String,
    /// Number of cities
    pub dimension: usize,
    /// Coordinates, if the instance was built from points
    pub points: Option<Vec<Point>>,
    /// Row-major `dimension * dimension` matrix
    #[serde(skip)]
    matrix: Vec<i64>,
    symmetric: bool,
}

impl Instance {
    /// Build an instance from an explicit (possibly asymmetric) matrix
    pub fn from_matrix(name: &str, rows: Vec<Vec<i64>>) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(Error::invalid_instance("empty distance matrix"));
        }

        let mut matrix = Vec::with_capacity(n * n);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(Error::invalid_instance(format!(
                    "row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            matrix.extend(row);
        }

        let symmetric = (0..n).all(|i| (i + 1..n).all(|j| matrix[i * n + j] == matrix[j * n + i]));

        Ok(Instance {
            name: name.to_string(),
            dimension: n,
            points: None,
            matrix,
            symmetric,
        })
    }

    /// Build a Euclidean instance from coordinates
    pub fn euclidean(name: &str, points: Vec<Point>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::invalid_instance("no points"));
        }

        let matrix = Self::compute_distance_matrix(&points);

        Ok(Instance {
            name: name.to_string(),
            dimension: points.len(),
            points: Some(points),
            matrix,
            symmetric: true,
        })
    }

    /// Uniformly scattered cities in a `side x side` square
    pub fn random_euclidean<R: Rng + ?Sized>(name: &str, n: usize, side: f64, rng: &mut R) -> Result<Self> {
        if !(side > 0.0) {
            return Err(Error::invalid_instance(format!("side must be positive, got {}", side)));
        }
        let points = (0..n)
            .map(|_| Point::new(rng.gen_range(0.0..side), rng.gen_range(0.0..side)))
            .collect();
        Self::euclidean(name, points)
    }

    fn compute_distance_matrix(points: &[Point]) -> Vec<i64> {
        let n = points.len();
        let mut matrix = vec![0; n * n];

        for i in 0..n {
            for j in i + 1..n {
                let d = points[i].euc_2d(&points[j]);
                matrix[i * n + j] = d;
                matrix[j * n + i] = d;
            }
        }

        matrix
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.dimension;
        let mut total = 0i64;
        let mut count = 0usize;
        let mut min_distance = i64::MAX;
        let mut max_distance = 0i64;

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = self.distance(i, j);
                total += d;
                count += 1;
                min_distance = min_distance.min(d);
                max_distance = max_distance.max(d);
            }
        }

        InstanceStatistics {
            name: self.name.clone(),
            dimension: n,
            symmetric: self.symmetric,
            avg_distance: if count > 0 { total as f64 / count as f64 } else { 0.0 },
            min_distance: if count > 0 { min_distance } else { 0 },
            max_distance,
        }
    }
}

impl DistanceOracle for Instance {
    #[inline]
    fn n(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn distance(&self, i: usize, j: usize) -> i64 {
        self.matrix[i * self.dimension + j]
    }

    #[inline]
    fn is_symmetric(&self) -> bool {
        self.symmetric
    }
}

/// Statistics about an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    pub symmetric: bool,
    pub avg_distance: f64,
    pub min_distance: i64,
    pub max_distance: i64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.dimension)?;
        writeln!(f, "  Symmetric: {}", self.symmetric)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Min distance: {}", self.min_distance)?;
        writeln!(f, "  Max distance: {}", self.max_distance)
    }
}
