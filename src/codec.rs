//! Conversions between the path and the successor (adjacency) representation
//! of a tour.
//!
//! In path form a tour is the list of cities in visiting order. In adjacency
//! form `adj[c]` is the city visited right after `c`.

use crate::error::{Error, Result};

/// Fill `adj` (and `rev`, if given) from `path`.
///
/// `path` must be a permutation of `0..adj.len()`.
pub fn path_to_adjacency(path: &[usize], adj: &mut [usize], rev: Option<&mut [usize]>) {
    let n = path.len();
    debug_assert_eq!(adj.len(), n);
    if n == 0 {
        return;
    }

    let mut prev = path[n - 1];
    match rev {
        Some(rev) => {
            for &city in path {
                adj[prev] = city;
                rev[city] = prev;
                prev = city;
            }
        }
        None => {
            for &city in path {
                adj[prev] = city;
                prev = city;
            }
        }
    }
}

/// Decode `adj` into `path`, starting the walk at `start`.
///
/// Fails unless `adj` is a single cycle through all `adj.len()` cities.
pub fn adjacency_to_path(adj: &[usize], start: usize, path: &mut Vec<usize>) -> Result<()> {
    let n = adj.len();
    path.clear();
    if n == 0 {
        return Ok(());
    }
    if start >= n {
        return Err(Error::NotHamiltonian(format!("start city {} out of range", start)));
    }

    let mut seen = vec![false; n];
    let mut city = start;
    for _ in 0..n {
        if city >= n || seen[city] {
            return Err(Error::NotHamiltonian(format!(
                "city {} revisited after {} steps",
                city,
                path.len()
            )));
        }
        seen[city] = true;
        path.push(city);
        city = adj[city];
    }

    if city != start {
        return Err(Error::NotHamiltonian(format!(
            "walk from {} ends at {} after {} steps",
            start, city, n
        )));
    }
    Ok(())
}
