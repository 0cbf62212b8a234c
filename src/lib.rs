//! TSP Crossover Library
//!
//! A branch-and-bound assisted two-parent crossover for the Traveling Salesman
//! Problem, with the tools to benchmark it.
//!
//! # Features
//!
//! - Exact recombination of two tours over all combinations of their
//!   conflicting arc groups (`crossover::BabCrossover`)
//! - Dense distance matrices, including asymmetric ones
//! - 2-opt local search for preparing parents
//! - Benchmarking with CSV export
//!
//! # Example
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use tsp_bench::crossover::{BabCrossover, BinaryOperator};
//! use tsp_bench::instance::Instance;
//! use tsp_bench::solution::Individual;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let instance = Instance::random_euclidean("rand50", 50, 1000.0, &mut rng).unwrap();
//!
//! let parent1 = Individual::random(&instance, &mut rng);
//! let parent2 = Individual::random(&instance, &mut rng);
//!
//! let mut crossover = BabCrossover::new();
//! let mut child = Individual::new();
//! crossover.recombine(&mut child, &instance, &parent1, &parent2).unwrap();
//!
//! println!("Child length: {}", child.tour_length);
//! ```

pub mod error;
pub mod instance;
pub mod solution;
pub mod codec;
pub mod crossover;
pub mod heuristics;
pub mod benchmark;

pub use crossover::{BabCrossover, BinaryOperator};
pub use error::{Error, Result};
pub use instance::{DistanceOracle, Instance};
pub use solution::Individual;
