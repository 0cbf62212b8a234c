//! Benchmarking of the crossover operator.
//!
//! Provides tools for running recombination trials on generated instances,
//! collecting statistics and exporting them.

use crate::crossover::{BabConfig, BabCrossover, BinaryOperator, Termination};
use crate::error::Result;
use crate::heuristics::local_search::{LocalSearch, TwoOptSearch};
use crate::instance::{DistanceOracle, Instance};
use crate::solution::Individual;

use indicatif::{ProgressBar, ProgressStyle};
use ordered_float::OrderedFloat;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

/// Result of one recombination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// Instance name
    pub instance: String,
    /// Instance dimension
    pub dimension: usize,
    /// Trial index within the instance
    pub trial: usize,
    pub parent1_length: i64,
    pub parent2_length: i64,
    pub child_length: i64,
    /// Improvement over the better parent, in percent
    pub improvement: f64,
    pub groups: usize,
    pub shared_arcs: usize,
    pub nodes_expanded: usize,
    pub nodes_pruned: usize,
    pub termination: Termination,
    /// Computation time of the recombination in seconds
    pub time: f64,
}

/// Aggregated statistics for one instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialStatistics {
    pub instance: String,
    pub dimension: usize,
    pub num_trials: usize,
    pub num_failed: usize,
    /// Trials where the child beat both parents
    pub num_improved: usize,
    /// Trials that stopped on a cap
    pub num_capped: usize,
    pub avg_improvement: f64,
    pub std_improvement: f64,
    pub best_improvement: f64,
    pub avg_groups: f64,
    pub avg_nodes: f64,
    pub max_nodes: usize,
    pub avg_time: f64,
    pub total_time: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// Instance sizes to generate
    pub sizes: Vec<usize>,
    /// Recombinations per instance
    pub trials: usize,
    /// Random seed
    pub seed: u64,
    /// Side of the square the cities are scattered in
    pub side: f64,
    /// Improve parents with 2-opt before recombining
    pub local_search: bool,
    /// Run trials in parallel
    pub parallel: bool,
    /// Show a progress bar
    pub progress: bool,
    /// Crossover settings
    pub crossover: BabConfig,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            sizes: vec![50, 100, 200],
            trials: 20,
            seed: 42,
            side: 1000.0,
            local_search: true,
            parallel: true,
            progress: true,
            crossover: BabConfig::default(),
        }
    }
}

impl BenchmarkConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// One generated instance and its trial parents
struct PreparedTrial {
    trial: usize,
    parent1: Individual,
    parent2: Individual,
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<TrialResult>,
    failures: BTreeMap<String, usize>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> Self {
        Benchmark {
            config,
            results: Vec::new(),
            failures: BTreeMap::new(),
        }
    }

    /// Instance used for size `n`, reproducible from the seed
    pub fn generate_instance(&self, n: usize) -> Result<Instance> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed ^ (n as u64).rotate_left(32));
        Instance::random_euclidean(&format!("rand{}", n), n, self.config.side, &mut rng)
    }

    fn prepare_trials(&self, instance: &Instance) -> Vec<PreparedTrial> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(instance.dimension as u64));
        let two_opt = TwoOptSearch::first_improvement();

        (0..self.config.trials)
            .map(|trial| {
                let mut parent1 = Individual::random(instance, &mut rng);
                let mut parent2 = Individual::random(instance, &mut rng);
                if self.config.local_search {
                    two_opt.improve(instance, &mut parent1);
                    two_opt.improve(instance, &mut parent2);
                }
                PreparedTrial {
                    trial,
                    parent1,
                    parent2,
                }
            })
            .collect()
    }

    fn run_trial(operator: &mut BabCrossover, instance: &Instance, prepared: &PreparedTrial) -> Result<TrialResult> {
        let mut child = Individual::new();
        let start = Instant::now();
        operator.recombine(&mut child, instance, &prepared.parent1, &prepared.parent2)?;
        let time = start.elapsed().as_secs_f64();

        let stats = operator.last_statistics();
        let better = prepared.parent1.tour_length.min(prepared.parent2.tour_length);
        let improvement = if better > 0 {
            (better - child.tour_length) as f64 / better as f64 * 100.0
        } else {
            0.0
        };

        Ok(TrialResult {
            instance: instance.name.clone(),
            dimension: instance.dimension,
            trial: prepared.trial,
            parent1_length: prepared.parent1.tour_length,
            parent2_length: prepared.parent2.tour_length,
            child_length: child.tour_length,
            improvement,
            groups: stats.groups,
            shared_arcs: stats.shared_arcs,
            nodes_expanded: stats.nodes_expanded,
            nodes_pruned: stats.nodes_pruned,
            termination: stats.termination,
            time,
        })
    }

    /// Run every trial on one instance.
    ///
    /// A failing trial is logged and counted; it does not stop the others.
    pub fn run_instance(&mut self, instance: &Instance) {
        log::info!("Running benchmark on instance: {} (n={})", instance.name, instance.n());
        let prepared = self.prepare_trials(instance);

        let progress = if self.config.progress {
            let bar = ProgressBar::new(prepared.len() as u64);
            if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} ({elapsed})") {
                bar.set_style(style);
            }
            bar.set_message(instance.name.clone());
            bar
        } else {
            ProgressBar::hidden()
        };

        let template = BabCrossover::with_config(self.config.crossover);
        let outcomes: Vec<Result<TrialResult>> = if self.config.parallel {
            prepared
                .par_iter()
                .map_init(
                    || {
                        let mut op = template.fork();
                        op.begin_run(instance);
                        op
                    },
                    |op, p| {
                        let outcome = Self::run_trial(op, instance, p);
                        progress.inc(1);
                        outcome
                    },
                )
                .collect()
        } else {
            let mut op = template.fork();
            op.begin_run(instance);
            prepared
                .iter()
                .map(|p| {
                    let outcome = Self::run_trial(&mut op, instance, p);
                    progress.inc(1);
                    outcome
                })
                .collect()
        };
        progress.finish_and_clear();

        for (prepared, outcome) in prepared.iter().zip(outcomes) {
            match outcome {
                Ok(result) => self.results.push(result),
                Err(e) => {
                    log::warn!("trial {} on {} failed: {}", prepared.trial, instance.name, e);
                    *self.failures.entry(instance.name.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    /// Generate and run every configured instance size
    pub fn run(&mut self) -> Result<()> {
        for n in self.config.sizes.clone() {
            let instance = self.generate_instance(n)?;
            self.run_instance(&instance);
        }
        Ok(())
    }

    /// Compute statistics for each instance
    pub fn compute_statistics(&self) -> Vec<TrialStatistics> {
        let mut by_instance: BTreeMap<&str, Vec<&TrialResult>> = BTreeMap::new();
        for result in &self.results {
            by_instance.entry(result.instance.as_str()).or_default().push(result);
        }

        let mut statistics: Vec<TrialStatistics> = by_instance
            .into_iter()
            .map(|(name, results)| {
                let improvements: Vec<f64> = results.iter().map(|r| r.improvement).collect();
                let groups: Vec<f64> = results.iter().map(|r| r.groups as f64).collect();
                let nodes: Vec<f64> = results.iter().map(|r| r.nodes_expanded as f64).collect();
                let times: Vec<f64> = results.iter().map(|r| r.time).collect();

                let std_improvement = if improvements.len() > 1 {
                    improvements.iter().std_dev()
                } else {
                    0.0
                };

                TrialStatistics {
                    instance: name.to_string(),
                    dimension: results[0].dimension,
                    num_trials: results.len(),
                    num_failed: self.failures.get(name).copied().unwrap_or(0),
                    num_improved: results
                        .iter()
                        .filter(|r| r.child_length < r.parent1_length.min(r.parent2_length))
                        .count(),
                    num_capped: results.iter().filter(|r| r.termination != Termination::Exhausted).count(),
                    avg_improvement: improvements.iter().mean(),
                    std_improvement,
                    best_improvement: improvements.iter().cloned().fold(0.0, f64::max),
                    avg_groups: groups.iter().mean(),
                    avg_nodes: nodes.iter().mean(),
                    max_nodes: results.iter().map(|r| r.nodes_expanded).fold(0, usize::max),
                    avg_time: times.iter().mean(),
                    total_time: times.iter().sum(),
                }
            })
            .collect();

        statistics.sort_by_key(|s| (s.dimension, OrderedFloat(-s.avg_improvement)));
        statistics
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Export statistics to CSV
    pub fn export_statistics_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for stat in self.compute_statistics() {
            writer.serialize(stat)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("     BAB Crossover Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!("Generated: {}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S")));
        report.push_str(&format!(
            "Seed: {}  Trials/instance: {}  2-opt parents: {}\n\n",
            self.config.seed, self.config.trials, self.config.local_search
        ));

        let stats = self.compute_statistics();

        report.push_str("Instance Summary:\n");
        report.push_str("-".repeat(96).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<12} {:>6} {:>10} {:>8} {:>10} {:>10} {:>9} {:>12} {:>10}\n",
            "Instance", "n", "Improved", "Capped", "Avg Imp%", "Best Imp%", "Groups", "Avg Nodes", "Avg Time"
        ));
        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        for stat in &stats {
            report.push_str(&format!(
                "{:<12} {:>6} {:>10} {:>8} {:>10.3} {:>10.3} {:>9.1} {:>12.1} {:>10.5}\n",
                stat.instance,
                stat.dimension,
                format!("{}/{}", stat.num_improved, stat.num_trials),
                stat.num_capped,
                stat.avg_improvement,
                stat.best_improvement,
                stat.avg_groups,
                stat.avg_nodes,
                stat.avg_time
            ));
        }

        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        let failed: usize = self.failures.values().sum();
        if failed > 0 {
            report.push_str(&format!("\nFailed trials: {}\n", failed));
            for (instance, count) in &self.failures {
                report.push_str(&format!("  {}: {}\n", instance, count));
            }
        }

        report
    }

    /// Get all results
    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(parallel: bool) -> BenchmarkConfig {
        BenchmarkConfig {
            sizes: vec![12, 20],
            trials: 4,
            parallel,
            progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_benchmark_config() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.trials, 20);
        assert!(!config.crossover.align_orientation);

        let parsed: BenchmarkConfig = serde_json::from_str(r#"{"trials": 3, "sizes": [10]}"#).unwrap();
        assert_eq!(parsed.trials, 3);
        assert_eq!(parsed.sizes, vec![10]);
        assert_eq!(parsed.seed, 42);
    }

    #[test]
    fn test_benchmark_run_and_statistics() {
        let mut bench = Benchmark::new(small_config(true));
        bench.run().unwrap();

        assert_eq!(bench.results().len(), 8);
        for r in bench.results() {
            assert!(r.child_length <= r.parent1_length.min(r.parent2_length));
            assert!(r.improvement >= 0.0);
        }

        let stats = bench.compute_statistics();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].dimension, 12);
        assert!(stats.iter().all(|s| s.num_trials == 4 && s.num_failed == 0));

        let report = bench.generate_report();
        assert!(report.contains("rand12"));
        assert!(report.contains("rand20"));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut par = Benchmark::new(small_config(true));
        let mut seq = Benchmark::new(small_config(false));
        par.run().unwrap();
        seq.run().unwrap();

        let lengths = |b: &Benchmark| b.results().iter().map(|r| r.child_length).collect::<Vec<_>>();
        assert_eq!(lengths(&par), lengths(&seq));
    }
}
