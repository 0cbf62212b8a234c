//! TSP crossover benchmark - Command Line Interface
//!
//! Recombines tour pairs with the branch-and-bound crossover and benchmarks it.

use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tsp_bench::benchmark::{Benchmark, BenchmarkConfig};
use tsp_bench::crossover::{BabConfig, BabCrossover, BinaryOperator, SearchLimits};
use tsp_bench::heuristics::local_search::{LocalSearch, TwoOptSearch};
use tsp_bench::instance::Instance;
use tsp_bench::solution::Individual;

use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "tsp-bench")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Branch-and-bound assisted crossover for the TSP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recombine two parents on a random Euclidean instance
    Recombine {
        /// Number of cities
        #[arg(short, long, default_value = "100")]
        size: usize,

        /// Random seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Side of the square holding the cities
        #[arg(long, default_value = "1000")]
        side: f64,

        /// Improve both parents with 2-opt first
        #[arg(long)]
        local_search: bool,

        /// Reverse the second parent when it shares more arcs that way
        #[arg(long)]
        align: bool,

        /// Maximum expanded nodes (0 for no limit)
        #[arg(long, default_value = "1000000")]
        max_nodes: usize,

        /// Time limit in seconds
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Output child to file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the crossover benchmark
    Benchmark {
        /// JSON benchmark configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Instance sizes, comma separated
        #[arg(long, value_delimiter = ',')]
        sizes: Option<Vec<usize>>,

        /// Recombinations per instance
        #[arg(short, long)]
        trials: Option<usize>,

        /// Random seed
        #[arg(short, long)]
        seed: Option<u64>,

        /// Use random parents without 2-opt
        #[arg(long)]
        no_local_search: bool,

        /// Run trials on one thread
        #[arg(long)]
        sequential: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Recombine {
            size,
            seed,
            side,
            local_search,
            align,
            max_nodes,
            time_limit,
            output,
            verbose,
        } => {
            let config = BabConfig {
                limits: SearchLimits {
                    max_expanded_nodes: (max_nodes > 0).then_some(max_nodes),
                    time_limit,
                    ..Default::default()
                },
                align_orientation: align,
            };
            recombine(size, seed, side, local_search, config, output, verbose);
        }

        Commands::Benchmark {
            config,
            output,
            sizes,
            trials,
            seed,
            no_local_search,
            sequential,
        } => {
            let mut bench_config = match config {
                Some(path) => match BenchmarkConfig::from_json_file(&path) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("Error loading config {:?}: {}", path, e);
                        std::process::exit(1);
                    }
                },
                None => BenchmarkConfig::default(),
            };
            if let Some(sizes) = sizes {
                bench_config.sizes = sizes;
            }
            if let Some(trials) = trials {
                bench_config.trials = trials;
            }
            if let Some(seed) = seed {
                bench_config.seed = seed;
            }
            if no_local_search {
                bench_config.local_search = false;
            }
            if sequential {
                bench_config.parallel = false;
            }
            run_benchmark(bench_config, &output);
        }
    }
}

fn recombine(
    size: usize,
    seed: u64,
    side: f64,
    local_search: bool,
    config: BabConfig,
    output: Option<PathBuf>,
    verbose: bool,
) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let instance = match Instance::random_euclidean(&format!("rand{}", size), size, side, &mut rng) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error generating instance: {}", e);
            std::process::exit(1);
        }
    };

    if verbose {
        println!("{}", instance.statistics());
    }

    let mut parent1 = Individual::random(&instance, &mut rng);
    let mut parent2 = Individual::random(&instance, &mut rng);
    if local_search {
        let two_opt = TwoOptSearch::first_improvement();
        two_opt.improve(&instance, &mut parent1);
        two_opt.improve(&instance, &mut parent2);
        parent1.producer = two_opt.name().to_string();
        parent2.producer = two_opt.name().to_string();
    }

    let mut operator = BabCrossover::with_config(config);
    let mut child = Individual::new();
    let start = Instant::now();
    if let Err(e) = operator.recombine(&mut child, &instance, &parent1, &parent2) {
        eprintln!("Recombination failed: {}", e);
        std::process::exit(1);
    }
    let elapsed = start.elapsed();
    let stats = operator.last_statistics();

    println!("\n========== Results ==========");
    println!("Instance: {} (n={})", instance.name, instance.dimension);
    println!("Parent 1: {}", parent1.tour_length);
    println!("Parent 2: {}", parent2.tour_length);
    println!("Child: {}", child.tour_length);
    println!("Shared arcs: {}", stats.shared_arcs);
    println!("Groups: {}", stats.groups);
    println!("Root bound: {}", stats.root_bound);
    println!(
        "Nodes: {} expanded, {} pruned, {} infeasible (peak open {})",
        stats.nodes_expanded, stats.nodes_pruned, stats.nodes_infeasible, stats.peak_open_nodes
    );
    println!("Termination: {}", stats.termination);
    println!("Time: {:.4}s", elapsed.as_secs_f64());

    if verbose {
        println!("\nTour: {:?}", child.solution);
    }

    if let Some(out_path) = output {
        let json = match serde_json::to_string_pretty(&child) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error serializing child: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = std::fs::write(&out_path, json) {
            eprintln!("Failed to write output: {}", e);
            std::process::exit(1);
        }
        println!("\nChild saved to {:?}", out_path);
    }
}

fn run_benchmark(config: BenchmarkConfig, output: &PathBuf) {
    if let Err(e) = std::fs::create_dir_all(output) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    println!(
        "Benchmarking {} on sizes {:?} ({} trials each)...",
        BabCrossover::NAME,
        config.sizes,
        config.trials
    );

    let mut benchmark = Benchmark::new(config);
    if let Err(e) = benchmark.run() {
        eprintln!("Benchmark failed: {}", e);
        std::process::exit(1);
    }

    let results_path = output.join("results.csv");
    if let Err(e) = benchmark.export_to_csv(&results_path) {
        eprintln!("Failed to export results: {}", e);
        std::process::exit(1);
    }
    println!("\nResults exported to {:?}", results_path);

    let stats_path = output.join("statistics.csv");
    if let Err(e) = benchmark.export_statistics_csv(&stats_path) {
        eprintln!("Failed to export statistics: {}", e);
        std::process::exit(1);
    }
    println!("Statistics exported to {:?}", stats_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    if let Err(e) = std::fs::write(&report_path, &report) {
        eprintln!("Failed to save report: {}", e);
        std::process::exit(1);
    }
    println!("Report saved to {:?}", report_path);
}
