use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tsp_bench::codec;
use tsp_bench::crossover::{ArcGrouping, BabConfig, BabCrossover, BinaryOperator, Parent, SearchLimits, Termination};
use tsp_bench::heuristics::local_search::{LocalSearch, TwoOptSearch};
use tsp_bench::instance::{DistanceOracle, Instance};
use tsp_bench::solution::Individual;

fn random_matrix(n: usize, rng: &mut ChaCha8Rng) -> Instance {
    let rows = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 0 } else { rng.gen_range(1..100) }).collect())
        .collect();
    Instance::from_matrix("asym", rows).unwrap()
}

fn adjacency(tour: &[usize]) -> Vec<usize> {
    let mut adj = vec![0; tour.len()];
    codec::path_to_adjacency(tour, &mut adj, None);
    adj
}

/// Shortest single tour among all group choices, by enumeration
fn brute_force(oracle: &dyn DistanceOracle, p1: &[usize], p2: &[usize]) -> Option<i64> {
    let mut grouping = ArcGrouping::new();
    grouping.preprocess(oracle, p1, p2);
    let n = grouping.n();
    let k = grouping.len();

    let mut best = None;
    let mut adj = vec![0; n];
    let mut path = Vec::new();
    for mask in 0u64..(1u64 << k) {
        for (row, slot) in adj.iter_mut().enumerate() {
            let parent = match grouping.group_of(row) {
                Some(g) if mask & (1 << g) != 0 => Parent::Second,
                _ => Parent::First,
            };
            *slot = grouping.successor(row, parent);
        }
        if codec::adjacency_to_path(&adj, 0, &mut path).is_ok() {
            let length = oracle.evaluate(&path);
            best = Some(best.map_or(length, |b: i64| b.min(length)));
        }
    }
    best
}

#[test]
fn child_is_a_valid_tour_no_longer_than_either_parent() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let mut op = BabCrossover::new();

    for &n in &[5, 8, 13, 30, 60] {
        let inst = Instance::random_euclidean("r", n, 1000.0, &mut rng).unwrap();
        op.begin_run(&inst);
        for _ in 0..10 {
            let p1 = Individual::random(&inst, &mut rng);
            let p2 = Individual::random(&inst, &mut rng);
            let mut child = Individual::new();
            op.recombine(&mut child, &inst, &p1, &p2).unwrap();

            assert!(child.is_valid(&inst));
            assert_eq!(child.tour_length, inst.evaluate(&child.solution));
            assert!(child.tour_length <= p1.tour_length.min(p2.tour_length));
            assert!(op.last_statistics().root_bound <= child.tour_length);
        }
        op.end_run();
    }
}

#[test]
fn child_keeps_every_shared_arc() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let inst = Instance::random_euclidean("r", 40, 1000.0, &mut rng).unwrap();
    let two_opt = TwoOptSearch::first_improvement();
    let mut op = BabCrossover::new();

    for _ in 0..5 {
        let mut p1 = Individual::random(&inst, &mut rng);
        let mut p2 = Individual::random(&inst, &mut rng);
        two_opt.improve(&inst, &mut p1);
        two_opt.improve(&inst, &mut p2);

        let mut child = Individual::new();
        op.recombine(&mut child, &inst, &p1, &p2).unwrap();

        let (a1, a2, c) = (adjacency(&p1.solution), adjacency(&p2.solution), adjacency(&child.solution));
        for row in 0..inst.n() {
            if a1[row] == a2[row] {
                assert_eq!(c[row], a1[row], "shared arc {} -> {} dropped", row, a1[row]);
            }
            assert!(c[row] == a1[row] || c[row] == a2[row]);
        }
    }
}

#[test]
fn child_matches_enumeration_of_group_choices() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut op = BabCrossover::new();

    for trial in 0..40 {
        let n = rng.gen_range(4..=10);
        let inst = if trial % 2 == 0 {
            Instance::random_euclidean("sym", n, 100.0, &mut rng).unwrap()
        } else {
            random_matrix(n, &mut rng)
        };
        let p1 = Individual::random(&inst, &mut rng);
        let p2 = Individual::random(&inst, &mut rng);

        let mut child = Individual::new();
        op.recombine(&mut child, &inst, &p1, &p2).unwrap();
        assert_eq!(op.last_statistics().termination, Termination::Exhausted);

        let parents_best = p1.tour_length.min(p2.tour_length);
        let expected = brute_force(&inst, &p1.solution, &p2.solution).map_or(parents_best, |b| b.min(parents_best));
        assert_eq!(child.tour_length, expected, "trial {} (n={})", trial, n);
    }
}

#[test]
fn recombination_is_deterministic() {
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    let inst = random_matrix(25, &mut rng);
    let p1 = Individual::random(&inst, &mut rng);
    let p2 = Individual::random(&inst, &mut rng);

    let mut first = Individual::new();
    let mut second = Individual::new();
    BabCrossover::new().recombine(&mut first, &inst, &p1, &p2).unwrap();
    let mut reused = BabCrossover::new();
    reused.recombine(&mut second, &inst, &p2, &p1).unwrap();
    reused.recombine(&mut second, &inst, &p1, &p2).unwrap();

    assert_eq!(first, second);
}

#[test]
fn node_limit_still_returns_a_valid_child() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let inst = Instance::random_euclidean("r", 80, 1000.0, &mut rng).unwrap();
    let mut op = BabCrossover::with_config(BabConfig {
        limits: SearchLimits {
            max_expanded_nodes: Some(1),
            ..Default::default()
        },
        ..Default::default()
    });

    let p1 = Individual::random(&inst, &mut rng);
    let p2 = Individual::random(&inst, &mut rng);
    let mut child = Individual::new();
    op.recombine(&mut child, &inst, &p1, &p2).unwrap();

    assert!(child.is_valid(&inst));
    assert!(child.tour_length <= p1.tour_length.min(p2.tour_length));
    assert!(op.last_statistics().nodes_expanded <= 1);
}

fn locally_optimal_pair(inst: &Instance, rng: &mut ChaCha8Rng) -> (Individual, Individual) {
    let two_opt = TwoOptSearch::first_improvement();
    let mut p1 = Individual::random(inst, rng);
    let mut p2 = Individual::random(inst, rng);
    two_opt.improve(inst, &mut p1);
    two_opt.improve(inst, &mut p2);
    (p1, p2)
}

#[test]
fn open_node_limit_still_returns_a_valid_child() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let inst = Instance::random_euclidean("r", 150, 1000.0, &mut rng).unwrap();
    let mut op = BabCrossover::with_config(BabConfig {
        limits: SearchLimits {
            max_open_nodes: 0,
            ..Default::default()
        },
        ..Default::default()
    });

    let mut capped = 0;
    for _ in 0..4 {
        let (p1, p2) = locally_optimal_pair(&inst, &mut rng);
        let mut child = Individual::new();
        op.recombine(&mut child, &inst, &p1, &p2).unwrap();

        let stats = op.last_statistics();
        match stats.termination {
            Termination::OpenNodeLimit => capped += 1,
            // the root alone settled it
            Termination::Exhausted => assert!(stats.nodes_expanded <= 1),
            other => panic!("unexpected termination {}", other),
        }
        assert_eq!(stats.peak_open_nodes, 0);
        assert!(child.is_valid(&inst));
        assert!(child.tour_length <= p1.tour_length.min(p2.tour_length));
    }
    assert!(capped > 0);
}

#[test]
fn time_limit_still_returns_a_valid_child() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    let inst = Instance::random_euclidean("r", 150, 1000.0, &mut rng).unwrap();
    let mut op = BabCrossover::with_config(BabConfig {
        limits: SearchLimits {
            time_limit: Some(0.0),
            ..Default::default()
        },
        ..Default::default()
    });

    let mut capped = 0;
    for _ in 0..4 {
        let (p1, p2) = locally_optimal_pair(&inst, &mut rng);
        let mut child = Individual::new();
        op.recombine(&mut child, &inst, &p1, &p2).unwrap();

        let stats = op.last_statistics();
        match stats.termination {
            Termination::TimeLimit => capped += 1,
            // root bound already no better than the better parent
            Termination::Exhausted => {}
            other => panic!("unexpected termination {}", other),
        }
        assert_eq!(stats.nodes_expanded, 0);
        assert!(child.is_valid(&inst));
        assert_eq!(child.tour_length, p1.tour_length.min(p2.tour_length));
    }
    assert!(capped > 0);
}
