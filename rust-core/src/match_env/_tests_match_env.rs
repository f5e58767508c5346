#[cfg(test)]
mod _tests_match_env {
    use super::super::{MatchEnv, MatchEnvBuilder};
    use crate::environment::{Correspondence, EnvDisjointSet, Environment};
    use crate::error::{MatchEnvError, Result};
    use crate::geometries::SimBox;
    use crate::interfaces::{MatchingPolicy, PairStrategy, RunKind};
    use crate::locality::{CellListNeighbors, Neighbor, NeighborList, NeighborSource};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // Helper function to create an n x n square lattice of unit spacing in the xy plane
    fn square_lattice(n: usize) -> Vec<Vector3<f64>> {
        let mut points = Vec::new();
        for x in 0..n {
            for y in 0..n {
                points.push(Vector3::new(x as f64, y as f64, 0.0));
            }
        }
        points
    }

    // Honeycomb with unit bonds: rectangular cell sqrt(3) x 3 holding four atoms,
    // alternating between the two sublattices
    fn honeycomb(nx: usize, ny: usize) -> (SimBox, Vec<Vector3<f64>>) {
        let a = 3f64.sqrt();
        let basis = [(0.0, 0.0), (a / 2.0, 0.5), (a / 2.0, 1.5), (0.0, 2.0)];
        let mut points = Vec::new();
        for cx in 0..nx {
            for cy in 0..ny {
                for &(x, y) in &basis {
                    points.push(Vector3::new(x + cx as f64 * a, y + cy as f64 * 3.0, 0.0));
                }
            }
        }
        let sim_box = SimBox::square(nx as f64 * a, ny as f64 * 3.0).unwrap();
        (sim_box, points)
    }

    fn random_points(n: usize, l: f64, seed: u64) -> Vec<Vector3<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| Vector3::new(rng.gen_range(0.0..l), rng.gen_range(0.0..l), rng.gen_range(0.0..l)))
            .collect()
    }

    #[test]
    fn test_square_lattice_single_cluster() {
        init_logger();
        let sim_box = SimBox::square(4.0, 4.0).unwrap();
        let points = square_lattice(4);
        let mut matcher = MatchEnv::new(sim_box, 1.5, 4).unwrap();
        matcher.cluster(&points, 0.1, false).unwrap();

        assert_eq!(matcher.num_clusters().unwrap(), 1);
        assert_eq!(matcher.num_particles().unwrap(), 16);
        assert!(matcher.clusters().unwrap().iter().all(|&l| l == 0));

        // Frames line up, so averaging keeps unit vectors
        let average = matcher.environment(0).unwrap();
        assert_eq!(average.len(), 4);
        for v in average {
            assert_abs_diff_eq!(v.norm(), 1.0, epsilon = 1e-9);
        }
        let tot = matcher.tot_environment().unwrap();
        assert_eq!(tot.len(), 16);
        assert!(tot.iter().all(|env| env.len() == 4));
    }

    #[test]
    fn test_square_lattice_with_cell_list_and_greedy() {
        let sim_box = SimBox::square(4.0, 4.0).unwrap();
        let points = square_lattice(4);
        let mut matcher = MatchEnvBuilder::new()
            .with_box(sim_box)
            .with_rmax(1.5)
            .with_num_neighbors(4)
            .with_matching_policy(MatchingPolicy::Greedy)
            .build_with::<CellListNeighbors>()
            .unwrap();
        matcher.cluster(&points, 0.1, false).unwrap();
        assert_eq!(matcher.num_clusters().unwrap(), 1);
    }

    #[test]
    fn test_honeycomb_sublattices() {
        init_logger();
        let (sim_box, points) = honeycomb(3, 2);
        assert_eq!(points.len(), 24);

        // Neighbors always sit on the other sublattice, whose environment is inverted
        let mut by_neighbors = MatchEnv::new(sim_box, 1.2, 3).unwrap();
        by_neighbors.cluster(&points, 0.1, false).unwrap();
        assert_eq!(by_neighbors.num_clusters().unwrap(), 24);
        let labels: Vec<usize> = (0..24).collect();
        assert_eq!(by_neighbors.clusters().unwrap(), labels.as_slice());

        let mut by_all_pairs = MatchEnvBuilder::new()
            .with_box(sim_box)
            .with_rmax(1.2)
            .with_num_neighbors(3)
            .with_pair_strategy(PairStrategy::AllPairs)
            .build()
            .unwrap();
        by_all_pairs.cluster(&points, 0.1, false).unwrap();
        assert_eq!(by_all_pairs.num_clusters().unwrap(), 2);
        assert_eq!(&by_all_pairs.clusters().unwrap()[..4], &[0, 1, 0, 1]);

        let sizes = by_all_pairs.results().unwrap().cluster_sizes();
        assert_eq!(sizes.get(&0), Some(&12));
        assert_eq!(sizes.get(&1), Some(&12));

        // The two averaged environments are inversions of each other
        let a = by_all_pairs.environment(0).unwrap();
        let b = by_all_pairs.environment(1).unwrap();
        for v in a {
            assert_abs_diff_eq!(v.norm(), 1.0, epsilon = 1e-9);
            assert!(b.iter().any(|w| (v + w).norm() < 1e-9));
        }
    }

    #[test]
    fn test_single_particle() {
        let mut matcher = MatchEnv::new(SimBox::cube(10.0).unwrap(), 1.5, 4).unwrap();
        matcher.cluster(&[Vector3::new(1.0, 2.0, 3.0)], 0.1, false).unwrap();
        assert_eq!(matcher.num_clusters().unwrap(), 1);
        assert_eq!(matcher.clusters().unwrap(), &[0]);
        assert!(matcher.tot_environment().unwrap()[0].iter().all(|v| *v == Vector3::zeros()));
    }

    #[test]
    fn test_no_particles() {
        let mut matcher = MatchEnv::new(SimBox::cube(10.0).unwrap(), 1.5, 4).unwrap();
        matcher.cluster(&[], 0.1, false).unwrap();
        assert_eq!(matcher.num_clusters().unwrap(), 0);
        assert_eq!(matcher.num_particles().unwrap(), 0);
    }

    #[test]
    fn test_zero_threshold_on_random_points() {
        let points = random_points(40, 10.0, 17);
        let mut matcher = MatchEnv::new(SimBox::cube(10.0).unwrap(), 3.0, 6).unwrap();
        matcher.cluster(&points, 0.0, false).unwrap();
        assert_eq!(matcher.num_clusters().unwrap(), points.len());
    }

    #[test]
    fn test_zero_threshold_on_perfect_lattice() {
        // Every site has the same environment, but distinct sites never match at zero
        let sim_box = SimBox::square(4.0, 4.0).unwrap();
        let points = square_lattice(4);
        for strategy in [PairStrategy::Neighbors, PairStrategy::AllPairs] {
            let mut matcher = MatchEnvBuilder::new()
                .with_box(sim_box)
                .with_rmax(1.5)
                .with_num_neighbors(4)
                .with_pair_strategy(strategy)
                .build()
                .unwrap();
            matcher.cluster(&points, 0.0, false).unwrap();
            assert_eq!(matcher.num_clusters().unwrap(), 16, "{:?}", strategy);
            let labels: Vec<usize> = (0..16).collect();
            assert_eq!(matcher.clusters().unwrap(), labels.as_slice());
        }
    }

    #[test]
    fn test_isolated_particles_stay_apart_with_hard_r() {
        // Five sites on a periodic line, 4 apart: identical two-neighbor environments
        let sim_box = SimBox::cube(20.0).unwrap();
        let points: Vec<Vector3<f64>> =
            (0..5).map(|i| Vector3::new(4.0 * i as f64, 0.0, 0.0)).collect();

        let mut matcher = MatchEnv::new(sim_box, 1.0, 2).unwrap();
        matcher.cluster(&points, 0.1, false).unwrap();
        assert_eq!(matcher.num_clusters().unwrap(), 1);

        // Nothing lies within rmax, so every environment is empty and matches nothing
        matcher.cluster(&points, 0.1, true).unwrap();
        assert_eq!(matcher.num_clusters().unwrap(), 5);
        assert!(matcher
            .tot_environment()
            .unwrap()
            .iter()
            .all(|env| env.iter().all(|v| *v == Vector3::zeros())));
    }

    #[test]
    fn test_cluster_count_monotone_in_threshold() {
        let points = random_points(60, 6.0, 23);
        let mut matcher = MatchEnvBuilder::new()
            .with_box(SimBox::cube(6.0).unwrap())
            .with_rmax(2.0)
            .with_num_neighbors(4)
            .with_pair_strategy(PairStrategy::AllPairs)
            .build()
            .unwrap();

        let mut previous = usize::MAX;
        for threshold in [0.05, 0.2, 0.5, 1.0, 1.9] {
            matcher.cluster(&points, threshold, false).unwrap();
            let count = matcher.num_clusters().unwrap();
            assert!(count <= previous, "threshold {} gave {} > {}", threshold, count, previous);

            let labels = matcher.clusters().unwrap();
            assert_eq!(labels[0], 0);
            assert!(labels.iter().all(|&l| l < count));
            previous = count;
        }
    }

    #[test]
    fn test_hard_r_limits_environment() {
        let sim_box = SimBox::square(4.0, 4.0).unwrap();
        let points = square_lattice(4);
        let matcher = MatchEnv::new(sim_box, 1.2, 8).unwrap();

        let soft = matcher.build_env(&points, 5, 5, false).unwrap();
        let hard = matcher.build_env(&points, 5, 5, true).unwrap();
        assert_eq!(soft.num_vecs(), 8);
        assert_eq!(hard.num_vecs(), 4);
        assert_eq!(hard.env_index, 5);
        assert!(hard.vectors().iter().all(|v| v.norm_squared() < 1.44));

        let mut matcher = matcher;
        matcher.cluster(&points, 0.1, true).unwrap();
        assert_eq!(matcher.num_clusters().unwrap(), 1);
        let average = matcher.environment(0).unwrap();
        assert_eq!(average.len(), 8);
        assert_eq!(average.iter().filter(|v| v.norm() > 0.5).count(), 4);
        assert!(matcher.tot_environment().unwrap().iter().all(|env| env.len() == 8));
    }

    #[test]
    fn test_build_env_matches_neighbor_list() {
        let points = random_points(50, 6.0, 31);
        let matcher = MatchEnv::new(SimBox::cube(6.0).unwrap(), 1.5, 5).unwrap();
        let list = matcher.neighbor_source().compute(&points).unwrap();
        for i in [0, 12, 49] {
            let env = matcher.build_env(&points, i, i, false).unwrap();
            let expected: Vec<Vector3<f64>> =
                list.neighbors_of(i).unwrap().iter().map(|n| n.delta).collect();
            assert_eq!(env.vectors(), expected.as_slice());
        }
    }

    #[test]
    fn test_build_env_out_of_range() {
        let matcher = MatchEnv::new(SimBox::cube(5.0).unwrap(), 1.5, 4).unwrap();
        let points = vec![Vector3::new(1.0, 1.0, 1.0), Vector3::new(2.0, 1.0, 1.0)];
        assert!(matches!(
            matcher.build_env(&points, 2, 0, false),
            Err(MatchEnvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_accessors_require_a_run() {
        let sim_box = SimBox::square(4.0, 4.0).unwrap();
        let mut matcher = MatchEnv::new(sim_box, 1.5, 4).unwrap();
        assert!(matches!(matcher.clusters(), Err(MatchEnvError::EmptyResult(_))));
        assert!(matches!(matcher.num_clusters(), Err(MatchEnvError::EmptyResult(_))));
        assert!(matches!(matcher.environment(0), Err(MatchEnvError::EmptyResult(_))));
        assert!(matches!(matcher.tot_environment(), Err(MatchEnvError::EmptyResult(_))));
        assert!(matches!(matcher.num_particles(), Err(MatchEnvError::EmptyResult(_))));
        assert_eq!(matcher.num_neighbors(), 4);

        matcher.cluster(&square_lattice(4), 0.1, false).unwrap();
        assert!(matches!(matcher.environment(3), Err(MatchEnvError::InvalidArgument(_))));
        assert_eq!(matcher.results().unwrap().run, RunKind::Cluster);
        assert!(matcher.results().unwrap().motif_matches().is_none());

        // Rebinding the box drops the previous results
        matcher.set_box(SimBox::square(5.0, 5.0).unwrap()).unwrap();
        assert!(matches!(matcher.clusters(), Err(MatchEnvError::EmptyResult(_))));
        assert_eq!(matcher.sim_box().lengths().x, 5.0);

        let rebound = matcher.with_box(SimBox::square(4.0, 4.0).unwrap()).unwrap();
        assert_eq!(rebound.neighbor_source().sim_box().lengths().x, 4.0);
    }

    #[test]
    fn test_failed_run_publishes_nothing() {
        let sim_box = SimBox::square(4.0, 4.0).unwrap();
        let mut matcher = MatchEnv::new(sim_box, 1.5, 4).unwrap();
        matcher.cluster(&square_lattice(4), 0.1, false).unwrap();
        assert!(matcher.results().is_ok());

        let mut points = square_lattice(4);
        points[3].x = f64::NAN;
        assert!(matches!(
            matcher.cluster(&points, 0.1, false),
            Err(MatchEnvError::InvalidArgument(_))
        ));
        assert!(matches!(matcher.results(), Err(MatchEnvError::EmptyResult(_))));

        assert!(matches!(
            matcher.cluster(&square_lattice(4), f64::INFINITY, false),
            Err(MatchEnvError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_large_threshold_still_runs() {
        let points = random_points(20, 8.0, 2);
        let mut matcher = MatchEnv::new(SimBox::cube(8.0).unwrap(), 2.0, 4).unwrap();
        matcher.cluster(&points, 3.0, false).unwrap();
        assert!(matcher.num_clusters().unwrap() >= 1);
    }

    // Reports one neighbor more than it was configured for
    #[derive(Debug, Clone)]
    struct OverfullSource {
        sim_box: SimBox,
        rmax: f64,
        k: usize,
    }

    impl NeighborSource for OverfullSource {
        fn configure(sim_box: &SimBox, rmax: f64, k: usize) -> Result<Self> {
            Ok(OverfullSource { sim_box: *sim_box, rmax, k })
        }

        fn num_neighbors(&self) -> usize {
            self.k
        }

        fn rmax(&self) -> f64 {
            self.rmax
        }

        fn sim_box(&self) -> &SimBox {
            &self.sim_box
        }

        fn compute(&self, points: &[Vector3<f64>]) -> Result<NeighborList> {
            let fake = |n: usize| Neighbor {
                index: 0,
                delta: Vector3::new(n as f64 + 1.0, 0.0, 0.0),
                dist_sq: (n as f64 + 1.0).powi(2),
            };
            Ok(NeighborList::new(
                points.iter().map(|_| (0..=self.k).map(fake).collect()).collect(),
            ))
        }

        fn neighbors_of(&self, points: &[Vector3<f64>], i: usize) -> Result<Vec<Neighbor>> {
            Ok(self.compute(points)?.neighbors_of(i)?.to_vec())
        }
    }

    #[test]
    fn test_overfull_neighbor_source() {
        let mut matcher = MatchEnvBuilder::new()
            .with_box(SimBox::cube(5.0).unwrap())
            .with_rmax(1.0)
            .with_num_neighbors(2)
            .build_with::<OverfullSource>()
            .unwrap();
        let points = vec![Vector3::new(1.0, 1.0, 1.0), Vector3::new(2.0, 2.0, 2.0)];
        assert_eq!(
            matcher.cluster(&points, 0.1, false),
            Err(MatchEnvError::OutOfCapacity { capacity: 2 })
        );
        assert!(matcher.results().is_err());
        assert_eq!(
            matcher.build_env(&points, 1, 1, false),
            Err(MatchEnvError::OutOfCapacity { capacity: 2 })
        );
    }

    #[test]
    fn test_populate_env_requires_matching_capacity() {
        let matcher = MatchEnv::new(SimBox::cube(10.0).unwrap(), 1.5, 4).unwrap();
        let wide = EnvDisjointSet::new(6);
        assert!(matches!(
            matcher.populate_env(&wide, true),
            Err(MatchEnvError::InvalidArgument(_))
        ));

        let arm = [Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];
        let environments = vec![
            Environment::from_vectors(4, &arm).unwrap(),
            Environment::from_vectors(4, &arm).unwrap(),
            Environment::from_vectors(4, &arm[..1]).unwrap(),
        ];
        let mut dj = EnvDisjointSet::from_environments(4, environments).unwrap();
        dj.merge(0, 2, &Correspondence::identity(2)).unwrap_err();
        let mut partial = Correspondence::new(2, 1);
        partial.insert(0, 0).unwrap();
        dj.merge(0, 2, &partial).unwrap();

        let results = matcher.populate_env(&dj, true).unwrap();
        assert_eq!(results.env_index, vec![0, 1, 0]);
        assert_eq!(results.num_clusters, 2);
        assert!(results.tot_env.iter().all(|env| env.len() == 4));
        assert_eq!(results.environment(0).unwrap().len(), 4);
    }

    #[test]
    fn test_results_serialize() {
        let sim_box = SimBox::square(4.0, 4.0).unwrap();
        let mut matcher = MatchEnv::new(sim_box, 1.5, 4).unwrap();
        matcher.cluster(&square_lattice(4), 0.1, false).unwrap();

        let results = matcher.results().unwrap();
        let json = serde_json::to_string(results).unwrap();
        assert!(json.contains("\"num_clusters\":1"));
        assert!(json.contains("\"run\":\"Cluster\""));
    }
}
