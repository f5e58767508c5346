#[cfg(test)]
mod _tests_disjoint_set {
    use super::super::correspondence::Correspondence;
    use super::super::disjoint_set::EnvDisjointSet;
    use super::super::local_environment::Environment;
    use crate::error::MatchEnvError;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    fn square_arms() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(-1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
        ]
    }

    fn correspondence(
        source_len: usize,
        target_len: usize,
        pairs: &[(usize, usize)],
    ) -> Correspondence {
        let mut map = Correspondence::new(source_len, target_len);
        for &(s, t) in pairs {
            map.insert(s, t).unwrap();
        }
        map
    }

    fn set_of(envs: Vec<Vec<Vector3<f64>>>) -> EnvDisjointSet {
        let environments = envs
            .iter()
            .map(|vectors| Environment::from_vectors(4, vectors).unwrap())
            .collect();
        EnvDisjointSet::from_environments(4, environments).unwrap()
    }

    #[test]
    fn test_singletons() {
        let dj = set_of(vec![square_arms(), square_arms()[..3].to_vec()]);
        assert_eq!(dj.len(), 2);
        assert_eq!(dj.num_classes(), 2);
        assert_eq!(dj.find(1).unwrap(), 1);
        assert_eq!(dj.find_set(0).unwrap(), vec![0]);
        assert_eq!(dj.element(1).unwrap().env_index, 1);

        // A singleton average is its own vectors, padded to num_neigh
        let avg = dj.get_avg_env(1).unwrap();
        assert_eq!(avg.len(), 4);
        for (a, b) in avg.iter().zip(square_arms().iter().take(3)) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
        assert_eq!(avg[3], Vector3::zeros());
    }

    #[test]
    fn test_push_rejects_capacity_mismatch() {
        let mut dj = EnvDisjointSet::new(4);
        assert!(dj.is_empty());
        assert_eq!(dj.push(Environment::new(4)).unwrap(), 0);
        assert!(matches!(dj.push(Environment::new(6)), Err(MatchEnvError::InvalidArgument(_))));
        assert_eq!(dj.len(), 1);
    }

    #[test]
    fn test_merge_with_permutation_reindexes() {
        let arms = square_arms();
        // Element 1 holds the same arms rotated in storage order, slightly displaced
        let shifted: Vec<Vector3<f64>> = [2, 3, 0, 1]
            .iter()
            .map(|&i| arms[i] + Vector3::new(0.02, 0.0, 0.0))
            .collect();
        let mut dj = set_of(vec![arms.clone(), shifted.clone()]);

        let map = correspondence(4, 4, &[(0, 2), (1, 3), (2, 0), (3, 1)]);
        assert!(dj.merge(0, 1, &map).unwrap());
        assert_eq!(dj.num_classes(), 1);
        assert_eq!(dj.find(1).unwrap(), 0);
        assert_eq!(dj.element(1).unwrap().env_index, 0);
        assert_eq!(dj.element(1).unwrap().vec_ind(), &[Some(2), Some(3), Some(0), Some(1)]);
        // Raw vectors are never reordered
        assert_eq!(dj.element(1).unwrap().vectors(), shifted.as_slice());

        let individual = dj.get_individual_env(1).unwrap();
        let avg = dj.get_avg_env(1).unwrap();
        for slot in 0..4 {
            assert_abs_diff_eq!(individual[slot], arms[slot] + Vector3::new(0.02, 0.0, 0.0), epsilon = 1e-12);
            assert_abs_diff_eq!(avg[slot], arms[slot] + Vector3::new(0.01, 0.0, 0.0), epsilon = 1e-12);
        }
        assert_eq!(dj.get_avg_env(0).unwrap(), avg);
    }

    #[test]
    fn test_same_class_merge_is_noop() {
        let mut dj = set_of(vec![square_arms(), square_arms()]);
        let identity = Correspondence::identity(4);
        assert!(dj.merge(0, 1, &identity).unwrap());
        let before = dj.clone();
        assert!(!dj.merge(1, 0, &identity).unwrap());
        assert_eq!(dj, before);
    }

    #[test]
    fn test_find_is_transitive() {
        let mut dj = set_of(vec![square_arms(); 5]);
        let identity = Correspondence::identity(4);
        dj.merge(0, 1, &identity).unwrap();
        dj.merge(2, 3, &identity).unwrap();
        dj.merge(3, 1, &identity).unwrap();

        let root = dj.find(0).unwrap();
        for i in 0..4 {
            assert_eq!(dj.find(i).unwrap(), root);
            assert_eq!(dj.find(dj.find(i).unwrap()).unwrap(), root);
        }
        assert_ne!(dj.find(4).unwrap(), root);
        assert_eq!(dj.find_set(2).unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(dj.num_classes(), 2);
    }

    #[test]
    fn test_union_by_rank_keeps_deeper_root() {
        let mut dj = set_of(vec![square_arms(); 3]);
        let identity = Correspondence::identity(4);
        // Equal ranks: the first argument's root survives
        dj.merge(1, 2, &identity).unwrap();
        assert_eq!(dj.find(2).unwrap(), 1);
        // Singleton 0 has lower rank and hangs under 1
        dj.merge(0, 1, &identity).unwrap();
        assert_eq!(dj.find(0).unwrap(), 1);
        assert_eq!(dj.element(0).unwrap().env_index, 1);
    }

    #[test]
    fn test_reverse_direction_merge_uses_inverse_mapping() {
        let arms = square_arms();
        let rotated: Vec<Vector3<f64>> = [1, 2, 3, 0].iter().map(|&i| arms[i]).collect();
        let mut dj = set_of(vec![arms.clone(), arms.clone(), rotated]);
        let identity = Correspondence::identity(4);
        // Raise the rank of class {1, 0}
        dj.merge(1, 0, &identity).unwrap();

        // Element 2 is the lower-ranked side even though it is the source
        let map = correspondence(4, 4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        dj.merge(2, 1, &map).unwrap();
        assert_eq!(dj.find(2).unwrap(), 1);
        let individual = dj.get_individual_env(2).unwrap();
        for slot in 0..4 {
            assert_abs_diff_eq!(individual[slot], arms[slot], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unmatched_slots_are_left_out_of_average() {
        let arms = square_arms();
        let mut dj = set_of(vec![arms.clone(), vec![arms[1], arms[0]]]);
        // Element 0 has four vectors, element 1 only two
        let map = correspondence(4, 2, &[(0, 1), (1, 0)]);
        dj.merge(0, 1, &map).unwrap();

        assert_eq!(dj.element(1).unwrap().vec_ind(), &[Some(1), Some(0), None, None]);
        let individual = dj.get_individual_env(1).unwrap();
        assert_eq!(individual, vec![arms[0], arms[1], Vector3::zeros(), Vector3::zeros()]);

        // Slots 2 and 3 only have element 0 contributing
        let avg = dj.get_avg_env(0).unwrap();
        assert_eq!(avg, arms);
    }

    #[test]
    fn test_merge_rejects_mismatched_correspondence() {
        let mut dj = set_of(vec![square_arms(), square_arms()[..2].to_vec()]);
        let wrong = Correspondence::identity(4);
        assert!(matches!(dj.merge(0, 1, &wrong), Err(MatchEnvError::InvalidArgument(_))));
        assert!(matches!(dj.merge(0, 7, &wrong), Err(MatchEnvError::InvalidArgument(_))));
        assert_eq!(dj.num_classes(), 2);
    }

    #[test]
    fn test_out_of_range_queries() {
        let dj = set_of(vec![square_arms()]);
        assert!(dj.find(1).is_err());
        assert!(dj.find_set(3).is_err());
        assert!(dj.get_avg_env(1).is_err());
        assert!(dj.get_individual_env(1).is_err());
    }

    #[test]
    fn test_ghost_excluded_from_average() {
        let arms = square_arms();
        let doubled: Vec<Vector3<f64>> = arms.iter().map(|v| v * 2.0).collect();
        let ghost = Environment::from_vectors(4, &doubled).unwrap().with_ghost(true);
        let physical = Environment::from_vectors(4, &arms).unwrap();
        let mut dj = EnvDisjointSet::from_environments(4, vec![ghost, physical]).unwrap();

        // Ghost-only class still reports its own vectors
        assert_eq!(dj.get_avg_env(0).unwrap(), doubled);

        dj.merge(0, 1, &Correspondence::identity(4)).unwrap();
        assert_eq!(dj.find(1).unwrap(), 0);
        assert_eq!(dj.get_avg_env(0).unwrap(), arms);
    }
}
