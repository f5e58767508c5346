// Similarity module: vector correspondence between two environments
// The test is a bipartite assignment over the squared-distance cost matrix,
// every vector of the smaller environment paired with a distinct vector of the larger.

use nalgebra::{DMatrix, Vector3};

use crate::environment::correspondence::Correspondence;
use crate::environment::local_environment::Environment;
use crate::error::{MatchEnvError, Result};
use crate::interfaces::MatchingPolicy;

/// Is `e1` similar to `e2` under the squared-distance threshold `threshold_sq`?
///
/// Returns the correspondence from slots of `e1` to slots of `e2` when every vector
/// of the smaller environment can be paired with a distinct vector of the larger one
/// such that `|v1 - v2|² < threshold_sq` for every pair, and `None` otherwise.
/// An environment compared with itself yields the identity; distinct environments
/// always go through the threshold test, so equal vectors never match at
/// `threshold_sq == 0`. An empty environment matches nothing, itself included.
pub fn is_similar(
    e1: &Environment,
    e2: &Environment,
    threshold_sq: f64,
    policy: MatchingPolicy,
) -> Option<Correspondence> {
    if e1.is_empty() || e2.is_empty() {
        return None;
    }
    if std::ptr::eq(e1, e2) {
        return Some(Correspondence::identity(e1.num_vecs()));
    }

    // Rows are always the smaller side
    let swapped = e1.num_vecs() > e2.num_vecs();
    let (rows, cols) = if swapped {
        (e2.vectors(), e1.vectors())
    } else {
        (e1.vectors(), e2.vectors())
    };

    let cost = cost_matrix(rows, cols);
    let assignment = match policy {
        MatchingPolicy::Optimal => optimal_assignment(&cost, threshold_sq),
        MatchingPolicy::Greedy => greedy_assignment(&cost, threshold_sq),
    }?;

    let mut correspondence = Correspondence::new(e1.num_vecs(), e2.num_vecs());
    for (row, &col) in assignment.iter().enumerate() {
        let (source, target) = if swapped { (col, row) } else { (row, col) };
        correspondence.insert(source, target).ok()?;
    }
    Some(correspondence)
}

/// Is the vector set `ref_points1` similar to `ref_points2`?
///
/// Both sets are taken as raw environment vectors (no wrapping) and must have the
/// same length.
pub fn is_similar_points(
    ref_points1: &[Vector3<f64>],
    ref_points2: &[Vector3<f64>],
    threshold_sq: f64,
    policy: MatchingPolicy,
) -> Result<Option<Correspondence>> {
    if ref_points1.len() != ref_points2.len() {
        return Err(MatchEnvError::invalid(format!(
            "reference point sets differ in length: {} vs {}",
            ref_points1.len(),
            ref_points2.len()
        )));
    }
    let num_ref = ref_points1.len();
    let e1 = Environment::from_vectors(num_ref, ref_points1)?;
    let e2 = Environment::from_vectors(num_ref, ref_points2)?;
    Ok(is_similar(&e1, &e2, threshold_sq, policy))
}

/// Squared distances between every row vector and every column vector.
fn cost_matrix(rows: &[Vector3<f64>], cols: &[Vector3<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), cols.len(), |r, c| (rows[r] - cols[c]).norm_squared())
}

/// Take pairs in ascending cost order while both ends are free.
///
/// Ties are broken by (row, column). Returns the column of every row, or `None`
/// when some row is left without an admissible partner.
pub(crate) fn greedy_assignment(cost: &DMatrix<f64>, threshold_sq: f64) -> Option<Vec<usize>> {
    let (n, m) = cost.shape();
    let mut pairs: Vec<(f64, usize, usize)> = (0..n)
        .flat_map(|r| (0..m).map(move |c| (r, c)))
        .map(|(r, c)| (cost[(r, c)], r, c))
        .filter(|&(d, _, _)| d < threshold_sq)
        .collect();
    pairs.sort_unstable_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut row_to_col: Vec<Option<usize>> = vec![None; n];
    let mut col_used = vec![false; m];
    for (_, r, c) in pairs {
        if row_to_col[r].is_none() && !col_used[c] {
            row_to_col[r] = Some(c);
            col_used[c] = true;
        }
    }
    row_to_col.into_iter().collect()
}

/// Minimum-cost assignment of every row to a distinct column (rows ≤ columns),
/// using only entries below `threshold_sq`.
///
/// Hungarian algorithm with potentials, O(n²·m). Inadmissible entries get a cost
/// larger than any admissible assignment, so they are used only when no admissible
/// assignment exists, which is then reported as `None`.
pub(crate) fn optimal_assignment(cost: &DMatrix<f64>, threshold_sq: f64) -> Option<Vec<usize>> {
    let (n, m) = cost.shape();
    if n > m {
        return None;
    }
    if n == 0 {
        return Some(Vec::new());
    }

    let admissible = |r: usize, c: usize| cost[(r, c)] < threshold_sq;
    // A row without any admissible column can never be matched
    if (0..n).any(|r| !(0..m).any(|c| admissible(r, c))) {
        return None;
    }

    let max_admissible = (0..n)
        .flat_map(|r| (0..m).map(move |c| (r, c)))
        .filter(|&(r, c)| admissible(r, c))
        .map(|(r, c)| cost[(r, c)])
        .fold(0.0, f64::max);
    let forbidden = (max_admissible + 1.0) * (n as f64 + 1.0);
    let weight = |r: usize, c: usize| if admissible(r, c) { cost[(r, c)] } else { forbidden };

    // Potentials and matching are 1-based; index 0 is the virtual start column
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut matched_row = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for row in 1..=n {
        matched_row[0] = row;
        let mut col0 = 0usize;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[col0] = true;
            let row0 = matched_row[col0];
            let mut delta = f64::INFINITY;
            let mut col1 = 0usize;
            for col in 1..=m {
                if used[col] {
                    continue;
                }
                let slack = weight(row0 - 1, col - 1) - u[row0] - v[col];
                if slack < min_slack[col] {
                    min_slack[col] = slack;
                    way[col] = col0;
                }
                if min_slack[col] < delta {
                    delta = min_slack[col];
                    col1 = col;
                }
            }
            for col in 0..=m {
                if used[col] {
                    u[matched_row[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_slack[col] -= delta;
                }
            }
            col0 = col1;
            if matched_row[col0] == 0 {
                break;
            }
        }

        // Flip the augmenting path
        loop {
            let col1 = way[col0];
            matched_row[col0] = matched_row[col1];
            col0 = col1;
            if col0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0usize; n];
    for col in 1..=m {
        if matched_row[col] != 0 {
            row_to_col[matched_row[col] - 1] = col - 1;
        }
    }
    let valid = row_to_col.iter().enumerate().all(|(r, &c)| admissible(r, c));
    valid.then_some(row_to_col)
}
