use nalgebra::Vector3;

use crate::environment::correspondence::Correspondence;
use crate::environment::local_environment::Environment;
use crate::error::{MatchEnvError, Result};

/// Union-find over environments.
///
/// Elements live in an arena addressed by their id; `parent` and `rank` are
/// parallel index arrays, and each root also keeps the ids of its members. Every
/// class shares one vector frame: after a merge, slot `j` of any member's
/// `vec_ind` refers to the same neighbor direction.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvDisjointSet {
    elements: Vec<Environment>,
    parent: Vec<usize>,
    rank: Vec<usize>,
    // Member ids per root; empty for non-roots
    members: Vec<Vec<usize>>,
    num_neigh: usize,
}

impl EnvDisjointSet {
    /// Create an empty set for environments of capacity `num_neigh`.
    pub fn new(num_neigh: usize) -> Self {
        EnvDisjointSet {
            elements: Vec::new(),
            parent: Vec::new(),
            rank: Vec::new(),
            members: Vec::new(),
            num_neigh,
        }
    }

    /// One singleton class per environment, ids in input order.
    pub fn from_environments(num_neigh: usize, environments: Vec<Environment>) -> Result<Self> {
        let mut dj = EnvDisjointSet::new(num_neigh);
        dj.elements.reserve(environments.len());
        for env in environments {
            dj.push(env)?;
        }
        Ok(dj)
    }

    /// Add an environment as a new singleton class and return its id.
    pub fn push(&mut self, mut env: Environment) -> Result<usize> {
        if env.num_neigh() != self.num_neigh {
            return Err(MatchEnvError::invalid(format!(
                "environment capacity {} differs from the set's {}",
                env.num_neigh(),
                self.num_neigh
            )));
        }
        let id = self.elements.len();
        env.env_index = id;
        self.elements.push(env);
        self.parent.push(id);
        self.rank.push(0);
        self.members.push(vec![id]);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn num_neigh(&self) -> usize {
        self.num_neigh
    }

    pub fn elements(&self) -> &[Environment] {
        &self.elements
    }

    pub fn element(&self, id: usize) -> Result<&Environment> {
        self.check_index(id)?;
        Ok(&self.elements[id])
    }

    /// Representative (root) of the class containing `c`.
    pub fn find(&self, c: usize) -> Result<usize> {
        self.check_index(c)?;
        Ok(self.root(c))
    }

    /// Number of distinct classes.
    pub fn num_classes(&self) -> usize {
        (0..self.len()).filter(|&i| self.parent[i] == i).count()
    }

    /// Union the classes of `a` and `b`.
    ///
    /// `correspondence` pairs raw vector slots of element `a` (source) with raw
    /// slots of element `b` (target). Union by rank picks the surviving root; every
    /// member of the other class is re-indexed into the survivor's frame. Slots
    /// that cannot be paired become empty and are left out of averages.
    /// Returns `false` if `a` and `b` were already in the same class.
    pub fn merge(&mut self, a: usize, b: usize, correspondence: &Correspondence) -> Result<bool> {
        self.check_index(a)?;
        self.check_index(b)?;
        if correspondence.source_len() != self.elements[a].num_vecs()
            || correspondence.target_len() != self.elements[b].num_vecs()
        {
            return Err(MatchEnvError::invalid(format!(
                "correspondence of shape {}x{} does not fit elements {} and {} ({} and {} vectors)",
                correspondence.source_len(),
                correspondence.target_len(),
                a,
                b,
                self.elements[a].num_vecs(),
                self.elements[b].num_vecs()
            )));
        }

        let root_a = self.find_compress(a);
        let root_b = self.find_compress(b);
        if root_a == root_b {
            return Ok(false);
        }

        if self.rank[root_a] >= self.rank[root_b] {
            self.absorb(root_a, root_b, a, b, |raw_a| correspondence.get(raw_a));
        } else {
            self.absorb(root_b, root_a, b, a, |raw_b| correspondence.source_of(raw_b));
        }
        Ok(true)
    }

    /// Ids of every element in the class containing `m`.
    pub fn find_set(&self, m: usize) -> Result<Vec<usize>> {
        let root = self.find(m)?;
        let mut members = self.members[root].clone();
        members.sort_unstable();
        Ok(members)
    }

    /// Class-averaged environment of `m`, `num_neigh` vectors in the class frame.
    ///
    /// Slot `j` is the mean of the members' vectors at frame slot `j`. Ghost members
    /// only contribute when the class has no physical member. Slots no member fills
    /// are zero vectors.
    pub fn get_avg_env(&self, m: usize) -> Result<Vec<Vector3<f64>>> {
        let members = self.find_set(m)?;
        let physical: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&i| !self.elements[i].ghost)
            .collect();
        let contributors = if physical.is_empty() { members } else { physical };

        let mut sums = vec![Vector3::zeros(); self.num_neigh];
        let mut counts = vec![0usize; self.num_neigh];
        for &i in &contributors {
            for (slot, v) in self.elements[i].frame_entries() {
                if slot < self.num_neigh {
                    sums[slot] += v;
                    counts[slot] += 1;
                }
            }
        }

        Ok(sums
            .into_iter()
            .zip(counts)
            .map(|(sum, count)| if count > 0 { sum / count as f64 } else { Vector3::zeros() })
            .collect())
    }

    /// Raw vectors of element `m` in its class frame; empty slots are zero vectors.
    pub fn get_individual_env(&self, m: usize) -> Result<Vec<Vector3<f64>>> {
        Ok(self.element(m)?.frame_vectors())
    }

    fn check_index(&self, id: usize) -> Result<()> {
        if id < self.elements.len() {
            Ok(())
        } else {
            Err(MatchEnvError::invalid(format!(
                "element {} out of range for {} elements",
                id,
                self.elements.len()
            )))
        }
    }

    fn root(&self, mut c: usize) -> usize {
        while self.parent[c] != c {
            c = self.parent[c];
        }
        c
    }

    // Path compression; only reachable through merge.
    fn find_compress(&mut self, c: usize) -> usize {
        let root = self.root(c);
        let mut node = c;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Hang `lose_root` under `keep_root`, re-indexing the losing class.
    ///
    /// `partner` maps a raw slot of `keep_anchor` to the raw slot of `lose_anchor`
    /// it was matched with.
    fn absorb(
        &mut self,
        keep_root: usize,
        lose_root: usize,
        keep_anchor: usize,
        lose_anchor: usize,
        partner: impl Fn(usize) -> Option<usize>,
    ) {
        // Losing-frame slot lined up with each slot of the surviving frame
        let slot_map: Vec<Option<usize>> = self.elements[keep_anchor]
            .vec_ind()
            .iter()
            .map(|raw| {
                raw.and_then(&partner)
                    .and_then(|p| self.elements[lose_anchor].frame_slot_of(p))
            })
            .collect();

        let moved = std::mem::take(&mut self.members[lose_root]);
        for &member in &moved {
            let env = &mut self.elements[member];
            let old = env.vec_ind();
            let reindexed: Vec<Option<usize>> = slot_map
                .iter()
                .map(|slot| slot.and_then(|t| old.get(t).copied().flatten()))
                .collect();
            env.set_vec_ind(reindexed);
            env.env_index = keep_root;
        }

        self.members[keep_root].extend(moved);
        self.parent[lose_root] = keep_root;
        if self.rank[keep_root] == self.rank[lose_root] {
            self.rank[keep_root] += 1;
        }
        log::trace!("merged class {} into {}", lose_root, keep_root);
    }
}
