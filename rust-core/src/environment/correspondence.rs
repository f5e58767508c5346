use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MatchEnvError, Result};

/// Partial one-to-one map between the vector slots of two environments.
///
/// `forward[s]` is the target slot paired with source slot `s`; `reverse` holds the
/// inverse lookup, so injectivity is checked on every insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correspondence {
    forward: Vec<Option<usize>>,
    reverse: Vec<Option<usize>>,
}

impl Correspondence {
    /// Empty map between a source of `source_len` and a target of `target_len` slots.
    pub fn new(source_len: usize, target_len: usize) -> Self {
        Correspondence {
            forward: vec![None; source_len],
            reverse: vec![None; target_len],
        }
    }

    /// Identity map over `n` slots.
    pub fn identity(n: usize) -> Self {
        Correspondence {
            forward: (0..n).map(Some).collect(),
            reverse: (0..n).map(Some).collect(),
        }
    }

    /// Pair `source` with `target`. Re-inserting an existing pair is a no-op.
    pub fn insert(&mut self, source: usize, target: usize) -> Result<()> {
        if source >= self.forward.len() || target >= self.reverse.len() {
            return Err(MatchEnvError::invalid(format!(
                "pair ({}, {}) outside a {}x{} correspondence",
                source,
                target,
                self.forward.len(),
                self.reverse.len()
            )));
        }
        match (self.forward[source], self.reverse[target]) {
            (None, None) => {
                self.forward[source] = Some(target);
                self.reverse[target] = Some(source);
                Ok(())
            }
            (Some(t), Some(s)) if t == target && s == source => Ok(()),
            _ => Err(MatchEnvError::invalid(format!(
                "pair ({}, {}) would break injectivity",
                source, target
            ))),
        }
    }

    /// Target slot paired with `source`.
    pub fn get(&self, source: usize) -> Option<usize> {
        self.forward.get(source).copied().flatten()
    }

    /// Source slot paired with `target`.
    pub fn source_of(&self, target: usize) -> Option<usize> {
        self.reverse.get(target).copied().flatten()
    }

    pub fn source_len(&self) -> usize {
        self.forward.len()
    }

    pub fn target_len(&self) -> usize {
        self.reverse.len()
    }

    /// Number of paired slots.
    pub fn len(&self) -> usize {
        self.forward.iter().filter(|t| t.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paired slots as `(source, target)`, by increasing source.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.forward
            .iter()
            .enumerate()
            .filter_map(|(s, t)| t.map(|t| (s, t)))
    }

    /// Same pairs with source and target swapped.
    pub fn inverse(&self) -> Self {
        Correspondence {
            forward: self.reverse.clone(),
            reverse: self.forward.clone(),
        }
    }

    /// Every source slot is paired.
    pub fn covers_source(&self) -> bool {
        self.forward.iter().all(Option::is_some)
    }

    /// Every target slot is paired.
    pub fn covers_target(&self) -> bool {
        self.reverse.iter().all(Option::is_some)
    }

    pub fn is_identity(&self) -> bool {
        self.forward.len() == self.reverse.len()
            && self.forward.iter().enumerate().all(|(s, t)| *t == Some(s))
    }

    /// Ordered `source -> target` map of the paired slots.
    pub fn to_map(&self) -> BTreeMap<usize, usize> {
        self.pairs().collect()
    }
}
