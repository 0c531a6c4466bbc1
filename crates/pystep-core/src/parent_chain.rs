//! The child→parent environment graph, written exactly once per child at
//! closure invocation. Traversed on every name lookup (§4.7).

use crate::env::{EnvId, GLOBAL_ENV_ID};
use ahash::AHashMap;

#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct ParentChain {
    edges: AHashMap<EnvId, EnvId>,
}

impl ParentChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `child`'s parent. Called exactly once per child (at
    /// `CallAssign` time); re-adding the same child is a bug in the stepper.
    pub fn add_edge(&mut self, child: EnvId, parent: EnvId) {
        debug_assert!(
            !self.edges.contains_key(&child),
            "parent edge written twice for {child}"
        );
        self.edges.insert(child, parent);
    }

    #[must_use]
    pub fn parent_of(&self, child: EnvId) -> Option<EnvId> {
        self.edges.get(&child).copied()
    }

    /// `[start, parent(start), parent(parent(start)), ..., 0]`.
    #[must_use]
    pub fn chain(&self, start: EnvId) -> Vec<EnvId> {
        let mut out = vec![start];
        let mut current = start;
        while current != GLOBAL_ENV_ID {
            let parent = self
                .parent_of(current)
                .expect("parent chain must terminate at the global env");
            out.push(parent);
            current = parent;
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (EnvId, EnvId)> + '_ {
        self.edges.iter().map(|(&c, &p)| (c, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_terminates_at_global() {
        let mut p = ParentChain::new();
        let a = EnvId::new(1);
        let b = EnvId::new(2);
        p.add_edge(a, GLOBAL_ENV_ID);
        p.add_edge(b, a);
        assert_eq!(p.chain(b), vec![b, a, GLOBAL_ENV_ID]);
    }
}
