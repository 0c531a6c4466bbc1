//! Environment store: `EnvId -> (Name -> Value)` maps, allocated monotonically
//! and never reclaimed (environments are retained for debugger inspection
//! even after the frame that created them returns).
//!
//! Grounded on `NamespaceId`/`Namespaces` in the teacher's `namespace.rs`, minus
//! the reuse-id freelist — this IR's invariant is that ids are never reused.

use crate::intern::Name;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// The global environment, always present, always id `0`.
pub const GLOBAL_ENV_ID: EnvId = EnvId(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct EnvId(u32);

impl EnvId {
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EnvId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One environment's bindings. An `IndexMap` so snapshot iteration order is
/// stable across runs, matching what a debugger UI expects to diff cleanly.
pub type Bindings = IndexMap<Name, Value>;

#[derive(Debug, Default, Clone)]
pub struct EnvStore {
    envs: Vec<Bindings>,
}

impl EnvStore {
    #[must_use]
    pub fn new() -> Self {
        let mut envs = Vec::new();
        envs.push(Bindings::new());
        Self { envs }
    }

    /// Allocates a fresh environment id, `max(existing) + 1`.
    pub fn new_env(&mut self) -> EnvId {
        let id = EnvId::new(self.envs.len().try_into().expect("env store overflow"));
        self.envs.push(Bindings::new());
        id
    }

    pub fn bind(&mut self, id: EnvId, name: Name, value: Value) {
        self.envs[id.index() as usize].insert(name, value);
    }

    #[must_use]
    pub fn get(&self, id: EnvId, name: Name) -> Option<&Value> {
        self.envs[id.index() as usize].get(&name)
    }

    #[must_use]
    pub fn has(&self, id: EnvId, name: Name) -> bool {
        self.envs[id.index() as usize].contains_key(&name)
    }

    #[must_use]
    pub fn bindings(&self, id: EnvId) -> &Bindings {
        &self.envs[id.index() as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.envs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EnvId, &Bindings)> {
        self.envs
            .iter()
            .enumerate()
            .map(|(i, b)| (EnvId::new(i.try_into().expect("env id overflow")), b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_env_exists_from_construction() {
        let store = EnvStore::new();
        assert_eq!(store.len(), 1);
        assert!(store.bindings(GLOBAL_ENV_ID).is_empty());
    }

    #[test]
    fn allocation_is_monotonic_and_never_reused() {
        let mut store = EnvStore::new();
        let a = store.new_env();
        let b = store.new_env();
        assert_eq!(a.index(), 1);
        assert_eq!(b.index(), 2);
        assert_ne!(a, b);
    }
}
