//! Interned identifiers for variable and function names.
//!
//! Mirrors the newtype-index idiom used throughout this codebase's environment
//! and instruction ids: a small `Copy` integer stands in for a `String`, and a
//! single [`Interner`] owns the only `String` allocations.

use ahash::AHashMap;
use std::fmt;

/// An interned name. Cheap to copy and compare; look up the text via
/// [`Interner::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Name(u32);

impl Name {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

/// Owns the canonical string for every [`Name`] handed out.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: Vec<String>,
    lookup: AHashMap<String, Name>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning the existing [`Name`] if already known.
    pub fn intern(&mut self, text: &str) -> Name {
        if let Some(existing) = self.lookup.get(text) {
            return *existing;
        }
        let id = Name(self.strings.len().try_into().expect("interner overflow"));
        self.strings.push(text.to_owned());
        self.lookup.insert(text.to_owned(), id);
        id
    }

    #[must_use]
    pub fn resolve(&self, name: Name) -> &str {
        &self.strings[name.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = interner.intern("x");
        assert_eq!(a, b);
        assert_eq!(interner.resolve(a), "x");
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = interner.intern("y");
        assert_ne!(a, b);
    }
}
