use std::collections::{BTreeMap, BTreeSet};

use oox_core::{Identifier, Reference};

// ALIASES
// ================================================================================================

/// One possible concrete identity of a symbolic reference. `Null` orders
/// before every reference, so it is always the first branch explored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Alias {
    Null,
    Ref(Reference),
}

// ALIAS MAP
// ================================================================================================

/// Mapping from symbolic-reference name to its set of possible concrete
/// identities. Populated lazily during concretization; refined to a
/// singleton on each concretization branch.
#[derive(Clone, Debug, Default)]
pub struct AliasMap {
    map: BTreeMap<Identifier, BTreeSet<Alias>>,
}

impl AliasMap {
    pub fn contains(&self, name: &Identifier) -> bool {
        self.map.contains_key(name)
    }

    pub fn aliases_of(&self, name: &Identifier) -> Option<&BTreeSet<Alias>> {
        self.map.get(name)
    }

    /// The unique identity of `name`, if its alias set is a singleton.
    pub fn resolved(&self, name: &Identifier) -> Option<Alias> {
        let set = self.map.get(name)?;
        if set.len() == 1 { set.iter().next().copied() } else { None }
    }

    pub fn insert(&mut self, name: Identifier, aliases: BTreeSet<Alias>) {
        self.map.insert(name, aliases);
    }

    /// Pins `name` to a single identity.
    pub fn refine(&mut self, name: Identifier, alias: Alias) {
        self.map.insert(name, BTreeSet::from([alias]));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &BTreeSet<Alias>)> {
        self.map.iter()
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use oox_core::ident;

    use super::*;

    #[test]
    fn refinement_resolves_to_singleton() {
        let mut aliases = AliasMap::default();
        let r = Reference::new(7);
        aliases.insert(ident("x"), BTreeSet::from([Alias::Null, Alias::Ref(r)]));
        assert_eq!(aliases.resolved(&ident("x")), None);

        aliases.refine(ident("x"), Alias::Ref(r));
        assert_eq!(aliases.resolved(&ident("x")), Some(Alias::Ref(r)));
    }

    #[test]
    fn null_is_the_first_alias_explored() {
        let set = BTreeSet::from([Alias::Ref(Reference::new(0)), Alias::Null]);
        assert_eq!(set.iter().next(), Some(&Alias::Null));
    }
}
