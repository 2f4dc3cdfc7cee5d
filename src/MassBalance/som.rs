//! SOM: Set Of Molecules assumed to have identical mass.
//!
//! Node identity in the mass-equality graph is the opaque `SomId`, never the
//! rendered identifier string, which exists for display only.
use crate::MassBalance::errors::MassBalanceError;
use crate::MassBalance::species::{SpeciesId, SpeciesRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// opaque handle of a SOM in the arena of one mass-equality graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SomId(pub usize);

impl fmt::Display for SomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "som#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Som {
    pub id: SomId,
    pub members: BTreeSet<SpeciesId>,
    /// labels of the uni-uni reactions whose merges formed this set
    pub witness_reactions: BTreeSet<String>,
}

impl Som {
    pub fn new(id: SomId, species: SpeciesId) -> Self {
        Self {
            id,
            members: BTreeSet::from([species]),
            witness_reactions: BTreeSet::new(),
        }
    }

    /// New SOM holding the union of members and witnesses of `a` and `b`.
    /// `a` and `b` are logically dead afterwards; graph surgery is up to the caller.
    pub fn merge(a: &Som, b: &Som, id: SomId) -> Result<Som, MassBalanceError> {
        if a.id == b.id {
            return Err(MassBalanceError::SelfMerge(a.id.to_string()));
        }
        let members = a.members.union(&b.members).copied().collect();
        let witness_reactions = a
            .witness_reactions
            .union(&b.witness_reactions)
            .cloned()
            .collect();
        Ok(Som {
            id,
            members,
            witness_reactions,
        })
    }

    pub fn contains(&self, species: SpeciesId) -> bool {
        self.members.contains(&species)
    }
    pub fn len(&self) -> usize {
        self.members.len()
    }
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
    /// member names sorted alphabetically
    pub fn member_names(&self, registry: &SpeciesRegistry) -> Vec<String> {
        let mut names: Vec<String> = self.members.iter().map(|s| registry.name(*s)).collect();
        names.sort();
        names
    }
    /// canonical, order-independent rendering like "{A=B=C}"
    pub fn identifier(&self, registry: &SpeciesRegistry) -> String {
        format!("{{{}}}", self.member_names(registry).join("="))
    }
    pub fn record(&self, registry: &SpeciesRegistry) -> SomRecord {
        SomRecord {
            id: self.id,
            members: self.member_names(registry),
            witness_reactions: self.witness_reactions.iter().cloned().collect(),
        }
    }
}

/// display snapshot of a SOM, detached from the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SomRecord {
    pub id: SomId,
    pub members: Vec<String>,
    pub witness_reactions: Vec<String>,
}

impl SomRecord {
    pub fn identifier(&self) -> String {
        format!("{{{}}}", self.members.join("="))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SpeciesRegistry {
        let mut registry = SpeciesRegistry::new();
        for name in ["C", "A", "B"] {
            registry.intern(name);
        }
        registry
    }

    #[test]
    fn test_merge_unions_members_and_witnesses() {
        let registry = registry();
        let mut a = Som::new(SomId(0), SpeciesId(0));
        a.witness_reactions.insert("R1".to_string());
        let mut b = Som::new(SomId(1), SpeciesId(1));
        b.witness_reactions.insert("R2".to_string());
        let merged = Som::merge(&a, &b, SomId(2)).unwrap();
        assert_eq!(merged.id, SomId(2));
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(SpeciesId(0)) && merged.contains(SpeciesId(1)));
        assert_eq!(merged.witness_reactions.len(), 2);
        assert_eq!(merged.identifier(&registry), "{A=C}");
    }

    #[test]
    fn test_identifier_is_order_independent() {
        let registry = registry();
        let a = Som::new(SomId(0), SpeciesId(2));
        let b = Som::new(SomId(1), SpeciesId(1));
        let ab = Som::merge(&a, &b, SomId(3)).unwrap();
        let ba = Som::merge(&b, &a, SomId(4)).unwrap();
        assert_eq!(ab.identifier(&registry), ba.identifier(&registry));
        assert_eq!(ab.members, ba.members);
        assert_ne!(ab.id, ba.id);
        assert_eq!(ab.record(&registry).identifier(), "{A=B}");
    }

    #[test]
    fn test_merge_with_itself_fails() {
        let a = Som::new(SomId(0), SpeciesId(0));
        assert!(matches!(
            Som::merge(&a, &a, SomId(1)),
            Err(MassBalanceError::SelfMerge(_))
        ));
    }
}
