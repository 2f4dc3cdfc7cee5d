use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// handle of a species in the `SpeciesRegistry` of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpeciesId(pub usize);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// a named species; the name is its identity inside a model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
}

impl Species {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

/// a species together with its (positive) stoichiometric coefficient in a reaction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeciesStoichiometry {
    pub species: SpeciesId,
    pub stoichiometry: f64,
}

impl SpeciesStoichiometry {
    pub fn new(species: SpeciesId, stoichiometry: f64) -> Self {
        Self {
            species,
            stoichiometry,
        }
    }
}

/// Arena of all species met while ingesting the reactions of one model.
/// Every distinct name is interned exactly once, so the same name appearing in
/// several reactions always resolves to the same `SpeciesId`.
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    species: Vec<Species>,
    index: HashMap<String, SpeciesId>,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    /// returns the id of the species, creating it on first sight
    pub fn intern(&mut self, name: &str) -> SpeciesId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = SpeciesId(self.species.len());
        self.species.push(Species::new(name));
        self.index.insert(name.to_string(), id);
        id
    }
    pub fn lookup(&self, name: &str) -> Option<SpeciesId> {
        self.index.get(name).copied()
    }
    pub fn get(&self, id: SpeciesId) -> Option<&Species> {
        self.species.get(id.0)
    }
    /// name of the species; unknown ids render as their handle
    pub fn name(&self, id: SpeciesId) -> String {
        match self.get(id) {
            Some(species) => species.name.clone(),
            None => id.to_string(),
        }
    }
    pub fn len(&self) -> usize {
        self.species.len()
    }
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
    pub fn ids(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        (0..self.species.len()).map(SpeciesId)
    }
    pub fn iter(&self) -> impl Iterator<Item = (SpeciesId, &Species)> {
        self.species
            .iter()
            .enumerate()
            .map(|(i, species)| (SpeciesId(i), species))
    }
}
