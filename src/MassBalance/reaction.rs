//! Reaction records, the categorizer and the per-analysis reaction network.
//!
//! The extraction layer (out of this crate) hands over `ReactionRecord`s with
//! species given by name. `ReactionNetwork::from_records` validates them,
//! interns every species into a `SpeciesRegistry` and produces `Reaction`s
//! whose terms reference species by `SpeciesId`.
use crate::MassBalance::errors::MassBalanceError;
use crate::MassBalance::species::{SpeciesId, SpeciesRegistry, SpeciesStoichiometry};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Category of a reaction by the number of distinct reactants and products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionCategory {
    /// empty reactant or product side; never implies a mass comparison
    Boundary,
    UniUni,
    UniMulti,
    MultiUni,
    MultiMulti,
}

impl ReactionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionCategory::Boundary => "boundary",
            ReactionCategory::UniUni => "1-1",
            ReactionCategory::UniMulti => "1-n",
            ReactionCategory::MultiUni => "n-1",
            ReactionCategory::MultiMulti => "n-n",
        }
    }
    /// categories handled directly by the mass-equality graph
    pub fn is_simple(&self) -> bool {
        matches!(
            self,
            ReactionCategory::UniUni | ReactionCategory::UniMulti | ReactionCategory::MultiUni
        )
    }
}

impl fmt::Display for ReactionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pure and total: maps reactant/product counts to a category.
pub fn categorize(num_reactants: usize, num_products: usize) -> ReactionCategory {
    match (num_reactants, num_products) {
        (0, _) | (_, 0) => ReactionCategory::Boundary,
        (1, 1) => ReactionCategory::UniUni,
        (1, _) => ReactionCategory::UniMulti,
        (_, 1) => ReactionCategory::MultiUni,
        _ => ReactionCategory::MultiMulti,
    }
}

fn default_stoichiometry() -> f64 {
    1.0
}

/// species name with its stoichiometric coefficient, as delivered by the extraction layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoichiometryRecord {
    pub species: String,
    #[serde(default = "default_stoichiometry")]
    pub stoichiometry: f64,
}

impl StoichiometryRecord {
    pub fn new(species: &str, stoichiometry: f64) -> Self {
        Self {
            species: species.to_string(),
            stoichiometry,
        }
    }
}

/// raw reaction as delivered by the extraction layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub label: String,
    #[serde(default)]
    pub reactants: Vec<StoichiometryRecord>,
    #[serde(default)]
    pub products: Vec<StoichiometryRecord>,
}

impl ReactionRecord {
    /// shortcut for building records in code: `ReactionRecord::new("R1", &[("A", 2.0)], &[("B", 1.0)])`
    pub fn new(label: &str, reactants: &[(&str, f64)], products: &[(&str, f64)]) -> Self {
        let to_records = |terms: &[(&str, f64)]| {
            terms
                .iter()
                .map(|(species, stoichiometry)| StoichiometryRecord::new(species, *stoichiometry))
                .collect()
        };
        Self {
            label: label.to_string(),
            reactants: to_records(reactants),
            products: to_records(products),
        }
    }
}

/// a validated reaction of the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reaction {
    pub label: String,
    pub reactants: Vec<SpeciesStoichiometry>,
    pub products: Vec<SpeciesStoichiometry>,
    pub category: ReactionCategory,
}

impl Reaction {
    pub fn new(
        label: &str,
        reactants: Vec<SpeciesStoichiometry>,
        products: Vec<SpeciesStoichiometry>,
    ) -> Self {
        let category = categorize(reactants.len(), products.len());
        Self {
            label: label.to_string(),
            reactants,
            products,
            category,
        }
    }
    pub fn is_boundary(&self) -> bool {
        self.category == ReactionCategory::Boundary
    }
    /// human readable equation such as "2 A + B -> C"
    pub fn equation(&self, registry: &SpeciesRegistry) -> String {
        let side = |terms: &[SpeciesStoichiometry]| {
            terms
                .iter()
                .map(|term| {
                    let name = registry.name(term.species);
                    if (term.stoichiometry - 1.0).abs() < f64::EPSILON {
                        name
                    } else {
                        format!("{} {}", term.stoichiometry, name)
                    }
                })
                .collect::<Vec<_>>()
                .join(" + ")
        };
        format!("{} -> {}", side(&self.reactants), side(&self.products))
    }
}

/// Per-analysis context: the species arena plus the validated reactions in input order.
#[derive(Debug, Clone, Default)]
pub struct ReactionNetwork {
    pub species: SpeciesRegistry,
    pub reactions: Vec<Reaction>,
}

impl ReactionNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// validates the records and builds the network; the first malformed record aborts
    pub fn from_records(records: &[ReactionRecord]) -> Result<Self, MassBalanceError> {
        let mut network = ReactionNetwork::new();
        for record in records {
            network.add_record(record)?;
        }
        debug!(
            "reaction network built: {} reactions, {} species",
            network.reactions.len(),
            network.species.len()
        );
        Ok(network)
    }

    /// validates one record and appends it
    pub fn add_record(&mut self, record: &ReactionRecord) -> Result<(), MassBalanceError> {
        let label = record.label.trim();
        if label.is_empty() {
            return Err(MassBalanceError::EmptyLabel);
        }
        if self.reactions.iter().any(|r| r.label == label) {
            return Err(MassBalanceError::DuplicateLabel(label.to_string()));
        }
        if record.reactants.is_empty() && record.products.is_empty() {
            return Err(MassBalanceError::EmptyReaction(label.to_string()));
        }
        let reactants = self.collect_side(label, &record.reactants)?;
        let products = self.collect_side(label, &record.products)?;
        self.reactions.push(Reaction::new(label, reactants, products));
        Ok(())
    }

    // repeated species on one side are folded into one term
    fn collect_side(
        &mut self,
        label: &str,
        terms: &[StoichiometryRecord],
    ) -> Result<Vec<SpeciesStoichiometry>, MassBalanceError> {
        let mut side: Vec<SpeciesStoichiometry> = Vec::with_capacity(terms.len());
        for term in terms {
            let name = term.species.trim();
            if name.is_empty() {
                return Err(MassBalanceError::EmptySpeciesName(label.to_string()));
            }
            if !term.stoichiometry.is_finite() || term.stoichiometry <= 0.0 {
                return Err(MassBalanceError::InvalidStoichiometry {
                    reaction: label.to_string(),
                    species: name.to_string(),
                    value: term.stoichiometry,
                });
            }
            let id = self.species.intern(name);
            if let Some(existing) = side.iter_mut().find(|s| s.species == id) {
                warn!(
                    "reaction {}: species {} listed twice on one side, stoichiometries summed",
                    label, name
                );
                existing.stoichiometry += term.stoichiometry;
            } else {
                side.push(SpeciesStoichiometry::new(id, term.stoichiometry));
            }
        }
        Ok(side)
    }

    /// reactions of one category, in input order
    pub fn reactions_of(&self, category: ReactionCategory) -> Vec<&Reaction> {
        self.reactions
            .iter()
            .filter(|r| r.category == category)
            .collect()
    }
    /// species that take part in at least one non-boundary reaction
    pub fn active_species(&self) -> HashSet<SpeciesId> {
        self.reactions
            .iter()
            .filter(|r| !r.is_boundary())
            .flat_map(|r| r.reactants.iter().chain(r.products.iter()))
            .map(|term| term.species)
            .collect()
    }
}
