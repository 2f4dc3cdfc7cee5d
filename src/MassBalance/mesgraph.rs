//! Mass-equality graph (MESGraph).
//!
//! Nodes are SOMs (sets of species assumed to have the same mass), a directed
//! arc `source -> destination` carries the labels of every reaction implying
//! mass(source) < mass(destination).
//! 1) uni-uni reactions merge the SOMs of their reactant and product
//! 2) uni-multi / multi-uni reactions add arcs from every lighter species to the heavier one
//! 3) an arc required between two species of one SOM is a Type I error
//! 4) a cycle of arcs is a Type II error
//! 5) equalities/inequalities derived from compound reactions by the
//!    stoichiometry reducer re-enter through `process_equal_som_reaction` and
//!    `process_unequal_som_reaction`
//!
//! SOMs live in an arena indexed by `SomId`. A merge retires both SOMs and
//! leaves forwarding entries, so any `SomId` kept by pending work can be
//! brought up to date with `resolve`.
use crate::MassBalance::cycles::{shortest_path, simple_cycles};
use crate::MassBalance::errors::MassBalanceError;
use crate::MassBalance::inconsistencies::{
    CancelingError, EchelonError, ReductionFault, TypeOneError, TypeThreeError, TypeTwoError,
};
use crate::MassBalance::reaction::{Reaction, ReactionCategory};
use crate::MassBalance::som::{Som, SomId, SomRecord};
use crate::MassBalance::som_reaction::{MassAssertion, SomReaction};
use crate::MassBalance::species::{SpeciesId, SpeciesRegistry};
use log::{debug, info, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// display snapshot of an arc
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcRecord {
    pub source: SomRecord,
    pub destination: SomRecord,
    pub reactions: Vec<String>,
}

/// outcome of applying a derived equality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqualityOutcome {
    /// both sides already in one SOM
    AlreadyEqual,
    Merged(SomId),
    /// blocked by an inequality arc: recorded as Type III
    Contradicted,
}

#[derive(Debug, Clone)]
pub struct MassEqualityGraph<'n> {
    registry: &'n SpeciesRegistry,
    tolerance: f64,
    soms: Vec<Som>,
    live: BTreeSet<SomId>,
    forward: HashMap<SomId, SomId>,
    species_som: Vec<SomId>,
    arcs: BTreeMap<(SomId, SomId), Vec<String>>,
    type_one_index: HashMap<(String, String), usize>,
    reported_cycles: HashSet<Vec<SomId>>,
    pub type_one_errors: Vec<TypeOneError>,
    pub type_two_errors: Vec<TypeTwoError>,
    pub type_three_errors: Vec<TypeThreeError>,
    pub canceling_errors: Vec<CancelingError>,
    pub echelon_errors: Vec<EchelonError>,
    pub faults: Vec<ReductionFault>,
}

impl<'n> MassEqualityGraph<'n> {
    /// one SOM per species of the registry
    pub fn new(registry: &'n SpeciesRegistry, tolerance: f64) -> Self {
        let soms: Vec<Som> = registry
            .ids()
            .enumerate()
            .map(|(i, species)| Som::new(SomId(i), species))
            .collect();
        let live = soms.iter().map(|s| s.id).collect();
        let species_som = soms.iter().map(|s| s.id).collect();
        Self {
            registry,
            tolerance,
            soms,
            live,
            forward: HashMap::new(),
            species_som,
            arcs: BTreeMap::new(),
            type_one_index: HashMap::new(),
            reported_cycles: HashSet::new(),
            type_one_errors: Vec::new(),
            type_two_errors: Vec::new(),
            type_three_errors: Vec::new(),
            canceling_errors: Vec::new(),
            echelon_errors: Vec::new(),
            faults: Vec::new(),
        }
    }

    ////////////////////////////////////NODES/////////////////////////////////////////////
    pub fn registry(&self) -> &'n SpeciesRegistry {
        self.registry
    }
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
    pub fn node_count(&self) -> usize {
        self.live.len()
    }
    /// live SOMs in id order
    pub fn nodes(&self) -> Vec<SomId> {
        self.live.iter().copied().collect()
    }
    pub fn is_live(&self, id: SomId) -> bool {
        self.live.contains(&id)
    }
    /// the SOM with this id, live or retired
    pub fn som(&self, id: SomId) -> Option<&Som> {
        self.soms.get(id.0)
    }
    /// the live SOM that absorbed `id` (itself when still live)
    pub fn resolve(&self, id: SomId) -> SomId {
        let mut current = id;
        while let Some(next) = self.forward.get(&current) {
            current = *next;
        }
        current
    }
    pub fn som_of(&self, species: SpeciesId) -> Result<SomId, MassBalanceError> {
        self.species_som
            .get(species.0)
            .copied()
            .ok_or_else(|| MassBalanceError::UnknownSpecies(species.to_string()))
    }
    pub fn som_of_name(&self, name: &str) -> Result<SomId, MassBalanceError> {
        let species = self
            .registry
            .lookup(name)
            .ok_or_else(|| MassBalanceError::UnknownSpecies(name.to_string()))?;
        self.som_of(species)
    }
    /// true when both species currently belong to one SOM
    pub fn same_som(&self, a: SpeciesId, b: SpeciesId) -> Result<bool, MassBalanceError> {
        Ok(self.som_of(a)? == self.som_of(b)?)
    }
    pub fn identifier(&self, id: SomId) -> String {
        match self.som(id) {
            Some(som) => som.identifier(self.registry),
            None => id.to_string(),
        }
    }
    pub fn som_record(&self, id: SomId) -> SomRecord {
        match self.som(id) {
            Some(som) => som.record(self.registry),
            None => SomRecord {
                id,
                members: Vec::new(),
                witness_reactions: Vec::new(),
            },
        }
    }
    /// snapshots of every live SOM
    pub fn som_records(&self) -> Vec<SomRecord> {
        self.live.iter().map(|id| self.som_record(*id)).collect()
    }

    /// Merges two SOMs into a new one and re-points every arc touching them.
    /// An arc between the two becomes a self-loop, reported later by `check_self_loop_errors`.
    pub fn merge_nodes(
        &mut self,
        a: SomId,
        b: SomId,
        witness: Option<&str>,
    ) -> Result<SomId, MassBalanceError> {
        let a = self.resolve(a);
        let b = self.resolve(b);
        if !self.is_live(a) {
            return Err(MassBalanceError::DeadSom(a.0));
        }
        if !self.is_live(b) {
            return Err(MassBalanceError::DeadSom(b.0));
        }
        let new_id = SomId(self.soms.len());
        let mut merged = Som::merge(&self.soms[a.0], &self.soms[b.0], new_id)?;
        if let Some(label) = witness {
            merged.witness_reactions.insert(label.to_string());
        }
        for species in &merged.members {
            self.species_som[species.0] = new_id;
        }
        debug!(
            "merge {} + {} -> {}",
            self.identifier(a),
            self.identifier(b),
            merged.identifier(self.registry)
        );
        self.soms.push(merged);
        self.live.remove(&a);
        self.live.remove(&b);
        self.live.insert(new_id);
        self.forward.insert(a, new_id);
        self.forward.insert(b, new_id);

        let touched: Vec<(SomId, SomId)> = self
            .arcs
            .keys()
            .filter(|(s, d)| *s == a || *s == b || *d == a || *d == b)
            .copied()
            .collect();
        for key in touched {
            if let Some(labels) = self.arcs.remove(&key) {
                let rename = |id: SomId| if id == a || id == b { new_id } else { id };
                let entry = self
                    .arcs
                    .entry((rename(key.0), rename(key.1)))
                    .or_default();
                for label in labels {
                    if !entry.contains(&label) {
                        entry.push(label);
                    }
                }
            }
        }
        Ok(new_id)
    }

    ////////////////////////////////////ARCS//////////////////////////////////////////////
    pub fn has_arc(&self, source: SomId, destination: SomId) -> bool {
        self.arcs
            .contains_key(&(self.resolve(source), self.resolve(destination)))
    }
    pub fn arc_labels(&self, source: SomId, destination: SomId) -> Option<&[String]> {
        self.arcs
            .get(&(self.resolve(source), self.resolve(destination)))
            .map(|labels| labels.as_slice())
    }
    pub fn arc_count(&self) -> usize {
        self.arcs.len()
    }
    pub fn arcs(&self) -> impl Iterator<Item = (&(SomId, SomId), &Vec<String>)> {
        self.arcs.iter()
    }
    pub fn arc_records(&self) -> Vec<ArcRecord> {
        self.arcs
            .iter()
            .map(|((s, d), labels)| ArcRecord {
                source: self.som_record(*s),
                destination: self.som_record(*d),
                reactions: labels.clone(),
            })
            .collect()
    }
    /// adds the arc or extends its label list (labels are not repeated)
    pub fn add_arc(&mut self, source: SomId, destination: SomId, label: &str) {
        let key = (self.resolve(source), self.resolve(destination));
        let labels = self.arcs.entry(key).or_default();
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
        debug!(
            "arc {} < {} by {}",
            self.identifier(key.0),
            self.identifier(key.1),
            label
        );
    }

    /// Live SOMs as a digraph with the SOM ids as node weights, in id order;
    /// self-loops are left out.
    fn inequality_digraph(&self) -> (DiGraph<SomId, ()>, HashMap<SomId, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.live.len(), self.arcs.len());
        let position: HashMap<SomId, NodeIndex> = self
            .live
            .iter()
            .map(|id| (*id, graph.add_node(*id)))
            .collect();
        for (source, destination) in self.arcs.keys() {
            if source == destination {
                continue;
            }
            if let (Some(&s), Some(&d)) = (position.get(source), position.get(destination)) {
                graph.add_edge(s, d, ());
            }
        }
        (graph, position)
    }

    /// Shortest inequality path between two SOMs in either direction, as
    /// (lighter, heavier, labels) steps. Empty when they are not connected.
    pub fn inequality_path(&self, a: SomId, b: SomId) -> Vec<(SomRecord, SomRecord, Vec<String>)> {
        let a = self.resolve(a);
        let b = self.resolve(b);
        let (graph, position) = self.inequality_digraph();
        let (Some(&pa), Some(&pb)) = (position.get(&a), position.get(&b)) else {
            return Vec::new();
        };
        let path = shortest_path(&graph, pa, pb)
            .or_else(|| shortest_path(&graph, pb, pa))
            .unwrap_or_default();
        path.windows(2)
            .map(|step| {
                let (s, d) = (graph[step[0]], graph[step[1]]);
                let labels = self.arcs.get(&(s, d)).cloned().unwrap_or_default();
                (self.som_record(s), self.som_record(d), labels)
            })
            .collect()
    }

    ////////////////////////////////SIMPLE REACTIONS///////////////////////////////////////
    /// Uni-uni reaction: reactant and product have the same mass, stoichiometry is ignored.
    /// Returns true when two SOMs were merged.
    pub fn process_uni_uni(&mut self, reaction: &Reaction) -> Result<bool, MassBalanceError> {
        if reaction.category != ReactionCategory::UniUni {
            warn!(
                "process_uni_uni called with {} reaction {}",
                reaction.category, reaction.label
            );
            return Ok(false);
        }
        let reactant_som = self.som_of(reaction.reactants[0].species)?;
        let product_som = self.som_of(reaction.products[0].species)?;
        if reactant_som == product_som {
            debug!("{}: already in one SOM", reaction.label);
            return Ok(false);
        }
        self.merge_nodes(reactant_som, product_som, Some(&reaction.label))?;
        Ok(true)
    }

    /// Uni-multi reaction: every product is lighter than the single reactant.
    /// Returns the number of Type I errors raised by the reaction.
    pub fn process_uni_multi(&mut self, reaction: &Reaction) -> Result<usize, MassBalanceError> {
        if reaction.category != ReactionCategory::UniMulti {
            warn!(
                "process_uni_multi called with {} reaction {}",
                reaction.category, reaction.label
            );
            return Ok(0);
        }
        let destination = reaction.reactants[0].species;
        let sources: Vec<SpeciesId> = reaction.products.iter().map(|p| p.species).collect();
        self.process_inequality(&reaction.label, &sources, destination)
    }

    /// Multi-uni reaction: every reactant is lighter than the single product.
    pub fn process_multi_uni(&mut self, reaction: &Reaction) -> Result<usize, MassBalanceError> {
        if reaction.category != ReactionCategory::MultiUni {
            warn!(
                "process_multi_uni called with {} reaction {}",
                reaction.category, reaction.label
            );
            return Ok(0);
        }
        let destination = reaction.products[0].species;
        let sources: Vec<SpeciesId> = reaction.reactants.iter().map(|r| r.species).collect();
        self.process_inequality(&reaction.label, &sources, destination)
    }

    fn process_inequality(
        &mut self,
        label: &str,
        sources: &[SpeciesId],
        destination: SpeciesId,
    ) -> Result<usize, MassBalanceError> {
        let mut errors = 0;
        for &source in sources {
            if self.check_type_one_error(source, destination, label)? {
                errors += 1;
                continue;
            }
            let source_som = self.som_of(source)?;
            let destination_som = self.som_of(destination)?;
            self.add_arc(source_som, destination_som, label);
        }
        Ok(errors)
    }

    ////////////////////////////////ERROR CHECKS///////////////////////////////////////////
    /// If both species already share a SOM, the inequality required by `label`
    /// contradicts an established equality: record (or extend) a Type I error.
    pub fn check_type_one_error(
        &mut self,
        source: SpeciesId,
        destination: SpeciesId,
        label: &str,
    ) -> Result<bool, MassBalanceError> {
        let som = self.som_of(source)?;
        if som != self.som_of(destination)? {
            return Ok(false);
        }
        let node1 = self.registry.name(source);
        let node2 = self.registry.name(destination);
        let members = self.som_record(som).members;
        self.add_type_one_error(node1, node2, members, label);
        Ok(true)
    }

    /// one record per unordered species pair, whatever the direction of the inequality
    fn add_type_one_error(&mut self, node1: String, node2: String, som: Vec<String>, label: &str) {
        let key = if node1 <= node2 {
            (node1.clone(), node2.clone())
        } else {
            (node2.clone(), node1.clone())
        };
        match self.type_one_index.get(&key) {
            Some(&i) => {
                let error = &mut self.type_one_errors[i];
                if !error.reactions.iter().any(|r| r == label) {
                    error.reactions.push(label.to_string());
                }
                error.som = som;
            }
            None => {
                info!("Type I error: {} and {} by {}", node1, node2, label);
                self.type_one_index.insert(key, self.type_one_errors.len());
                self.type_one_errors.push(TypeOneError {
                    node1,
                    node2,
                    som,
                    reactions: vec![label.to_string()],
                });
            }
        }
    }

    /// Self-loop arcs left by merges are equalities contradicted by inequalities.
    /// Returns the number of self-loops found.
    pub fn check_self_loop_errors(&mut self) -> usize {
        let loops: Vec<(SomId, Vec<String>)> = self
            .arcs
            .iter()
            .filter(|((s, d), _)| s == d)
            .map(|((s, _), labels)| (*s, labels.clone()))
            .collect();
        for (som, labels) in &loops {
            let record = self.som_record(*som);
            let name = record.identifier();
            for label in labels {
                self.add_type_one_error(name.clone(), name.clone(), record.members.clone(), label);
            }
        }
        loops.len()
    }

    /// Records every elementary cycle of arcs as a Type II error; cycles already
    /// reported are skipped. Does not change the graph. Returns the number of new cycles.
    pub fn check_type_two_error(&mut self) -> usize {
        let (graph, _) = self.inequality_digraph();
        let mut found = 0;
        for cycle in simple_cycles(&graph) {
            let ids: Vec<SomId> = cycle.iter().map(|&i| graph[i]).collect();
            if !self.reported_cycles.insert(ids.clone()) {
                continue;
            }
            let arcs: Vec<Vec<String>> = (0..ids.len())
                .map(|i| {
                    let next = ids[(i + 1) % ids.len()];
                    self.arcs.get(&(ids[i], next)).cloned().unwrap_or_default()
                })
                .collect();
            let error = TypeTwoError {
                cycle: ids.iter().map(|id| self.som_record(*id)).collect(),
                arcs,
            };
            info!("Type II error: {}", error);
            self.type_two_errors.push(error);
            found += 1;
        }
        found
    }

    ////////////////////////////////REDUCED REACTIONS//////////////////////////////////////
    /// Applies an equality derived from compound reactions. If an inequality arc
    /// already links the two SOMs, the equality is a Type III error; otherwise they merge.
    pub fn process_equal_som_reaction(
        &mut self,
        reaction: &SomReaction,
        origins: &[String],
    ) -> Result<EqualityOutcome, MassBalanceError> {
        let MassAssertion::Equal(a, b) = reaction.assertion(self.tolerance) else {
            return Err(MassBalanceError::NotAnEquality(reaction.label.clone()));
        };
        let a = self.resolve(a);
        let b = self.resolve(b);
        if a == b {
            return Ok(EqualityOutcome::AlreadyEqual);
        }
        if self.has_arc(a, b) || self.has_arc(b, a) {
            let error = TypeThreeError {
                som_reaction: reaction.record(|id| self.som_record(id)),
                origins: origins.to_vec(),
                path: self.inequality_path(a, b),
            };
            info!("Type III error: {}", error);
            self.type_three_errors.push(error);
            return Ok(EqualityOutcome::Contradicted);
        }
        let merged = self.merge_nodes(a, b, None)?;
        Ok(EqualityOutcome::Merged(merged))
    }

    /// Applies the inequalities of a reduced 1-n / n-1 (or unequal 1-1) reaction.
    /// A source resolving to the destination SOM aborts the whole reaction with
    /// `SelfReferentialArc` before any arc is added. Returns the number of arcs touched.
    pub fn process_unequal_som_reaction(
        &mut self,
        reaction: &SomReaction,
    ) -> Result<usize, MassBalanceError> {
        let MassAssertion::Lighter {
            sources,
            destination,
        } = reaction.assertion(self.tolerance)
        else {
            return Ok(0);
        };
        let destination = self.resolve(destination);
        let sources: Vec<SomId> = sources.into_iter().map(|s| self.resolve(s)).collect();
        if sources.contains(&destination) {
            return Err(MassBalanceError::SelfReferentialArc {
                reaction: reaction.label.clone(),
                som: self.identifier(destination),
            });
        }
        for source in &sources {
            self.add_arc(*source, destination, &reaction.label);
        }
        Ok(sources.len())
    }

    ////////////////////////////////SUMMARY////////////////////////////////////////////////
    pub fn has_type_one_or_two_errors(&self) -> bool {
        !self.type_one_errors.is_empty() || !self.type_two_errors.is_empty()
    }
    pub fn error_count(&self) -> usize {
        self.type_one_errors.len()
            + self.type_two_errors.len()
            + self.type_three_errors.len()
            + self.canceling_errors.len()
            + self.echelon_errors.len()
    }
}
