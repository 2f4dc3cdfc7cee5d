//! The five kinds of mass-balance inconsistencies found in a model, plus the
//! record of an internal reduction fault.
//!
//! Records are append-only and detached from the graph: they hold member names
//! and reaction labels, enough to rebuild a human readable explanation.
use crate::MassBalance::som::SomRecord;
use crate::MassBalance::som_reaction::SomReactionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type I: an inequality required by a reaction between two species already known to be equal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeOneError {
    pub node1: String,
    pub node2: String,
    /// members of the SOM both species belong to
    pub som: Vec<String>,
    pub reactions: Vec<String>,
}

/// Type II: a cycle of strict mass inequalities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeTwoError {
    pub cycle: Vec<SomRecord>,
    /// labels of arc i -> i+1 (the last one closes the cycle)
    pub arcs: Vec<Vec<String>>,
}

/// Type III: an equality obtained by reducing compound reactions, blocked by an inequality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeThreeError {
    pub som_reaction: SomReactionRecord,
    /// original reactions combined into the reduced reaction
    pub origins: Vec<String>,
    /// inequality path between the two SOMs, each step with its labels
    pub path: Vec<(SomRecord, SomRecord, Vec<String>)>,
}

/// a compound reaction whose net SOM stoichiometry has a single sign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelingError {
    pub som_reaction: SomReactionRecord,
}

/// a reduced reaction with an empty side, visible only after elimination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchelonError {
    pub reaction: String,
    pub som_reaction: SomReactionRecord,
    pub origins: Vec<String>,
}

/// reduction stage a reduced reaction comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReductionStage {
    Echelon,
    ReducedEchelon,
}

impl fmt::Display for ReductionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReductionStage::Echelon => write!(f, "echelon"),
            ReductionStage::ReducedEchelon => write!(f, "rref"),
        }
    }
}

/// An internal fault while applying one reduced column (e.g. a self-referential arc).
/// Only that column is abandoned; this is not a finding about the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionFault {
    pub stage: ReductionStage,
    pub column: usize,
    pub reaction: String,
    pub message: String,
}

impl fmt::Display for TypeOneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} and {} are equal ({{{}}}) but {} require them to differ",
            self.node1,
            self.node2,
            self.som.join("="),
            self.reactions.join(", ")
        )
    }
}

impl fmt::Display for TypeTwoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nodes: Vec<String> = self.cycle.iter().map(|s| s.identifier()).collect();
        let first = nodes.first().cloned().unwrap_or_default();
        write!(f, "mass inequality cycle {} < {}", nodes.join(" < "), first)
    }
}

impl fmt::Display for TypeThreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (from {}) contradicts an existing inequality",
            self.som_reaction.equation(),
            self.origins.join(", ")
        )
    }
}

impl fmt::Display for CancelingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} only produces or only consumes mass",
            self.som_reaction.label,
            self.som_reaction.equation()
        )
    }
}

impl fmt::Display for EchelonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (from {}) has an empty side",
            self.reaction,
            self.som_reaction.equation(),
            self.origins.join(", ")
        )
    }
}

impl fmt::Display for ReductionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} column {} ({}): {}",
            self.stage, self.column, self.reaction, self.message
        )
    }
}
