//! Stoichiometry reducer for compound (n-n) reactions.
//!
//! A compound reaction says nothing directly about the masses of its species,
//! but linear combinations of several compound reactions may. The reducer
//! 1) rewrites every pending reaction over the current SOMs (`to_som_reaction`)
//! 2) builds the net-stoichiometry matrix, one row per SOM, one column per reaction
//! 3) reports columns with a single sign as canceling errors
//! 4) brings the transposed matrix to echelon form (LU with partial pivoting)
//!    and turns every nonzero row back into a SOM-reaction, traced to its
//!    original reactions through the inverse of the lower factor
//! 5) applies what the reduced reactions assert: equalities merge SOMs (or are
//!    Type III errors), 1-n / n-1 reactions add inequality arcs, one-sided
//!    reactions are echelon errors
//! 6) optionally repeats 4-5 on the reduced row-echelon form, which exposes
//!    relations the plain echelon form leaves mixed into longer rows
//!
//! Every zero row of the reduced matrix is a linear dependency between reactions;
//! it carries no mass information and is only logged.
use crate::MassBalance::errors::MassBalanceError;
use crate::MassBalance::inconsistencies::{
    CancelingError, EchelonError, ReductionFault, ReductionStage,
};
use crate::MassBalance::linalg::{echelon_decomposition, reduced_echelon};
use crate::MassBalance::mesgraph::{EqualityOutcome, MassEqualityGraph};
use crate::MassBalance::reaction::Reaction;
use crate::MassBalance::som::SomId;
use crate::MassBalance::som_reaction::{MassAssertion, SomReaction};
use crate::settings::AnalysisSettings;
use log::{debug, error, info, warn};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// what happened to the compound reactions of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReductionStatus {
    /// the model has no compound reactions
    NotRequired,
    /// Type I/II errors were found first; compound reactions were left alone
    SkippedConservative,
    /// canceling errors were found and reduction was not attempted
    SkippedCanceling,
    Completed,
    /// the matrix could not be reduced reliably
    Inconclusive(String),
}

impl ReductionStatus {
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, ReductionStatus::Inconclusive(_))
    }
}

/// Net stoichiometry of SOMs (rows, first-appearance order) in compound
/// reactions (columns, input order). Products count positive.
#[derive(Debug, Clone)]
pub struct NetStoichiometryMatrix {
    pub soms: Vec<SomId>,
    pub labels: Vec<String>,
    pub matrix: DMatrix<f64>,
}

impl NetStoichiometryMatrix {
    pub fn from_som_reactions(reactions: &[SomReaction]) -> Self {
        let mut soms: Vec<SomId> = Vec::new();
        for reaction in reactions {
            for som in reaction.soms() {
                if !soms.contains(&som) {
                    soms.push(som);
                }
            }
        }
        let mut matrix = DMatrix::zeros(soms.len(), reactions.len());
        for (j, reaction) in reactions.iter().enumerate() {
            for (som, value) in reaction.net() {
                if let Some(i) = soms.iter().position(|s| *s == som) {
                    matrix[(i, j)] += value;
                }
            }
        }
        Self {
            soms,
            labels: reactions.iter().map(|r| r.label.clone()).collect(),
            matrix,
        }
    }

    pub fn nrows(&self) -> usize {
        self.soms.len()
    }
    pub fn ncols(&self) -> usize {
        self.labels.len()
    }
    pub fn is_empty(&self) -> bool {
        self.soms.is_empty() || self.labels.is_empty()
    }

    /// column `j` read back as a SOM-reaction
    pub fn column_reaction(&self, j: usize, tolerance: f64) -> SomReaction {
        let net: Vec<(SomId, f64)> = self
            .soms
            .iter()
            .enumerate()
            .map(|(i, som)| (*som, self.matrix[(i, j)]))
            .collect();
        SomReaction::from_net(&self.labels[j], &net, tolerance)
    }

    /// the matrix without the given columns; rows that become empty are dropped too
    pub fn without_columns(&self, drop: &[usize]) -> Self {
        let keep: Vec<usize> = (0..self.ncols()).filter(|j| !drop.contains(j)).collect();
        let rows: Vec<usize> = (0..self.nrows())
            .filter(|&i| keep.iter().any(|&j| self.matrix[(i, j)] != 0.0))
            .collect();
        let matrix = DMatrix::from_fn(rows.len(), keep.len(), |i, j| self.matrix[(rows[i], keep[j])]);
        Self {
            soms: rows.iter().map(|&i| self.soms[i]).collect(),
            labels: keep.iter().map(|&j| self.labels[j].clone()).collect(),
            matrix,
        }
    }
}

/// a nonzero row of a reduced matrix, read as a SOM-reaction
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedReaction {
    pub stage: ReductionStage,
    pub column: usize,
    pub reaction: SomReaction,
    /// labels of the compound reactions combined into this one
    pub origins: Vec<String>,
}

/// a reduced reaction about which nothing could be concluded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedReaction {
    pub label: String,
    pub equation: String,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReductionReport {
    pub status: ReductionStatus,
    pub rank: usize,
    /// reactions combining to a zero row, one entry per dependency
    pub dependencies: Vec<Vec<String>>,
    pub unresolved: Vec<UnresolvedReaction>,
}

impl ReductionReport {
    fn with_status(status: ReductionStatus) -> Self {
        Self {
            status,
            rank: 0,
            dependencies: Vec::new(),
            unresolved: Vec::new(),
        }
    }
}

/// findings already recorded during one reduction, used to report each once
#[derive(Debug, Default)]
struct SeenFindings {
    one_sided: Vec<SomReaction>,
    contradicted: HashSet<(SomId, SomId)>,
}

#[derive(Debug, Clone)]
pub struct StoichiometryReducer {
    pub tolerance: f64,
    pub use_rref: bool,
    pub reduce_after_canceling: bool,
}

impl Default for StoichiometryReducer {
    fn default() -> Self {
        Self::from_settings(&AnalysisSettings::default())
    }
}

impl StoichiometryReducer {
    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self {
            tolerance: settings.tolerance,
            use_rref: settings.use_rref,
            reduce_after_canceling: settings.reduce_after_canceling,
        }
    }

    /// A species-level reaction rewritten over the current SOMs of the graph.
    pub fn to_som_reaction(
        &self,
        graph: &MassEqualityGraph,
        reaction: &Reaction,
    ) -> Result<SomReaction, MassBalanceError> {
        let mut net = Vec::with_capacity(reaction.reactants.len() + reaction.products.len());
        for term in &reaction.reactants {
            net.push((graph.som_of(term.species)?, -term.stoichiometry));
        }
        for term in &reaction.products {
            net.push((graph.som_of(term.species)?, term.stoichiometry));
        }
        Ok(SomReaction::from_net(&reaction.label, &net, self.tolerance))
    }

    /// Records a canceling error for every column whose nonzero entries share
    /// one sign. Returns the indices of those columns.
    pub fn find_canceling(
        &self,
        graph: &mut MassEqualityGraph,
        matrix: &NetStoichiometryMatrix,
    ) -> Vec<usize> {
        let mut canceling = Vec::new();
        for j in 0..matrix.ncols() {
            let reaction = matrix.column_reaction(j, self.tolerance);
            if reaction.is_null() {
                debug!("{} cancels out completely", reaction.label);
                continue;
            }
            if reaction.is_one_sided() {
                let error = CancelingError {
                    som_reaction: reaction.record(|id| graph.som_record(id)),
                };
                info!("Canceling error: {}", error);
                graph.canceling_errors.push(error);
                canceling.push(j);
            }
        }
        canceling
    }

    /// Turns the rows of a reduced matrix into SOM-reactions. `transform`
    /// maps original reactions to rows (row = transform · Aᵀ). Zero rows are
    /// returned separately as the reactions they combine.
    pub fn reduced_reactions(
        &self,
        matrix: &NetStoichiometryMatrix,
        rows: &DMatrix<f64>,
        transform: &DMatrix<f64>,
        stage: ReductionStage,
    ) -> (Vec<ReducedReaction>, Vec<Vec<String>>) {
        let mut reduced = Vec::new();
        let mut dependencies = Vec::new();
        for i in 0..rows.nrows() {
            let net: Vec<(SomId, f64)> = matrix
                .soms
                .iter()
                .enumerate()
                .map(|(c, som)| (*som, rows[(i, c)]))
                .collect();
            let origins: Vec<String> = (0..transform.ncols())
                .filter(|&j| transform[(i, j)].abs() >= self.tolerance)
                .map(|j| matrix.labels[j].clone())
                .collect();
            let reaction = SomReaction::from_net(&format!("{}[{}]", stage, i), &net, self.tolerance);
            if reaction.is_null() {
                warn!("{}: linear dependency between {}", reaction.label, origins.join(", "));
                dependencies.push(origins);
                continue;
            }
            reduced.push(ReducedReaction {
                stage,
                column: i,
                reaction,
                origins,
            });
        }
        (reduced, dependencies)
    }

    /// Applies what every reduced reaction asserts. Equalities are collected
    /// and merged after all inequalities of the stage. Returns the reactions
    /// nothing could be concluded from.
    fn apply_stage(
        &self,
        graph: &mut MassEqualityGraph,
        reduced: &[ReducedReaction],
        seen: &mut SeenFindings,
    ) -> Vec<ReducedReaction> {
        let mut equalities: Vec<ReducedReaction> = Vec::new();
        let mut unresolved = Vec::new();
        for item in reduced {
            let reaction = item.reaction.resolved(|s| graph.resolve(s), self.tolerance);
            match reaction.assertion(self.tolerance) {
                MassAssertion::Null => {
                    debug!("{} cancels after merges", reaction.label);
                }
                MassAssertion::OneSided => {
                    if seen
                        .one_sided
                        .iter()
                        .any(|r| r.proportional_to(&reaction, self.tolerance))
                    {
                        continue;
                    }
                    let error = EchelonError {
                        reaction: reaction.label.clone(),
                        som_reaction: reaction.record(|id| graph.som_record(id)),
                        origins: item.origins.clone(),
                    };
                    info!("Echelon error: {}", error);
                    graph.echelon_errors.push(error);
                    seen.one_sided.push(reaction);
                }
                MassAssertion::Equal(..) => equalities.push(ReducedReaction {
                    reaction,
                    ..item.clone()
                }),
                MassAssertion::Lighter { .. } => {
                    if let Err(e) = graph.process_unequal_som_reaction(&reaction) {
                        self.record_fault(graph, item, e);
                    }
                }
                MassAssertion::Unresolved => unresolved.push(ReducedReaction {
                    reaction,
                    ..item.clone()
                }),
            }
        }
        for item in &equalities {
            let reaction = item.reaction.resolved(|s| graph.resolve(s), self.tolerance);
            let MassAssertion::Equal(a, b) = reaction.assertion(self.tolerance) else {
                continue;
            };
            let pair = if a <= b { (a, b) } else { (b, a) };
            if seen.contradicted.contains(&pair) {
                continue;
            }
            match graph.process_equal_som_reaction(&reaction, &item.origins) {
                Ok(EqualityOutcome::Contradicted) => {
                    seen.contradicted.insert(pair);
                }
                Ok(outcome) => debug!("{}: {:?}", reaction.label, outcome),
                Err(e) => self.record_fault(graph, item, e),
            }
        }
        unresolved
    }

    fn record_fault(&self, graph: &mut MassEqualityGraph, item: &ReducedReaction, e: MassBalanceError) {
        error!("{} column {}: {}", item.stage, item.column, e);
        graph.faults.push(ReductionFault {
            stage: item.stage,
            column: item.column,
            reaction: item.reaction.label.clone(),
            message: e.to_string(),
        });
    }

    /// Reduces the compound reactions and applies every derived relation to the graph.
    pub fn reduce(&self, graph: &mut MassEqualityGraph, reactions: &[&Reaction]) -> ReductionReport {
        info!("reducing {} compound reactions", reactions.len());
        let mut som_reactions = Vec::with_capacity(reactions.len());
        for reaction in reactions {
            match self.to_som_reaction(graph, reaction) {
                Ok(r) => som_reactions.push(r),
                Err(e) => {
                    error!("cannot rewrite {} over SOMs: {}", reaction.label, e);
                    return ReductionReport::with_status(ReductionStatus::Inconclusive(e.to_string()));
                }
            }
        }

        let matrix = NetStoichiometryMatrix::from_som_reactions(&som_reactions);
        let canceling = self.find_canceling(graph, &matrix);
        if !canceling.is_empty() {
            if !self.reduce_after_canceling {
                warn!(
                    "{} canceling errors: reduction of compound reactions skipped",
                    canceling.len()
                );
                return ReductionReport::with_status(ReductionStatus::SkippedCanceling);
            }
            warn!("{} canceling errors: reducing the remaining reactions", canceling.len());
        }
        let matrix = matrix.without_columns(&canceling);
        if matrix.is_empty() {
            return ReductionReport::with_status(ReductionStatus::Completed);
        }

        let decomposition = match echelon_decomposition(&matrix.matrix.transpose(), self.tolerance) {
            Ok(d) => d,
            Err(e) => {
                error!("{}", e);
                let reason = match e {
                    MassBalanceError::ReductionInconclusive(reason) => reason,
                    other => other.to_string(),
                };
                return ReductionReport::with_status(ReductionStatus::Inconclusive(reason));
            }
        };
        let mut report = ReductionReport::with_status(ReductionStatus::Completed);
        report.rank = decomposition.rank();
        info!(
            "{} compound reactions over {} SOMs, rank {}",
            matrix.ncols(),
            matrix.nrows(),
            report.rank
        );

        let mut seen = SeenFindings::default();
        let (echelon_rows, dependencies) = self.reduced_reactions(
            &matrix,
            &decomposition.upper,
            &decomposition.lower_inverse,
            ReductionStage::Echelon,
        );
        report.dependencies = dependencies;
        let mut unresolved = self.apply_stage(graph, &echelon_rows, &mut seen);

        if self.use_rref {
            let rref = reduced_echelon(&decomposition, self.tolerance);
            let (rref_rows, _) = self.reduced_reactions(
                &matrix,
                &rref.matrix,
                &rref.transform,
                ReductionStage::ReducedEchelon,
            );
            unresolved = self.apply_stage(graph, &rref_rows, &mut seen);
        }

        report.unresolved = unresolved
            .iter()
            .map(|item| UnresolvedReaction {
                label: item.reaction.label.clone(),
                equation: item.reaction.record(|id| graph.som_record(id)).equation(),
                origins: item.origins.clone(),
            })
            .collect();
        if !report.unresolved.is_empty() {
            info!("{} reduced reactions remain unresolved", report.unresolved.len());
        }
        report
    }
}
