//! Analysis driver: one full mass-balance pass over a reaction network.
//!
//! 1) reactions are partitioned by category, boundary reactions are set aside
//! 2) 1-1, then 1-n, then n-1 reactions are fed to the mass-equality graph in input order
//! 3) self-loops left by merges and inequality cycles are reported
//! 4) if a Type I or Type II error exists the model is already inconsistent and
//!    compound reactions are not reduced (conservative mode)
//! 5) otherwise compound reactions go through the stoichiometry reducer, whose
//!    output re-enters the graph, and cycles are searched again
//!
//! Model inconsistencies are never returned as `Err`: they are the findings of
//! `AnalysisResult`. `Err` means the records could not be analysed at all.
use crate::MassBalance::errors::MassBalanceError;
use crate::MassBalance::inconsistencies::{
    CancelingError, EchelonError, ReductionFault, TypeOneError, TypeThreeError, TypeTwoError,
};
use crate::MassBalance::mesgraph::{ArcRecord, MassEqualityGraph};
use crate::MassBalance::reaction::{ReactionCategory, ReactionNetwork, ReactionRecord};
use crate::MassBalance::reducer::{ReductionStatus, StoichiometryReducer, UnresolvedReaction};
use crate::MassBalance::som::SomRecord;
use crate::settings::AnalysisSettings;
use log::{info, warn};
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Consistent,
    Inconsistent,
    /// no inconsistency found, but the reduction failed or faulted
    Inconclusive,
}

/// number of findings of each kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub reactions: usize,
    pub species: usize,
    pub soms: usize,
    pub arcs: usize,
    pub type_one: usize,
    pub type_two: usize,
    pub type_three: usize,
    pub canceling: usize,
    pub echelon: usize,
    pub faults: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub is_consistent: bool,
    pub verdict: Verdict,
    pub type_one_errors: Vec<TypeOneError>,
    pub type_two_errors: Vec<TypeTwoError>,
    pub type_three_errors: Vec<TypeThreeError>,
    pub canceling_errors: Vec<CancelingError>,
    pub echelon_errors: Vec<EchelonError>,
    pub faults: Vec<ReductionFault>,
    pub reduction: ReductionStatus,
    pub boundary_reactions: Vec<String>,
    pub unresolved_reactions: Vec<UnresolvedReaction>,
    /// reactions combining to zero during the reduction
    pub dependent_reactions: Vec<Vec<String>>,
    /// number of reactions of every category, keyed by "1-1", "n-n", ...
    pub categories: BTreeMap<String, usize>,
    pub species_count: usize,
    pub soms: Vec<SomRecord>,
    pub arcs: Vec<ArcRecord>,
}

impl AnalysisResult {
    /// true iff at least one of the five kinds of inconsistency was found
    pub fn errors_found(&self) -> bool {
        self.error_count() > 0
    }
    pub fn error_count(&self) -> usize {
        self.type_one_errors.len()
            + self.type_two_errors.len()
            + self.type_three_errors.len()
            + self.canceling_errors.len()
            + self.echelon_errors.len()
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            reactions: self.categories.values().sum(),
            species: self.species_count,
            soms: self.soms.len(),
            arcs: self.arcs.len(),
            type_one: self.type_one_errors.len(),
            type_two: self.type_two_errors.len(),
            type_three: self.type_three_errors.len(),
            canceling: self.canceling_errors.len(),
            echelon: self.echelon_errors.len(),
            faults: self.faults.len(),
        }
    }

    /// the SOM containing a species, if the species is known
    pub fn som_of(&self, species: &str) -> Option<&SomRecord> {
        self.soms
            .iter()
            .find(|som| som.members.iter().any(|m| m == species))
    }

    /// every finding as one line of text, in the order of the five kinds
    pub fn findings(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.extend(self.type_one_errors.iter().map(|e| format!("Type I: {}", e)));
        lines.extend(self.type_two_errors.iter().map(|e| format!("Type II: {}", e)));
        lines.extend(self.type_three_errors.iter().map(|e| format!("Type III: {}", e)));
        lines.extend(self.canceling_errors.iter().map(|e| format!("Canceling: {}", e)));
        lines.extend(self.echelon_errors.iter().map(|e| format!("Echelon: {}", e)));
        lines
    }

    pub fn to_json(&self) -> Result<String, MassBalanceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    ////////////////////////PRETTY PRINTING/////////////////////////////
    pub fn pretty_print(&self) {
        println!("\n=== MASS BALANCE ANALYSIS ===");
        println!("Verdict: {:?}", self.verdict);
        println!("Reduction: {:?}", self.reduction);

        let summary = self.summary();
        let mut table = Table::new();
        table.add_row(row!["Quantity", "Count"]);
        table.add_row(row!["Reactions", summary.reactions]);
        for (category, count) in &self.categories {
            table.add_row(row![format!("  {}", category), count]);
        }
        table.add_row(row!["Species", summary.species]);
        table.add_row(row!["Sets of molecules", summary.soms]);
        table.add_row(row!["Inequality arcs", summary.arcs]);
        table.add_row(row!["Type I errors", summary.type_one]);
        table.add_row(row!["Type II errors", summary.type_two]);
        table.add_row(row!["Type III errors", summary.type_three]);
        table.add_row(row!["Canceling errors", summary.canceling]);
        table.add_row(row!["Echelon errors", summary.echelon]);
        table.add_row(row!["Reduction faults", summary.faults]);
        table.printstd();

        let merged: Vec<&SomRecord> = self.soms.iter().filter(|s| s.members.len() > 1).collect();
        if !merged.is_empty() {
            let mut som_table = Table::new();
            som_table.add_row(row!["Set of molecules", "Merged by"]);
            for som in merged {
                som_table.add_row(row![som.identifier(), som.witness_reactions.join(", ")]);
            }
            som_table.printstd();
        }

        let findings = self.findings();
        if !findings.is_empty() {
            let mut findings_table = Table::new();
            findings_table.add_row(row!["#", "Finding"]);
            for (i, line) in findings.iter().enumerate() {
                findings_table.add_row(row![i + 1, line]);
            }
            findings_table.printstd();
        }
        for fault in &self.faults {
            println!("reduction fault: {}", fault);
        }
    }
}

/// Runs mass-balance analyses with one set of settings.
#[derive(Debug, Clone)]
pub struct MassBalanceAnalyzer {
    pub settings: AnalysisSettings,
}

impl Default for MassBalanceAnalyzer {
    fn default() -> Self {
        Self {
            settings: AnalysisSettings::default(),
        }
    }
}

impl MassBalanceAnalyzer {
    pub fn new(settings: AnalysisSettings) -> Result<Self, MassBalanceError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    /// validates the records, then analyses them
    pub fn analyze_records(
        &self,
        records: &[ReactionRecord],
    ) -> Result<AnalysisResult, MassBalanceError> {
        let network = ReactionNetwork::from_records(records)?;
        self.analyze(&network)
    }

    pub fn analyze(&self, network: &ReactionNetwork) -> Result<AnalysisResult, MassBalanceError> {
        let tolerance = self.settings.tolerance;
        info!(
            "mass balance analysis of {} reactions over {} species",
            network.reactions.len(),
            network.species.len()
        );
        let mut categories: BTreeMap<String, usize> = BTreeMap::new();
        for reaction in &network.reactions {
            *categories
                .entry(reaction.category.as_str().to_string())
                .or_insert(0) += 1;
        }
        let boundary_reactions: Vec<String> = network
            .reactions_of(ReactionCategory::Boundary)
            .iter()
            .map(|r| r.label.clone())
            .collect();
        if !boundary_reactions.is_empty() {
            info!("{} boundary reactions left out", boundary_reactions.len());
        }

        let mut graph = MassEqualityGraph::new(&network.species, tolerance);
        for reaction in network.reactions_of(ReactionCategory::UniUni) {
            graph.process_uni_uni(reaction)?;
        }
        for reaction in network.reactions_of(ReactionCategory::UniMulti) {
            graph.process_uni_multi(reaction)?;
        }
        for reaction in network.reactions_of(ReactionCategory::MultiUni) {
            graph.process_multi_uni(reaction)?;
        }
        graph.check_self_loop_errors();
        graph.check_type_two_error();
        info!(
            "simple reactions processed: {} SOMs, {} arcs, {} Type I, {} Type II errors",
            graph.node_count(),
            graph.arc_count(),
            graph.type_one_errors.len(),
            graph.type_two_errors.len()
        );

        let compound = network.reactions_of(ReactionCategory::MultiMulti);
        let mut unresolved_reactions = Vec::new();
        let mut dependent_reactions = Vec::new();
        let reduction = if compound.is_empty() {
            ReductionStatus::NotRequired
        } else if graph.has_type_one_or_two_errors() {
            warn!(
                "conservative mode: {} compound reactions are not reduced",
                compound.len()
            );
            ReductionStatus::SkippedConservative
        } else {
            let reducer = StoichiometryReducer::from_settings(&self.settings);
            let report = reducer.reduce(&mut graph, &compound);
            if self.settings.recheck_cycles_after_reduction
                && report.status == ReductionStatus::Completed
            {
                graph.check_self_loop_errors();
                graph.check_type_two_error();
            }
            unresolved_reactions = report.unresolved;
            dependent_reactions = report.dependencies;
            report.status
        };

        let error_count = graph.error_count();
        let verdict = if error_count > 0 {
            Verdict::Inconsistent
        } else if reduction.is_inconclusive() || !graph.faults.is_empty() {
            Verdict::Inconclusive
        } else {
            Verdict::Consistent
        };
        info!("analysis finished: {:?}, {} findings", verdict, error_count);

        Ok(AnalysisResult {
            is_consistent: verdict == Verdict::Consistent,
            verdict,
            soms: graph.som_records(),
            arcs: graph.arc_records(),
            type_one_errors: graph.type_one_errors,
            type_two_errors: graph.type_two_errors,
            type_three_errors: graph.type_three_errors,
            canceling_errors: graph.canceling_errors,
            echelon_errors: graph.echelon_errors,
            faults: graph.faults,
            reduction,
            boundary_reactions,
            unresolved_reactions,
            dependent_reactions,
            categories,
            species_count: network.species.len(),
        })
    }
}

/// analyses the records with default settings
pub fn analyze(records: &[ReactionRecord]) -> Result<AnalysisResult, MassBalanceError> {
    MassBalanceAnalyzer::default().analyze_records(records)
}
