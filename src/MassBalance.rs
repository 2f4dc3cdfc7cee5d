//! Static mass-balance analysis of chemical reaction networks.
//! The analysis looks for situations where no positive mass per species can make
//! every reaction conserve mass. Species assumed to have equal mass are grouped into
//! sets of molecules (SOMs); reactions are turned into equalities and strict
//! inequalities between SOMs; contradictions are reported as five kinds of errors:
//! 1) Type I - an inequality between two species already known to be equal
//! 2) Type II - a cycle of strict inequalities
//! 3) Type III - an equality derived from compound reactions blocked by an inequality
//! 4) Canceling - a compound reaction whose net SOM stoichiometry has a single sign
//! 5) Echelon - a reduced reaction with an empty side, visible only after elimination
//!
//! Usage:
//! ```rust
//! use StoichLint::MassBalance::analysis::analyze;
//! use StoichLint::MassBalance::equation::parse_equations;
//! let records = parse_equations("R1: A -> B\nR2: B -> A + C").unwrap();
//! let result = analyze(&records).unwrap();
//! assert!(!result.is_consistent);
//! ```

/// analysis driver and its result
pub mod analysis;
/// cycle search over the inequality graph: Tarjan SCC, Johnson elementary cycles, BFS paths
pub mod cycles;
/// compact equation notation "2 A + B -> C" for building reaction records
pub mod equation;
pub mod errors;
/// records of the five kinds of inconsistencies and of reduction faults
pub mod inconsistencies;
/// echelon and reduced row-echelon forms with traceable row operations (nalgebra)
pub mod linalg;
/// mass-equality graph: SOMs as nodes, inequality arcs, merges and error checks
pub mod mesgraph;
/// reaction records, the categorizer and the validated reaction network
pub mod reaction;
/// reduction of compound reactions into equalities and inequalities
pub mod reducer;
pub mod som;
pub mod som_reaction;
pub mod species;

#[cfg(test)]
mod reducer_tests;
