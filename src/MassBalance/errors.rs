//! Fatal errors of the tool itself.
//!
//! These are NOT findings about a model (see `inconsistencies` for the five
//! kinds of mass-balance inconsistencies). A `MassBalanceError` means the
//! analysis could not determine consistency: the input was malformed, a
//! reduction step failed numerically, or a file could not be read.
use thiserror::Error;

/// error types for building and analysing a reaction network
#[derive(Debug, Error)]
pub enum MassBalanceError {
    #[error("Reaction label is empty")]
    EmptyLabel,
    #[error("Duplicate reaction label: {0}")]
    DuplicateLabel(String),
    #[error("Reaction {0} has neither reactants nor products")]
    EmptyReaction(String),
    #[error("Reaction {0} contains a species with an empty name")]
    EmptySpeciesName(String),
    #[error("Reaction {reaction}: stoichiometry of {species} must be positive and finite, got {value}")]
    InvalidStoichiometry {
        reaction: String,
        species: String,
        value: f64,
    },
    #[error("Cannot parse equation '{equation}': {reason}")]
    EquationParse { equation: String, reason: String },
    #[error("Unknown species: {0}")]
    UnknownSpecies(String),
    #[error("Cannot merge set of molecules {0} with itself")]
    SelfMerge(String),
    #[error("Set of molecules {0} is not a live node of the graph")]
    DeadSom(usize),
    #[error("Reduced reaction {reaction} would create an arc from {som} to itself")]
    SelfReferentialArc { reaction: String, som: String },
    #[error("Reduced reaction {0} does not assert an equality")]
    NotAnEquality(String),
    #[error("Reduction inconclusive: {0}")]
    ReductionInconclusive(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MassBalanceError {
    /// true for errors caused by the reaction records themselves
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MassBalanceError::EmptyLabel
                | MassBalanceError::DuplicateLabel(_)
                | MassBalanceError::EmptyReaction(_)
                | MassBalanceError::EmptySpeciesName(_)
                | MassBalanceError::InvalidStoichiometry { .. }
                | MassBalanceError::EquationParse { .. }
                | MassBalanceError::UnknownSpecies(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MassBalanceError::DuplicateLabel("R1".to_string());
        assert_eq!(err.to_string(), "Duplicate reaction label: R1");
        let err = MassBalanceError::InvalidStoichiometry {
            reaction: "R2".to_string(),
            species: "A".to_string(),
            value: -1.0,
        };
        assert_eq!(
            err.to_string(),
            "Reaction R2: stoichiometry of A must be positive and finite, got -1"
        );
    }

    #[test]
    fn test_input_errors_are_distinguished() {
        assert!(MassBalanceError::EmptyLabel.is_input_error());
        assert!(MassBalanceError::EmptyReaction("R".to_string()).is_input_error());
        assert!(!MassBalanceError::ReductionInconclusive("singular".to_string()).is_input_error());
        assert!(!MassBalanceError::SelfMerge("{A}".to_string()).is_input_error());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MassBalanceError = io.into();
        assert!(matches!(err, MassBalanceError::Io(_)));
    }
}
