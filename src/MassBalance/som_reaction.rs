//! SOM-level analogues of `SpeciesStoichiometry` and `Reaction`.
//!
//! A SOM-reaction is built from net stoichiometries: a reactant and a product
//! falling into the same SOM cancel, and what is left decides on which side the
//! SOM stands. They are produced by the stoichiometry reducer and consumed by
//! the arc/merge logic of the mass-equality graph.
use crate::MassBalance::reaction::{ReactionCategory, categorize};
use crate::MassBalance::som::{SomId, SomRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SomStoichiometry {
    pub som: SomId,
    pub stoichiometry: f64,
}

/// What a SOM-reaction asserts about the masses of its SOMs.
#[derive(Debug, Clone, PartialEq)]
pub enum MassAssertion {
    /// nothing left after cancellation
    Null,
    /// only one side is populated: cannot be balanced by positive masses
    OneSided,
    /// 1-1 with equal stoichiometries
    Equal(SomId, SomId),
    /// every source is strictly lighter than the destination
    Lighter {
        sources: Vec<SomId>,
        destination: SomId,
    },
    /// n-n: no direct conclusion
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SomReaction {
    pub label: String,
    pub reactants: Vec<SomStoichiometry>,
    pub products: Vec<SomStoichiometry>,
}

impl SomReaction {
    /// Builds a SOM-reaction from signed net stoichiometries (products positive).
    /// Entries with magnitude below `tolerance` are dropped; repeated SOMs are summed first.
    pub fn from_net(label: &str, net: &[(SomId, f64)], tolerance: f64) -> Self {
        let mut summed: BTreeMap<SomId, f64> = BTreeMap::new();
        let mut order: Vec<SomId> = Vec::new();
        for (som, value) in net {
            if !summed.contains_key(som) {
                order.push(*som);
            }
            *summed.entry(*som).or_insert(0.0) += value;
        }
        let mut reactants = Vec::new();
        let mut products = Vec::new();
        for som in order {
            let value = summed[&som];
            if value < -tolerance {
                reactants.push(SomStoichiometry {
                    som,
                    stoichiometry: -value,
                });
            } else if value > tolerance {
                products.push(SomStoichiometry {
                    som,
                    stoichiometry: value,
                });
            }
        }
        Self {
            label: label.to_string(),
            reactants,
            products,
        }
    }

    /// signed net stoichiometry per SOM (products positive), reactants first
    pub fn net(&self) -> Vec<(SomId, f64)> {
        self.reactants
            .iter()
            .map(|t| (t.som, -t.stoichiometry))
            .chain(self.products.iter().map(|t| (t.som, t.stoichiometry)))
            .collect()
    }

    /// category by the number of distinct reactant and product SOMs
    pub fn category(&self) -> ReactionCategory {
        categorize(self.reactants.len(), self.products.len())
    }
    pub fn is_null(&self) -> bool {
        self.reactants.is_empty() && self.products.is_empty()
    }
    /// exactly one side populated: all nonzero entries share a sign
    pub fn is_one_sided(&self) -> bool {
        self.reactants.is_empty() != self.products.is_empty()
    }

    pub fn assertion(&self, tolerance: f64) -> MassAssertion {
        if self.is_null() {
            return MassAssertion::Null;
        }
        if self.is_one_sided() {
            return MassAssertion::OneSided;
        }
        match self.category() {
            ReactionCategory::UniUni => {
                let reactant = self.reactants[0];
                let product = self.products[0];
                let difference = reactant.stoichiometry - product.stoichiometry;
                if difference.abs() <= tolerance {
                    MassAssertion::Equal(reactant.som, product.som)
                } else if difference > 0.0 {
                    // more reactant particles make fewer product particles: product is heavier
                    MassAssertion::Lighter {
                        sources: vec![reactant.som],
                        destination: product.som,
                    }
                } else {
                    MassAssertion::Lighter {
                        sources: vec![product.som],
                        destination: reactant.som,
                    }
                }
            }
            ReactionCategory::UniMulti => MassAssertion::Lighter {
                sources: self.products.iter().map(|t| t.som).collect(),
                destination: self.reactants[0].som,
            },
            ReactionCategory::MultiUni => MassAssertion::Lighter {
                sources: self.reactants.iter().map(|t| t.som).collect(),
                destination: self.products[0].som,
            },
            _ => MassAssertion::Unresolved,
        }
    }

    /// re-nets the reaction after SOM ids were forwarded by merges
    pub fn resolved(&self, resolve: impl Fn(SomId) -> SomId, tolerance: f64) -> SomReaction {
        let net: Vec<(SomId, f64)> = self
            .net()
            .into_iter()
            .map(|(som, value)| (resolve(som), value))
            .collect();
        SomReaction::from_net(&self.label, &net, tolerance)
    }

    /// Same SOMs on the same sides with stoichiometries in one fixed ratio.
    /// A reduced row and the same row divided by its pivot compare equal.
    pub fn proportional_to(&self, other: &SomReaction, tolerance: f64) -> bool {
        if !self.same_sides(other) {
            return false;
        }
        let Some(first) = self.reactants.first().or(self.products.first()) else {
            return true;
        };
        let Some(scale) = other.stoichiometry_of(first.som).map(|s| first.stoichiometry / s) else {
            return false;
        };
        self.reactants
            .iter()
            .chain(self.products.iter())
            .all(|x| match other.stoichiometry_of(x.som) {
                Some(y) => (x.stoichiometry - scale * y).abs() <= tolerance * x.stoichiometry.max(1.0),
                None => false,
            })
    }

    fn same_sides(&self, other: &SomReaction) -> bool {
        let side_eq = |a: &[SomStoichiometry], b: &[SomStoichiometry]| {
            a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.som == y.som))
        };
        side_eq(&self.reactants, &other.reactants) && side_eq(&self.products, &other.products)
    }

    fn stoichiometry_of(&self, som: SomId) -> Option<f64> {
        self.reactants
            .iter()
            .chain(self.products.iter())
            .find(|t| t.som == som)
            .map(|t| t.stoichiometry)
    }

    /// SOMs appearing in the reaction, reactants first
    pub fn soms(&self) -> Vec<SomId> {
        self.reactants
            .iter()
            .chain(self.products.iter())
            .map(|t| t.som)
            .collect()
    }

    pub fn record(&self, describe: impl Fn(SomId) -> SomRecord) -> SomReactionRecord {
        let side = |terms: &[SomStoichiometry]| {
            terms
                .iter()
                .map(|t| SomTermRecord {
                    som: describe(t.som),
                    stoichiometry: t.stoichiometry,
                })
                .collect()
        };
        SomReactionRecord {
            label: self.label.clone(),
            category: self.category(),
            reactants: side(&self.reactants),
            products: side(&self.products),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SomTermRecord {
    pub som: SomRecord,
    pub stoichiometry: f64,
}

/// display snapshot of a SOM-reaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SomReactionRecord {
    pub label: String,
    pub category: ReactionCategory,
    pub reactants: Vec<SomTermRecord>,
    pub products: Vec<SomTermRecord>,
}

impl SomReactionRecord {
    pub fn equation(&self) -> String {
        let side = |terms: &[SomTermRecord]| {
            terms
                .iter()
                .map(|t| format!("{:.4} {}", t.stoichiometry, t.som.identifier()))
                .collect::<Vec<_>>()
                .join(" + ")
        };
        format!("{} -> {}", side(&self.reactants), side(&self.products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const TOL: f64 = 1e-4;

    #[test]
    fn test_from_net_cancels_same_som() {
        // A + B -> A + C with A on both sides: A cancels completely
        let net = vec![
            (SomId(0), -1.0),
            (SomId(1), -1.0),
            (SomId(0), 1.0),
            (SomId(2), 1.0),
        ];
        let reaction = SomReaction::from_net("R", &net, TOL);
        assert_eq!(reaction.reactants.len(), 1);
        assert_eq!(reaction.reactants[0].som, SomId(1));
        assert_eq!(reaction.products.len(), 1);
        assert_eq!(reaction.category(), ReactionCategory::UniUni);
        assert_eq!(reaction.assertion(TOL), MassAssertion::Equal(SomId(1), SomId(2)));
    }

    #[test]
    fn test_same_sign_contributions_combine() {
        // 2A + 2B -> 2C with A and B in one SOM
        let net = vec![(SomId(0), -2.0), (SomId(0), -2.0), (SomId(1), 2.0)];
        let reaction = SomReaction::from_net("R", &net, TOL);
        assert_eq!(reaction.category(), ReactionCategory::UniUni);
        assert!(!reaction.is_one_sided());
        assert_eq!(reaction.reactants[0].stoichiometry, 4.0);
        assert_eq!(
            reaction.assertion(TOL),
            MassAssertion::Lighter {
                sources: vec![SomId(0)],
                destination: SomId(1)
            }
        );
    }

    #[test]
    fn test_partial_cancellation_keeps_remainder() {
        // 2A -> A + B: one A remains as reactant
        let net = vec![(SomId(0), -2.0), (SomId(0), 1.0), (SomId(1), 1.0)];
        let reaction = SomReaction::from_net("R", &net, TOL);
        assert_eq!(reaction.reactants[0].stoichiometry, 1.0);
        assert_eq!(reaction.assertion(TOL), MassAssertion::Equal(SomId(0), SomId(1)));
    }

    #[test]
    fn test_assertions_by_category() {
        let one_n = SomReaction::from_net(
            "R",
            &[(SomId(0), -1.0), (SomId(1), 1.0), (SomId(2), 1.0)],
            TOL,
        );
        assert_eq!(
            one_n.assertion(TOL),
            MassAssertion::Lighter {
                sources: vec![SomId(1), SomId(2)],
                destination: SomId(0)
            }
        );
        let n_one = SomReaction::from_net(
            "R",
            &[(SomId(0), -1.0), (SomId(1), -1.0), (SomId(2), 1.0)],
            TOL,
        );
        assert_eq!(
            n_one.assertion(TOL),
            MassAssertion::Lighter {
                sources: vec![SomId(0), SomId(1)],
                destination: SomId(2)
            }
        );
        let n_n = SomReaction::from_net(
            "R",
            &[
                (SomId(0), -1.0),
                (SomId(1), -1.0),
                (SomId(2), 1.0),
                (SomId(3), 1.0),
            ],
            TOL,
        );
        assert_eq!(n_n.assertion(TOL), MassAssertion::Unresolved);
        let one_sided = SomReaction::from_net("R", &[(SomId(0), 1.0), (SomId(1), 2.0)], TOL);
        assert_eq!(one_sided.assertion(TOL), MassAssertion::OneSided);
        let null = SomReaction::from_net("R", &[(SomId(0), 1e-6)], TOL);
        assert_eq!(null.assertion(TOL), MassAssertion::Null);
    }

    #[test]
    fn test_resolved_after_merge() {
        let reaction = SomReaction::from_net(
            "R",
            &[(SomId(0), -1.0), (SomId(1), -1.0), (SomId(2), 2.0)],
            TOL,
        );
        // SOMs 0 and 1 merged into 5
        let resolved = reaction.resolved(|s| if s.0 < 2 { SomId(5) } else { s }, TOL);
        assert_eq!(resolved.category(), ReactionCategory::UniUni);
        assert_eq!(resolved.assertion(TOL), MassAssertion::Equal(SomId(5), SomId(2)));
        assert!(resolved.proportional_to(&resolved.clone(), TOL));
        assert!(!resolved.proportional_to(&reaction, TOL));
    }

    #[test]
    fn test_rows_differing_by_a_factor_are_proportional() {
        let row = SomReaction::from_net("echelon[1]", &[(SomId(4), 0.5)], TOL);
        let normalised = SomReaction::from_net("rref[1]", &[(SomId(4), 1.0)], TOL);
        assert!(row.proportional_to(&normalised, TOL));

        let two = SomReaction::from_net("a", &[(SomId(0), 1.0), (SomId(1), 2.0)], TOL);
        let doubled = SomReaction::from_net("b", &[(SomId(0), 2.0), (SomId(1), 4.0)], TOL);
        let skewed = SomReaction::from_net("c", &[(SomId(0), 2.0), (SomId(1), 3.0)], TOL);
        let flipped = SomReaction::from_net("d", &[(SomId(0), -1.0), (SomId(1), -2.0)], TOL);
        assert!(two.proportional_to(&doubled, TOL));
        assert!(!two.proportional_to(&skewed, TOL));
        assert!(!two.proportional_to(&flipped, TOL));
    }
}
