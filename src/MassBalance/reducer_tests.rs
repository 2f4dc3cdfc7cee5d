/////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
// TESTS
//////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use crate::MassBalance::equation::parse_equations;
    use crate::MassBalance::mesgraph::MassEqualityGraph;
    use crate::MassBalance::reaction::{ReactionCategory, ReactionNetwork};
    use crate::MassBalance::reducer::{
        NetStoichiometryMatrix, ReductionStatus, StoichiometryReducer,
    };
    use crate::MassBalance::som::SomId;
    use crate::MassBalance::som_reaction::MassAssertion;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    const TOL: f64 = 1e-4;

    fn network(model: &str) -> ReactionNetwork {
        ReactionNetwork::from_records(&parse_equations(model).unwrap()).unwrap()
    }

    fn som(graph: &MassEqualityGraph, name: &str) -> SomId {
        graph.som_of_name(name).unwrap()
    }

    #[test]
    fn test_net_stoichiometry_matrix() {
        let net = network("R1: A + B -> C + D\nR2: 2 B + X -> D + X");
        let graph = MassEqualityGraph::new(&net.species, TOL);
        let reducer = StoichiometryReducer::default();
        let som_reactions: Vec<_> = net
            .reactions
            .iter()
            .map(|r| reducer.to_som_reaction(&graph, r).unwrap())
            .collect();
        let matrix = NetStoichiometryMatrix::from_som_reactions(&som_reactions);
        // X cancels in R2 and gets no row
        let names: Vec<String> = matrix.soms.iter().map(|s| graph.identifier(*s)).collect();
        assert_eq!(names, vec!["{A}", "{B}", "{C}", "{D}"]);
        assert_eq!(matrix.labels, vec!["R1".to_string(), "R2".to_string()]);
        let expected = DMatrix::from_row_slice(
            4,
            2,
            &[
                -1.0, 0.0, //
                -1.0, -2.0, //
                1.0, 0.0, //
                1.0, 1.0,
            ],
        );
        assert_relative_eq!(matrix.matrix, expected);
        let column = matrix.column_reaction(1, TOL);
        assert_eq!(column.label, "R2");
        assert_eq!(column.category(), ReactionCategory::UniUni);
    }

    #[test]
    fn test_same_som_contributions_combine() {
        // 2A + 2B -> 2C with A and B already one SOM
        let net = network("R0: A -> B\nR1: 2 A + 2 B -> 2 C");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        graph.process_uni_uni(&net.reactions[0]).unwrap();
        assert_eq!(net.reactions[1].category, ReactionCategory::MultiUni);
        let reducer = StoichiometryReducer::default();
        let reaction = reducer.to_som_reaction(&graph, &net.reactions[1]).unwrap();
        assert!(!reaction.is_one_sided());
        assert_eq!(reaction.category(), ReactionCategory::UniUni);
        assert_relative_eq!(reaction.reactants[0].stoichiometry, 4.0);
        assert_eq!(
            reaction.assertion(TOL),
            MassAssertion::Lighter {
                sources: vec![som(&graph, "A")],
                destination: som(&graph, "C")
            }
        );
        let matrix = NetStoichiometryMatrix::from_som_reactions(&[reaction]);
        assert!(reducer.find_canceling(&mut graph, &matrix).is_empty());
        assert!(graph.canceling_errors.is_empty());
    }

    #[test]
    fn test_canceling_column_is_reported() {
        let net = network("R1: A + B -> A + B + C\nR2: A + B -> B + A\nR3: D + E -> F + G");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        let reducer = StoichiometryReducer::default();
        let som_reactions: Vec<_> = net
            .reactions
            .iter()
            .map(|r| reducer.to_som_reaction(&graph, r).unwrap())
            .collect();
        let matrix = NetStoichiometryMatrix::from_som_reactions(&som_reactions);
        // R2 cancels completely: not an error
        assert_eq!(reducer.find_canceling(&mut graph, &matrix), vec![0]);
        assert_eq!(graph.canceling_errors.len(), 1);
        let error = &graph.canceling_errors[0];
        assert_eq!(error.som_reaction.label, "R1");
        assert!(error.som_reaction.reactants.is_empty());
        assert_eq!(error.som_reaction.products[0].som.members, vec!["C".to_string()]);
        let rest = matrix.without_columns(&[0]);
        assert_eq!(rest.labels, vec!["R2".to_string(), "R3".to_string()]);
        assert_eq!(rest.nrows(), 4);
    }

    #[test]
    fn test_canceling_stops_reduction_by_default() {
        let net = network("R1: A + B -> A + B + C\nR2: D + E -> F + G\nR3: F + G -> D + E + H");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        let compound = net.reactions_of(ReactionCategory::MultiMulti);
        let report = StoichiometryReducer::default().reduce(&mut graph, &compound);
        assert_eq!(report.status, ReductionStatus::SkippedCanceling);
        assert_eq!(graph.canceling_errors.len(), 1);
        assert!(graph.echelon_errors.is_empty());
    }

    #[test]
    fn test_echelon_error_after_canceling() {
        let net = network("R1: A + B -> A + B + C\nR2: D + E -> F + G\nR3: F + G -> D + E + H");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        let compound = net.reactions_of(ReactionCategory::MultiMulti);
        let reducer = StoichiometryReducer {
            reduce_after_canceling: true,
            ..StoichiometryReducer::default()
        };
        let report = reducer.reduce(&mut graph, &compound);
        assert_eq!(report.status, ReductionStatus::Completed);
        assert_eq!(report.rank, 2);
        assert_eq!(graph.canceling_errors.len(), 1);
        // R2 + R3 leaves H alone on the product side; the rref stage finds it again
        assert_eq!(graph.echelon_errors.len(), 1);
        let error = &graph.echelon_errors[0];
        assert_eq!(error.reaction, "echelon[1]");
        assert_eq!(error.origins, vec!["R2".to_string(), "R3".to_string()]);
        assert_eq!(error.som_reaction.products[0].som.members, vec!["H".to_string()]);
        assert_eq!(report.unresolved.len(), 1);
        assert!(graph.faults.is_empty());
    }

    #[test]
    fn test_normalised_rref_row_is_not_a_second_echelon_error() {
        // echelon row 1 is 0.5 H; the rref stage scales it to 1.0 H
        let net = network("R1: D + E -> F + G\nR2: 2 F + 2 G -> 2 D + 2 E + H");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        let compound = net.reactions_of(ReactionCategory::MultiMulti);
        let report = StoichiometryReducer::default().reduce(&mut graph, &compound);
        assert_eq!(report.status, ReductionStatus::Completed);
        assert_eq!(graph.echelon_errors.len(), 1);
        let error = &graph.echelon_errors[0];
        assert_eq!(error.reaction, "echelon[1]");
        assert_eq!(error.origins, vec!["R1".to_string(), "R2".to_string()]);
        assert_relative_eq!(error.som_reaction.products[0].stoichiometry, 0.5);
    }

    #[test]
    fn test_linear_dependency_is_not_a_finding() {
        let net = network("R1: A + B -> C + D\nR2: C + D -> A + B");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        let compound = net.reactions_of(ReactionCategory::MultiMulti);
        let report = StoichiometryReducer::default().reduce(&mut graph, &compound);
        assert_eq!(report.status, ReductionStatus::Completed);
        assert_eq!(report.rank, 1);
        assert_eq!(
            report.dependencies,
            vec![vec!["R1".to_string(), "R2".to_string()]]
        );
        assert_eq!(graph.error_count(), 0);
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].origins, vec!["R1".to_string()]);
    }

    #[test]
    fn test_reduction_derives_inequalities() {
        // R1: A + B = C + D, R2: 2B = D  =>  B < D, C < A, D < A
        let net = network("R1: A + B -> C + D\nR2: 2 B + X -> D + X");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        let compound = net.reactions_of(ReactionCategory::MultiMulti);
        assert_eq!(compound.len(), 2);
        let report = StoichiometryReducer::default().reduce(&mut graph, &compound);
        assert_eq!(report.status, ReductionStatus::Completed);
        let (a, b, c, d) = (
            som(&graph, "A"),
            som(&graph, "B"),
            som(&graph, "C"),
            som(&graph, "D"),
        );
        assert_eq!(
            graph.arc_labels(b, d).unwrap(),
            &["echelon[1]".to_string(), "rref[1]".to_string()]
        );
        assert_eq!(graph.arc_labels(c, a).unwrap(), &["rref[0]".to_string()]);
        assert!(graph.has_arc(d, a));
        assert_eq!(graph.arc_count(), 3);
        assert!(report.unresolved.is_empty());
        assert_eq!(graph.error_count(), 0);
    }

    #[test]
    fn test_without_rref_stage() {
        let net = network("R1: A + B -> C + D\nR2: 2 B + X -> D + X");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        let compound = net.reactions_of(ReactionCategory::MultiMulti);
        let reducer = StoichiometryReducer {
            use_rref: false,
            ..StoichiometryReducer::default()
        };
        let report = reducer.reduce(&mut graph, &compound);
        assert_eq!(graph.arc_count(), 1);
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].label, "echelon[0]");
        assert_eq!(report.unresolved[0].origins, vec!["R1".to_string()]);
    }

    #[test]
    fn test_derived_equality_merges_soms() {
        // R2 reduces to D = B
        let net = network("R1: A + B -> C + D\nR2: D + F -> B + F");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        let compound = net.reactions_of(ReactionCategory::MultiMulti);
        let report = StoichiometryReducer::default().reduce(&mut graph, &compound);
        assert_eq!(report.status, ReductionStatus::Completed);
        assert_eq!(som(&graph, "B"), som(&graph, "D"));
        // the rref stage also gives A = C
        assert_eq!(som(&graph, "A"), som(&graph, "C"));
        assert!(graph.type_three_errors.is_empty());
    }

    #[test]
    fn test_derived_equality_against_inequality_is_type_three() {
        let net = network("R0: C -> A + X\nR1: A + B -> C + D\nR2: D + F -> B + F");
        let mut graph = MassEqualityGraph::new(&net.species, TOL);
        graph.process_uni_multi(&net.reactions[0]).unwrap();
        let compound = net.reactions_of(ReactionCategory::MultiMulti);
        let report = StoichiometryReducer::default().reduce(&mut graph, &compound);
        assert_eq!(report.status, ReductionStatus::Completed);
        assert_eq!(graph.type_three_errors.len(), 1);
        let error = &graph.type_three_errors[0];
        assert_eq!(error.origins, vec!["R1".to_string(), "R2".to_string()]);
        assert_eq!(error.som_reaction.label, "rref[0]");
        assert_eq!(error.path.len(), 1);
        assert_eq!(error.path[0].2, vec!["R0".to_string()]);
        // A and C stay apart, B and D were merged at the echelon stage
        assert_ne!(som(&graph, "A"), som(&graph, "C"));
        assert_eq!(som(&graph, "B"), som(&graph, "D"));
    }
}
