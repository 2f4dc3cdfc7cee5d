use crate::MassBalance::analysis::{MassBalanceAnalyzer, Verdict, analyze};
use crate::MassBalance::equation::parse_equations;
use crate::MassBalance::reaction::ReactionRecord;
use crate::settings::AnalysisSettings;

pub fn mass_balance_examples(task: usize) {
    //
    match task {
        0 => {
            // CONSISTENT MODEL: uni-uni reactions merge species whatever the stoichiometry
            let records = vec![
                ReactionRecord::new("R1", &[("S1", 2.0)], &[("S2", 3.0)]),
                ReactionRecord::new("R2", &[("S2", 1.0)], &[("S1", 1.0)]),
            ];
            let result = analyze(&records).unwrap();
            result.pretty_print();
            assert!(result.is_consistent);
            println!("S1 belongs to {:?}", result.som_of("S1").map(|s| s.identifier()));
        }
        1 => {
            // TYPE I AND TYPE II ERRORS
            let model = "
                # glucose phosphorylation written twice
                R1: Glc -> G6P
                R2: G6P -> Glc + Pi
                # a cycle of inequalities
                R3: A + X -> B
                R4: B + Y -> C
                R5: C + Z -> A
            ";
            let records = parse_equations(model).unwrap();
            let result = analyze(&records).unwrap();
            result.pretty_print();
            assert_eq!(result.type_one_errors.len(), 1);
            assert_eq!(result.type_two_errors.len(), 1);
            for line in result.findings() {
                println!("{}", line);
            }
        }
        2 => {
            // COMPOUND REACTIONS: equality derived by reduction contradicts an inequality (Type III)
            let model = "
                R0: C -> A + X
                R1: A + B -> C + D
                R2: D + F -> B + F
            ";
            let records = parse_equations(model).unwrap();
            let result = analyze(&records).unwrap();
            result.pretty_print();
            assert_eq!(result.type_three_errors.len(), 1);
            println!("{}", result.to_json().unwrap());
        }
        3 => {
            // CANCELING AND ECHELON ERRORS, with and without reduction after canceling
            let model = "
                R1: A + B -> A + B + C
                R2: D + E -> F + G
                R3: F + G -> D + E + H
            ";
            let records = parse_equations(model).unwrap();
            let strict = analyze(&records).unwrap();
            strict.pretty_print();
            println!("default settings: {:?}", strict.reduction);

            let mut settings = AnalysisSettings::default();
            settings.reduce_after_canceling = true;
            let analyzer = MassBalanceAnalyzer::new(settings).unwrap();
            let relaxed = analyzer.analyze_records(&records).unwrap();
            relaxed.pretty_print();
            assert_eq!(relaxed.canceling_errors.len(), 1);
            assert_eq!(relaxed.echelon_errors.len(), 1);
        }
        4 => {
            // MALFORMED INPUT is a tool error, not a finding
            let records = vec![
                ReactionRecord::new("R1", &[("A", 1.0)], &[("B", 1.0)]),
                ReactionRecord::new("R1", &[("B", 1.0)], &[("C", 1.0)]),
            ];
            match analyze(&records) {
                Ok(result) => println!("unexpected result: {:?}", result.verdict),
                Err(e) => println!("analysis refused: {}", e),
            }
            let result = analyze(&parse_equations("R1: A -> B\nIN: -> A").unwrap()).unwrap();
            assert_eq!(result.verdict, Verdict::Consistent);
            println!("boundary reactions: {:?}", result.boundary_reactions);
        }
        _ => {
            println!("no such task: {}", task);
        }
    }
}
