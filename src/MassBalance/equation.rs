//! Compact equation notation for building `ReactionRecord`s by hand.
//!
//! `"2 A + B -> C"`, `"2A+B=>C"`, `"A = B"` and `"-> X"` (boundary) are all
//! accepted. Terms are separated by `" + "`; if no spaced plus is present the
//! side is split on every `+`, so charged species like `Na+` need the spaced
//! form. An empty side, `0` or `∅` is an empty side of a boundary reaction.
use crate::MassBalance::errors::MassBalanceError;
use crate::MassBalance::reaction::{ReactionRecord, StoichiometryRecord};
use regex::Regex;
use std::sync::OnceLock;

fn arrow_regex() -> &'static Regex {
    static ARROW: OnceLock<Regex> = OnceLock::new();
    ARROW.get_or_init(|| Regex::new(r"\s*(<=>|<->|->|=>|=)\s*").expect("valid arrow regex"))
}

fn term_regex() -> &'static Regex {
    static TERM: OnceLock<Regex> = OnceLock::new();
    TERM.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)?\s*\*?\s*([A-Za-z_\[(][^\s*]*)$")
            .expect("valid term regex")
    })
}

fn labeled_regex() -> &'static Regex {
    static LABELED: OnceLock<Regex> = OnceLock::new();
    LABELED.get_or_init(|| Regex::new(r"^\s*([^:\s]+)\s*:\s*(.*)$").expect("valid label regex"))
}

fn parse_error(equation: &str, reason: &str) -> MassBalanceError {
    MassBalanceError::EquationParse {
        equation: equation.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_side(equation: &str, side: &str) -> Result<Vec<StoichiometryRecord>, MassBalanceError> {
    let side = side.trim();
    if side.is_empty() || side == "0" || side == "∅" {
        return Ok(Vec::new());
    }
    let terms: Vec<&str> = if side.contains(" + ") {
        side.split(" + ").collect()
    } else {
        side.split('+').collect()
    };
    let mut records = Vec::with_capacity(terms.len());
    for term in terms {
        let term = term.trim();
        let captures = term_regex()
            .captures(term)
            .ok_or_else(|| parse_error(equation, &format!("malformed term '{}'", term)))?;
        let stoichiometry = match captures.get(1) {
            Some(coefficient) => coefficient.as_str().parse::<f64>().map_err(|e| {
                parse_error(equation, &format!("bad coefficient in '{}': {}", term, e))
            })?,
            None => 1.0,
        };
        let name = captures
            .get(2)
            .map(|m| m.as_str())
            .ok_or_else(|| parse_error(equation, &format!("missing species in '{}'", term)))?;
        records.push(StoichiometryRecord::new(name, stoichiometry));
    }
    Ok(records)
}

/// parses an equation like "2 A + B -> C" into a reaction record with the given label
pub fn parse_equation(label: &str, equation: &str) -> Result<ReactionRecord, MassBalanceError> {
    let arrows: Vec<_> = arrow_regex().find_iter(equation).collect();
    if arrows.len() != 1 {
        return Err(parse_error(
            equation,
            &format!("expected exactly one arrow, found {}", arrows.len()),
        ));
    }
    let arrow = &arrows[0];
    let reactants = parse_side(equation, &equation[..arrow.start()])?;
    let products = parse_side(equation, &equation[arrow.end()..])?;
    Ok(ReactionRecord {
        label: label.to_string(),
        reactants,
        products,
    })
}

/// parses "R1: 2 A + B -> C"
pub fn parse_labeled_equation(line: &str) -> Result<ReactionRecord, MassBalanceError> {
    let captures = labeled_regex()
        .captures(line)
        .ok_or_else(|| parse_error(line, "expected 'label: equation'"))?;
    let label = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let equation = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
    parse_equation(label, equation)
}

/// parses a list of "label: equation" lines, skipping blank lines and '#' comments
pub fn parse_equations(text: &str) -> Result<Vec<ReactionRecord>, MassBalanceError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_labeled_equation)
        .collect()
}
