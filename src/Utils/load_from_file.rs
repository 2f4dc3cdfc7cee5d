use crate::MassBalance::analysis::AnalysisResult;
use crate::MassBalance::equation::{parse_equation, parse_equations};
use crate::MassBalance::errors::MassBalanceError;
use crate::MassBalance::reaction::ReactionRecord;
use crate::settings::AnalysisSettings;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One reaction of a JSON input: either a full record with reactant and
/// product lists, or a label with an equation in compact notation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReactionEntry {
    Equation { label: String, equation: String },
    Record(ReactionRecord),
}

impl ReactionEntry {
    pub fn into_record(self) -> Result<ReactionRecord, MassBalanceError> {
        match self {
            ReactionEntry::Equation { label, equation } => parse_equation(&label, &equation),
            ReactionEntry::Record(record) => Ok(record),
        }
    }
}

/// Accepted layouts of a JSON input file: a bare list of reactions, or a task
/// with the reactions and optional analysis settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReactionFile {
    List(Vec<ReactionEntry>),
    Task {
        reactions: Vec<ReactionEntry>,
        #[serde(default)]
        settings: Option<AnalysisSettings>,
    },
}

fn read_file(file_name: &str) -> Result<String, MassBalanceError> {
    let path = Path::new(file_name);
    if !path.exists() {
        error!("File '{}' does not exist", file_name);
        return Err(MassBalanceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File '{}' does not exist", file_name),
        )));
    }
    Ok(fs::read_to_string(path)?)
}

/// parses JSON, logging the position of a syntax error together with the offending line
fn parse_json<T: for<'de> Deserialize<'de>>(
    content: &str,
    file_name: &str,
) -> Result<T, MassBalanceError> {
    match serde_json::from_str::<T>(content) {
        Ok(data) => Ok(data),
        Err(e) => {
            let error_line = e.line();
            let error_column = e.column();
            error!(
                "Error parsing '{}' at line {}, column {}: {}",
                file_name, error_line, error_column, e
            );
            if let Some(problem_line) = content.lines().nth(error_line.saturating_sub(1)) {
                error!("Problematic line: {}", problem_line);
                if error_column >= 1 && error_column <= problem_line.len() + 1 {
                    let pointer = " ".repeat(error_column - 1) + "^";
                    error!("{}", pointer);
                }
            }
            Err(e.into())
        }
    }
}

/// Loads a reaction network together with optional settings.
/// Files ending in `.json` are read as JSON (`ReactionFile`), any other file as
/// "label: equation" lines (blank lines and '#' comments are skipped).
pub fn load_task_from_file(
    file_name: &str,
) -> Result<(Vec<ReactionRecord>, Option<AnalysisSettings>), MassBalanceError> {
    let content = read_file(file_name)?;
    let is_json = Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if !is_json {
        let records = parse_equations(&content)?;
        info!(
            "Loaded {} reactions from equation file '{}'",
            records.len(),
            file_name
        );
        return Ok((records, None));
    }
    let (entries, settings) = match parse_json::<ReactionFile>(&content, file_name)? {
        ReactionFile::List(entries) => (entries, None),
        ReactionFile::Task {
            reactions,
            settings,
        } => (reactions, settings),
    };
    if entries.is_empty() {
        warn!("File '{}' contains no reactions", file_name);
    }
    let records = entries
        .into_iter()
        .map(ReactionEntry::into_record)
        .collect::<Result<Vec<_>, _>>()?;
    info!("Loaded {} reactions from '{}'", records.len(), file_name);
    Ok((records, settings))
}

pub fn load_reactions_from_file(file_name: &str) -> Result<Vec<ReactionRecord>, MassBalanceError> {
    load_task_from_file(file_name).map(|(records, _)| records)
}

/// loads and validates analysis settings from a JSON file; missing fields take defaults
pub fn load_settings_from_file(file_name: &str) -> Result<AnalysisSettings, MassBalanceError> {
    let content = read_file(file_name)?;
    let settings: AnalysisSettings = parse_json(&content, file_name)?;
    settings.validate()?;
    info!("Loaded settings from '{}'", file_name);
    Ok(settings)
}

pub fn save_settings_to_file(
    settings: &AnalysisSettings,
    file_name: &str,
) -> Result<(), MassBalanceError> {
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(file_name, json)?;
    info!("Settings written to '{}'", file_name);
    Ok(())
}

pub fn save_result_to_file(result: &AnalysisResult, file_name: &str) -> Result<(), MassBalanceError> {
    fs::write(file_name, result.to_json()?)?;
    info!("Analysis result written to '{}'", file_name);
    Ok(())
}
