#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod MassBalance;
#[allow(non_snake_case)]
pub mod Utils;
pub mod settings;

use Examples::mass_balance_examples::mass_balance_examples;
use MassBalance::analysis::MassBalanceAnalyzer;
use MassBalance::errors::MassBalanceError;
use Utils::load_from_file::{load_task_from_file, save_result_to_file};
use log::error;
use settings::AnalysisSettings;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// analyses a model file and prints the result; with a second argument the result is saved as JSON
fn run_file(file_name: &str, output: Option<&str>) -> Result<bool, MassBalanceError> {
    let (records, settings) = load_task_from_file(file_name)?;
    let settings = settings.unwrap_or_default();
    init_logger(&settings);
    let analyzer = MassBalanceAnalyzer::new(settings)?;
    let result = analyzer.analyze_records(&records)?;
    result.pretty_print();
    if let Some(output) = output {
        save_result_to_file(&result, output)?;
    }
    Ok(result.is_consistent)
}

fn init_logger(settings: &AnalysisSettings) {
    let level = settings
        .log_level_filter()
        .unwrap_or(log::LevelFilter::Info);
    // a second call keeps the first logger
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

pub fn main() {
    let args: Vec<String> = std::env::args().collect();
    match args.get(1) {
        Some(file_name) => match run_file(file_name, args.get(2).map(String::as_str)) {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                error!("{}", e);
                eprintln!("{}", e);
                std::process::exit(2);
            }
        },
        None => {
            init_logger(&AnalysisSettings::default());
            let task: usize = 2;
            mass_balance_examples(task);
        }
    }
}
