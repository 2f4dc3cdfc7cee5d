/// runnable demonstrations of the mass-balance analysis
pub mod mass_balance_examples;
