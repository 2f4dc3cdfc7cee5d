/// loading reaction records and settings from JSON files, saving analysis results
pub mod load_from_file;
