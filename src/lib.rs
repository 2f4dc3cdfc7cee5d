#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod MassBalance;
#[allow(non_snake_case)]
pub mod Utils;
pub mod settings;
