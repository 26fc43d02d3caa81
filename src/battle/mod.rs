pub mod calculators;
pub mod commands;
pub mod engine;
pub mod movement;
pub mod state;
pub mod targeting;

#[cfg(test)]
mod tests;
