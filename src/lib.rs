pub mod app;
pub mod cli;
pub mod config;
pub mod model;
pub mod output;
pub mod service;
pub mod session;

pub use model::{BatchSummary, ValidationResult};
pub use session::{Notice, Outcome, Session};

#[cfg(test)]
mod tests;
