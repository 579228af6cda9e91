pub mod cli;
pub mod config;
pub mod identifiers;
pub mod logger;
pub mod protocol;

pub use identifiers::*;
