//! Command implementations for the Conductor CLI.

pub mod capabilities;
pub mod run;
