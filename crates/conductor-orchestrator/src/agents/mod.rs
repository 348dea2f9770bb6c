//! Built-in specialist implementations.
//!
//! The scripted specialist produces deterministic, stage-appropriate output
//! and can be told to fail, stall or report failure. It backs the demo binary
//! and the tests.

pub mod scripted;

use std::sync::Arc;

use conductor_abstraction::Stage;

pub use scripted::ScriptedSpecialist;

use crate::coordinator::Specialists;

/// A full set of scripted specialists with default behavior.
pub fn scripted_specialists() -> Specialists {
    scripted_specialists_with(ScriptedSpecialist::new)
}

/// A full set of scripted specialists, each built by `build`.
pub fn scripted_specialists_with<F>(mut build: F) -> Specialists
where
    F: FnMut(Stage) -> ScriptedSpecialist,
{
    Specialists::new(
        Arc::new(build(Stage::Content)),
        Arc::new(build(Stage::Design)),
        Arc::new(build(Stage::Quality)),
        Arc::new(build(Stage::Delivery)),
    )
}
