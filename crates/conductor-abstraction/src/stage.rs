//! Pipeline stages and the transitions between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One of the four ordered pipeline steps.
///
/// The derived ordering is the execution order: `Content < Design < Quality < Delivery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Copy and messaging production.
    Content,
    /// Visual design and layout.
    Design,
    /// Review, scoring and compliance.
    Quality,
    /// Packaging and deployment.
    Delivery,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Stage::Content, Stage::Design, Stage::Quality, Stage::Delivery];

    /// Returns the stable lowercase name used in logs, records and config files.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Content => "content",
            Stage::Design => "design",
            Stage::Quality => "quality",
            Stage::Delivery => "delivery",
        }
    }

    /// Position of the stage in the pipeline, starting at 0.
    pub fn index(self) -> usize {
        match self {
            Stage::Content => 0,
            Stage::Design => 1,
            Stage::Quality => 2,
            Stage::Delivery => 3,
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(self) -> Option<Stage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// The handoff transition leaving this stage. Delivery has none.
    pub fn outgoing_transition(self) -> Option<Transition> {
        match self {
            Stage::Content => Some(Transition::ContentToDesign),
            Stage::Design => Some(Transition::DesignToQuality),
            Stage::Quality => Some(Transition::QualityToDelivery),
            Stage::Delivery => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown stage '{0}' (expected content, design, quality or delivery)")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "content" => Ok(Stage::Content),
            "design" => Ok(Stage::Design),
            "quality" => Ok(Stage::Quality),
            "delivery" => Ok(Stage::Delivery),
            _ => Err(UnknownStage(s.to_string())),
        }
    }
}

/// A handoff between two adjacent stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Content hands its package to Design.
    ContentToDesign,
    /// Design hands its package to Quality.
    DesignToQuality,
    /// Quality hands its verdict to Delivery.
    QualityToDelivery,
}

impl Transition {
    /// Returns the transition name, e.g. `content_to_design`.
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::ContentToDesign => "content_to_design",
            Transition::DesignToQuality => "design_to_quality",
            Transition::QualityToDelivery => "quality_to_delivery",
        }
    }

    /// The stage producing the payload.
    pub fn from_stage(self) -> Stage {
        match self {
            Transition::ContentToDesign => Stage::Content,
            Transition::DesignToQuality => Stage::Design,
            Transition::QualityToDelivery => Stage::Quality,
        }
    }

    /// The stage consuming the payload.
    pub fn to_stage(self) -> Stage {
        match self {
            Transition::ContentToDesign => Stage::Design,
            Transition::DesignToQuality => Stage::Quality,
            Transition::QualityToDelivery => Stage::Delivery,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
