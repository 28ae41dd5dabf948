//! crates/incident_core/src/enrichment.rs
//!
//! The outcome of a best-effort AI call.

use crate::ports::PortResult;

pub const DESCRIPTION_UNAVAILABLE: &str = "AI description is unavailable.";
pub const ADVICE_UNAVAILABLE: &str = "AI advice is unavailable.";

/// Text produced by the AI, or the placeholder shown when the call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    Generated(String),
    Degraded {
        placeholder: &'static str,
        reason: String,
    },
}

impl Enrichment {
    pub fn from_result(result: PortResult<String>, placeholder: &'static str) -> Self {
        match result {
            Ok(text) => Enrichment::Generated(text),
            Err(e) => Enrichment::Degraded {
                placeholder,
                reason: e.to_string(),
            },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Enrichment::Degraded { .. })
    }

    /// The text a user gets to see.
    pub fn text(&self) -> &str {
        match self {
            Enrichment::Generated(text) => text,
            Enrichment::Degraded { placeholder, .. } => placeholder,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Enrichment::Generated(text) => text,
            Enrichment::Degraded { placeholder, .. } => placeholder.to_string(),
        }
    }
}
