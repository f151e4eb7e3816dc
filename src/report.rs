//! Presentation of a finished analysis as text or JSON.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::ai::{AiError, AiOutcome};
use crate::processing::measure::Measurement;

/// State of the optional AI step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum AiSection {
    Skipped { reason: String },
    Complete { outcome: AiOutcome },
    Failed { error: String },
}

impl AiSection {
    pub fn from_result(result: Result<AiOutcome, AiError>) -> Self {
        match result {
            Ok(outcome) => Self::Complete { outcome },
            Err(err) => Self::Failed {
                error: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub source: Option<PathBuf>,
    pub measurement: Measurement,
    pub ai: AiSection,
}

impl Report {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let m = &self.measurement;
        let mut out = String::new();
        if let Some(path) = &self.source {
            let _ = writeln!(out, "Image: {}", path.display());
        }
        let r = &m.region;
        let _ = writeln!(
            out,
            "Region: x=[{}, {}) y=[{}, {}) ({} px)",
            r.x1, r.x2, r.y1, r.y2, m.pixel_count
        );
        let _ = writeln!(out, "Red (R)   {:.1}", m.means.r);
        let _ = writeln!(out, "Green (G) {:.1}", m.means.g);
        let _ = writeln!(out, "Blue (B)  {:.1}", m.means.b);
        let _ = writeln!(
            out,
            "Estimated Relative Intensity: {:.1} (0-255 scale)",
            m.intensity
        );

        match &self.ai {
            AiSection::Skipped { reason } => {
                let _ = writeln!(out, "AI analysis skipped: {reason}");
            }
            AiSection::Failed { error } => {
                let _ = writeln!(out, "AI analysis failed: {error}");
            }
            AiSection::Complete {
                outcome: AiOutcome::Structured { assessment, .. },
            } => {
                let _ = writeln!(
                    out,
                    "AI intensity score: {:.1} / 100",
                    assessment.intensity_score
                );
                if !assessment.color_description.is_empty() {
                    let _ = writeln!(out, "AI color: {}", assessment.color_description);
                }
                if !assessment.analysis_notes.is_empty() {
                    let _ = writeln!(out, "AI notes: {}", assessment.analysis_notes);
                }
            }
            AiSection::Complete {
                outcome: AiOutcome::FreeText { text, .. },
            } => {
                let _ = writeln!(out, "AI interpretation:\n{}", text.trim());
            }
        }
        out
    }
}
