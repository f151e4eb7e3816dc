//! Optional interpretation of a measurement by a remote vision-language model.
//!
//! The model's reply is untrusted text. A reply that does not carry the
//! expected JSON object is still returned to the caller as free text.

pub mod client;

use std::io::Cursor;

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::buffer::PixelBuffer;
use crate::processing::color::ChannelMeans;

pub use client::{GenerationBackend, HttpBackend, analyze, spawn_analysis};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key configured for AI analysis")]
    MissingCredential,

    #[error("AI analysis timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("AI analysis was cancelled")]
    Cancelled,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },

    /// `response` is a truncated copy of what the endpoint returned.
    #[error("unexpected response shape: {reason}")]
    MalformedResponse {
        reason: String,
        response: Option<Value>,
    },

    #[error("failed to encode image for upload: {0}")]
    Encode(String),
}

/// Structured estimate the model is asked to return.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IntensityAssessment {
    /// Relative intensity on a 0-100 scale.
    pub intensity_score: f64,
    #[serde(default)]
    pub color_description: String,
    #[serde(default)]
    pub analysis_notes: String,
}

/// What came back from a successful round trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AiOutcome {
    Structured {
        assessment: IntensityAssessment,
        text: String,
    },
    FreeText {
        text: String,
        parse_error: String,
    },
}

impl AiOutcome {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Structured { text, .. } | Self::FreeText { text, .. } => text,
        }
    }
}

/// Input for one analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub means: ChannelMeans,
    /// JPEG bytes attached as inline data, if any.
    pub image_jpeg: Option<Vec<u8>>,
}

impl AnalysisRequest {
    #[must_use]
    pub const fn values_only(means: ChannelMeans) -> Self {
        Self {
            means,
            image_jpeg: None,
        }
    }

    /// Attach `buffer` re-encoded as JPEG.
    pub fn with_image(means: ChannelMeans, buffer: &PixelBuffer) -> Result<Self, AiError> {
        Ok(Self {
            means,
            image_jpeg: Some(encode_jpeg(buffer)?),
        })
    }
}

pub fn encode_jpeg(buffer: &PixelBuffer) -> Result<Vec<u8>, AiError> {
    let rgb = buffer.to_rgb_image().ok_or_else(|| {
        AiError::Encode(format!(
            "expected 3 channels, found {}",
            buffer.channels()
        ))
    })?;
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|err| AiError::Encode(err.to_string()))?;
    Ok(out.into_inner())
}

pub fn build_prompt(means: &ChannelMeans, with_image: bool) -> String {
    let subject = if with_image {
        "Analyze this fluorescence image used for fluoride detection."
    } else {
        "Analyze these fluorescence measurements used for fluoride detection."
    };
    format!(
        "{subject}\n\
         The extracted RGB values are R={:.1}, G={:.1}, B={:.1}.\n\
         Estimate the relative fluorescence intensity on a scale of 0-100,\n\
         and provide a short analytical comment in 2 sentences.\n\
         Reply with a JSON object with the keys \"intensity_score\" (number, 0-100),\n\
         \"color_description\" (string) and \"analysis_notes\" (string).",
        means.r, means.g, means.b
    )
}

// generateContent wire types

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Parsed reply, keeping the raw JSON for error reporting.
#[derive(Debug, Clone, Default)]
pub struct GenerateContentResponse {
    pub candidates: Vec<Candidate>,
    pub raw: Value,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Content,
}

impl GenerateContentRequest {
    pub fn from_request(request: &AnalysisRequest) -> Self {
        use base64::Engine;

        let mut parts = vec![Part::Text {
            text: build_prompt(&request.means, request.image_jpeg.is_some()),
        }];
        if let Some(jpeg) = &request.image_jpeg {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: "image/jpeg".to_string(),
                    data: base64::engine::general_purpose::STANDARD.encode(jpeg),
                },
            });
        }
        Self {
            contents: vec![Content { parts }],
        }
    }
}

impl GenerateContentResponse {
    pub fn from_value(raw: Value) -> Result<Self, AiError> {
        #[derive(Deserialize)]
        struct Wire {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }

        match Wire::deserialize(&raw) {
            Ok(wire) => Ok(Self {
                candidates: wire.candidates,
                raw,
            }),
            Err(err) => Err(AiError::MalformedResponse {
                reason: err.to_string(),
                response: Some(truncate_value(&raw)),
            }),
        }
    }

    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Result<&str, AiError> {
        let reason = match self.candidates.first().map(|c| c.content.parts.first()) {
            Some(Some(Part::Text { text })) => return Ok(text.as_str()),
            Some(Some(Part::InlineData { .. })) => "first part is not text",
            Some(None) => "candidate has no parts",
            None => "no candidates",
        };
        Err(AiError::MalformedResponse {
            reason: reason.to_string(),
            response: Some(truncate_value(&self.raw)),
        })
    }
}

const MAX_STRING_CHARS: usize = 256;
const MAX_ARRAY_ITEMS: usize = 8;

/// Copy of `value` with long strings and arrays cut short.
pub fn truncate_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > MAX_STRING_CHARS => {
            let mut cut: String = s.chars().take(MAX_STRING_CHARS).collect();
            cut.push_str("...");
            Value::String(cut)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .take(MAX_ARRAY_ITEMS)
                .map(truncate_value)
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Pull an [`IntensityAssessment`] out of free-form model output.
///
/// Accepts bare JSON, JSON inside a fenced block, or JSON surrounded by
/// prose (including prose with its own braces): the first `{` that starts a
/// valid assessment wins. The score is clamped to 0-100.
pub fn parse_assessment(text: &str) -> Result<IntensityAssessment, String> {
    let mut last_error = None;
    for (start, _) in text.match_indices('{') {
        let mut stream =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<IntensityAssessment>();
        match stream.next() {
            Some(Ok(mut assessment)) if assessment.intensity_score.is_finite() => {
                assessment.intensity_score = assessment.intensity_score.clamp(0.0, 100.0);
                return Ok(assessment);
            }
            Some(Ok(_)) => {
                last_error = Some("intensity_score is not a finite number".to_string());
            }
            Some(Err(err)) => {
                if last_error.is_none() {
                    last_error = Some(err.to_string());
                }
            }
            None => {}
        }
    }
    Err(last_error.unwrap_or_else(|| "no JSON object in response".to_string()))
}

/// Classify generated text; never fails.
pub fn interpret(text: &str) -> AiOutcome {
    match parse_assessment(text) {
        Ok(assessment) => AiOutcome::Structured {
            assessment,
            text: text.to_string(),
        },
        Err(parse_error) => AiOutcome::FreeText {
            text: text.to_string(),
            parse_error,
        },
    }
}
