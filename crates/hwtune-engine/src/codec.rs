//! Scale codecs
//!
//! Translate between the value a user edits and the raw text a control node
//! expects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed control value: {0:?}")]
pub struct CodecError(pub String);

/// Per-control encoding between user value and node text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScaleCodec {
    /// Node stores `value * factor` as an unsigned integer
    Linear { factor: i64 },
    /// Offset applied downward; stored verbatim, shown negated
    SignedOffset,
    /// Node stores the value as-is
    #[default]
    Identity,
}

impl ScaleCodec {
    /// Colour multipliers: the kernel field is unsigned, user values are
    /// halved to fit a signed 32-bit range
    pub const LINEAR_DOUBLE: ScaleCodec = ScaleCodec::Linear { factor: 2 };

    /// Raw node text for a user value
    pub fn encode(&self, value: i64) -> String {
        match self {
            ScaleCodec::Linear { factor } => value.saturating_mul(*factor).to_string(),
            ScaleCodec::SignedOffset | ScaleCodec::Identity => value.to_string(),
        }
    }

    /// User value for raw node text
    pub fn decode(&self, raw: &str) -> Result<i64, CodecError> {
        let trimmed = raw.trim();
        let parsed: i64 = trimmed
            .parse()
            .map_err(|_| CodecError(trimmed.to_string()))?;

        let value = match self {
            ScaleCodec::Linear { factor } => parsed / (*factor).max(1),
            // Some drivers echo the offset with its sign
            ScaleCodec::SignedOffset => parsed
                .checked_abs()
                .ok_or_else(|| CodecError(trimmed.to_string()))?,
            ScaleCodec::Identity => parsed,
        };
        Ok(value)
    }

    /// Text shown next to the control
    pub fn display(&self, value: i64, max: i64) -> String {
        match self {
            ScaleCodec::Linear { .. } => {
                format!("{:.3}", value as f64 / max.max(1) as f64)
            }
            ScaleCodec::SignedOffset => format!("-{}", value),
            ScaleCodec::Identity => value.to_string(),
        }
    }
}
