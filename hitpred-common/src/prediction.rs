//! Prediction request and response types
//!
//! Shared by the HTTP endpoint and the form UI so both speak exactly the
//! same JSON.

use crate::features::Record;
use crate::pipeline::HitPipeline;
use crate::Result;
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One track to score
///
/// Same schema as a training row minus identifiers, label and release
/// metadata. Every field is required. Integer fields also accept a
/// whole-valued float (`5.0`, `5e4`) but not a fractional one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongFeatures {
    pub danceability: f64,
    pub energy: f64,
    #[serde(deserialize_with = "whole_number")]
    pub key: i64,
    pub loudness: f64,
    #[serde(deserialize_with = "whole_number")]
    pub mode: i64,
    pub instrumentalness: f64,
    pub tempo: f64,
    #[serde(deserialize_with = "whole_number")]
    pub stream_count: i64,
    #[serde(deserialize_with = "whole_number")]
    pub explicit: i64,
    pub genre: String,
    pub country: String,
    pub label: String,
    #[serde(deserialize_with = "whole_number")]
    pub duration_ms: i64,
}

/// Integer from a JSON integer or a float with no fractional part
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct WholeNumber;

    impl<'de> Visitor<'de> for WholeNumber {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<i64, E> {
            // i64::MAX is not representable as f64; the cast rounds up to 2^63
            let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
            if v.is_finite() && v.fract() == 0.0 && in_range {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(Unexpected::Float(v), &self))
            }
        }
    }

    deserializer.deserialize_any(WholeNumber)
}

impl SongFeatures {
    /// Every request field, numeric ones first
    pub const FIELD_NAMES: [&'static str; 13] = [
        "danceability",
        "energy",
        "key",
        "loudness",
        "mode",
        "instrumentalness",
        "tempo",
        "stream_count",
        "explicit",
        "duration_ms",
        "genre",
        "country",
        "label",
    ];

    /// Name-addressed view fed to the pipeline
    pub fn to_record(&self) -> Record {
        Record::new()
            .with_number("danceability", self.danceability)
            .with_number("energy", self.energy)
            .with_number("key", self.key as f64)
            .with_number("loudness", self.loudness)
            .with_number("mode", self.mode as f64)
            .with_number("instrumentalness", self.instrumentalness)
            .with_number("tempo", self.tempo)
            .with_number("stream_count", self.stream_count as f64)
            .with_number("explicit", self.explicit as f64)
            .with_number("duration_ms", self.duration_ms as f64)
            .with_text("genre", self.genre.as_str())
            .with_text("country", self.country.as_str())
            .with_text("label", self.label.as_str())
    }
}

/// Human-readable verdict derived from the label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    #[serde(rename = "Potential Hit")]
    PotentialHit,
    #[serde(rename = "Niche Track")]
    NicheTrack,
}

impl PredictionStatus {
    pub fn from_label(is_popular: u8) -> Self {
        if is_popular == 1 {
            Self::PotentialHit
        } else {
            Self::NicheTrack
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PotentialHit => "Potential Hit",
            Self::NicheTrack => "Niche Track",
        }
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prediction response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 for a predicted hit, else 0
    pub is_popular: u8,
    /// Positive-class probability in [0, 1]
    pub hit_probability: f64,
    pub status: PredictionStatus,
}

impl Prediction {
    pub fn new(is_popular: u8, hit_probability: f64) -> Self {
        Self {
            is_popular,
            hit_probability,
            status: PredictionStatus::from_label(is_popular),
        }
    }
}

/// Score one track with the loaded pipeline
pub fn predict_song(pipeline: &HitPipeline, song: &SongFeatures) -> Result<Prediction> {
    let (is_popular, hit_probability) = pipeline.classify(&song.to_record())?;
    Ok(Prediction::new(is_popular, hit_probability))
}
