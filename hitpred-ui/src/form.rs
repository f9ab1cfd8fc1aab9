//! The track form and its translation into a prediction request

use hitpred_common::SongFeatures;
use serde::{Deserialize, Serialize};

pub const GENRES: [&str; 7] = ["Pop", "Rock", "Hip-Hop", "Jazz", "Metal", "Indie", "Reggaeton"];
pub const COUNTRIES: [&str; 7] = ["US", "UK", "Canada", "Germany", "Brazil", "France", "Mexico"];
pub const LABELS: [&str; 5] = [
    "Universal Music",
    "Sony Music",
    "Warner Music",
    "Indie",
    "Island Records",
];

/// Request fields the form does not expose
pub const FIXED_KEY: i64 = 5;
pub const FIXED_MODE: i64 = 1;
pub const FIXED_INSTRUMENTALNESS: f64 = 0.01;

pub const LOUDNESS_RANGE: (f64, f64) = (-60.0, 0.0);

/// Values posted by the analyze form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackForm {
    pub genre: String,
    pub country: String,
    pub label: String,
    pub duration_ms: i64,
    pub stream_count: i64,
    pub danceability: f64,
    pub energy: f64,
    pub loudness: f64,
    pub tempo: f64,
    pub explicit: i64,
}

impl Default for TrackForm {
    fn default() -> Self {
        Self {
            genre: GENRES[0].to_string(),
            country: COUNTRIES[0].to_string(),
            label: LABELS[0].to_string(),
            duration_ms: 200_000,
            stream_count: 50_000,
            danceability: 0.5,
            energy: 0.5,
            loudness: -10.0,
            tempo: 120.0,
            explicit: 0,
        }
    }
}

impl TrackForm {
    /// Check the bounds the form widgets enforce in the browser
    pub fn validate(&self) -> Result<(), String> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(format!("{} must be between 0 and 1, got {}", name, value))
            }
        };
        unit("Danceability", self.danceability)?;
        unit("Energy", self.energy)?;

        let (quietest, loudest) = LOUDNESS_RANGE;
        if !(quietest..=loudest).contains(&self.loudness) {
            return Err(format!(
                "Loudness must be between {} and {} dB, got {}",
                quietest, loudest, self.loudness
            ));
        }
        if !self.tempo.is_finite() || self.tempo < 0.0 {
            return Err(format!("Tempo must be a non-negative number, got {}", self.tempo));
        }
        if self.duration_ms < 0 {
            return Err(format!("Duration must not be negative, got {}", self.duration_ms));
        }
        if self.stream_count < 0 {
            return Err(format!("Streams must not be negative, got {}", self.stream_count));
        }
        if self.explicit != 0 && self.explicit != 1 {
            return Err(format!("Explicit must be 0 or 1, got {}", self.explicit));
        }
        Ok(())
    }

    /// Full prediction request, with the fixed fields filled in
    pub fn to_song(&self) -> SongFeatures {
        SongFeatures {
            danceability: self.danceability,
            energy: self.energy,
            key: FIXED_KEY,
            loudness: self.loudness,
            mode: FIXED_MODE,
            instrumentalness: FIXED_INSTRUMENTALNESS,
            tempo: self.tempo,
            stream_count: self.stream_count,
            explicit: self.explicit,
            genre: self.genre.clone(),
            country: self.country.clone(),
            label: self.label.clone(),
            duration_ms: self.duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(TrackForm::default().validate(), Ok(()));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut form = TrackForm::default();
        form.danceability = 1.5;
        assert!(form.validate().unwrap_err().contains("Danceability"));

        let mut form = TrackForm::default();
        form.loudness = 3.0;
        assert!(form.validate().unwrap_err().contains("Loudness"));

        let mut form = TrackForm::default();
        form.explicit = 2;
        assert!(form.validate().is_err());

        let mut form = TrackForm::default();
        form.tempo = f64::NAN;
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_song_carries_fixed_fields() {
        let form = TrackForm {
            genre: "Jazz".to_string(),
            danceability: 0.8,
            ..TrackForm::default()
        };
        let song = form.to_song();

        assert_eq!(song.key, 5);
        assert_eq!(song.mode, 1);
        assert_eq!(song.instrumentalness, 0.01);
        assert_eq!(song.genre, "Jazz");
        assert_eq!(song.danceability, 0.8);
        assert_eq!(song.duration_ms, 200_000);
    }
}
