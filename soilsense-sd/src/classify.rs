//! Classifier port and reference profile model
//!
//! The session pipeline consumes classification through the `Recommender`
//! trait: a scaling transform fit elsewhere, then a discrete label. The
//! label vocabulary is owned by whatever model sits behind the trait.
//!
//! `ProfileModel` is the reference implementation: per-feature standard
//! score scaling plus nearest-centroid matching over a table of labeled
//! crop profiles. The table is loadable from a TOML artifact; a built-in
//! table ships in the binary for zero-config startup.
//!
//! Feature order is fixed everywhere: pH, N, P, K.

use crate::error::{Error, Result};
use serde::Deserialize;
use soilsense_common::SoilReading;
use std::path::Path;

/// Built-in crop profile table and scaler parameters
const DEFAULT_MODEL: &str = include_str!("default_model.toml");

/// Classification capability consumed by the session service
///
/// `scale` applies the transform the model was trained with; `classify`
/// maps the scaled reading to a label. Callers always invoke them in that
/// order. Either step may fail; a failure aborts the current aggregation
/// and nothing is published for that session.
pub trait Recommender: Send + Sync {
    /// Apply the model's scaling transform to a raw averaged reading
    fn scale(&self, reading: SoilReading) -> Result<SoilReading>;

    /// Map a scaled reading to a recommendation label
    fn classify(&self, scaled: SoilReading) -> Result<String>;
}

/// Standard-score scaling parameters, one entry per feature (pH, N, P, K)
#[derive(Debug, Clone, Deserialize)]
pub struct Scaler {
    pub mean: [f64; 4],
    pub std_dev: [f64; 4],
}

/// One labeled crop profile
///
/// The artifact stores centroids in raw units; `ProfileModel::new` scales
/// them once at load time so classification compares in scaled space.
#[derive(Debug, Clone, Deserialize)]
pub struct CropProfile {
    pub label: String,
    pub centroid: [f64; 4],
}

/// On-disk artifact layout
#[derive(Debug, Deserialize)]
struct ModelArtifact {
    scaler: Scaler,
    profiles: Vec<CropProfile>,
}

/// Nearest-centroid crop recommender
#[derive(Debug)]
pub struct ProfileModel {
    scaler: Scaler,
    /// Profiles with centroids already in scaled space
    profiles: Vec<CropProfile>,
}

impl ProfileModel {
    /// Build a model from scaler parameters and raw-unit profiles
    ///
    /// Validates that the profile table is non-empty and every standard
    /// deviation is positive, then pre-scales the centroids.
    pub fn new(scaler: Scaler, profiles: Vec<CropProfile>) -> Result<Self> {
        if profiles.is_empty() {
            return Err(Error::Model("profile table is empty".to_string()));
        }
        if scaler.std_dev.iter().any(|s| *s <= 0.0 || !s.is_finite()) {
            return Err(Error::Model(
                "scaler standard deviations must be positive and finite".to_string(),
            ));
        }

        let profiles = profiles
            .into_iter()
            .map(|p| CropProfile {
                centroid: scale_features(&scaler, p.centroid),
                label: p.label,
            })
            .collect();

        Ok(Self { scaler, profiles })
    }

    /// Parse a model from TOML artifact text
    pub fn from_toml(content: &str) -> Result<Self> {
        let artifact: ModelArtifact = toml::from_str(content)
            .map_err(|e| Error::Model(format!("invalid artifact: {}", e)))?;
        Self::new(artifact.scaler, artifact.profiles)
    }

    /// Load a model from a TOML artifact file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Model(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// The built-in profile table compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml(DEFAULT_MODEL)
    }

    /// Number of crop profiles in the table
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }
}

impl Recommender for ProfileModel {
    fn scale(&self, reading: SoilReading) -> Result<SoilReading> {
        let scaled = scale_features(&self.scaler, to_features(reading));
        Ok(from_features(scaled))
    }

    fn classify(&self, scaled: SoilReading) -> Result<String> {
        let features = to_features(scaled);
        let mut best: Option<(&CropProfile, f64)> = None;

        for profile in &self.profiles {
            let distance = squared_distance(&features, &profile.centroid);
            if !distance.is_finite() {
                return Err(Error::Classification(format!(
                    "non-finite distance to profile {:?}",
                    profile.label
                )));
            }
            // Ties keep the earlier profile (table order)
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((profile, distance)),
            }
        }

        best.map(|(profile, _)| profile.label.clone())
            .ok_or_else(|| Error::Classification("no profiles available".to_string()))
    }
}

fn to_features(reading: SoilReading) -> [f64; 4] {
    [
        reading.ph,
        reading.nitrogen,
        reading.phosphorus,
        reading.potassium,
    ]
}

fn from_features(features: [f64; 4]) -> SoilReading {
    SoilReading::new(features[0], features[1], features[2], features[3])
}

fn scale_features(scaler: &Scaler, features: [f64; 4]) -> [f64; 4] {
    let mut scaled = [0.0; 4];
    for (i, value) in features.iter().enumerate() {
        scaled[i] = (value - scaler.mean[i]) / scaler.std_dev[i];
    }
    scaled
}

fn squared_distance(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}
