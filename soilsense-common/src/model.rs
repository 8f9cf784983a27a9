//! Soil telemetry data model and wire-format parsing
//!
//! Defines the four-field soil reading (the feature vector flowing through
//! the whole pipeline) and the session control signal, each with explicit
//! parse functions for their channel wire form. Parsing returns `Result`
//! so callers decide what to do with malformed payloads; nothing here
//! panics on bad input.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single soil sensor reading: pH, Nitrogen, Phosphorus, Potassium.
///
/// Wire form is a UTF-8 JSON object with keys `PH`, `N`, `P`, `K`.
/// A missing key defaults to `0.0` (source-of-truth sensor firmware omits
/// channels it cannot measure). A present but non-numeric value fails the
/// parse and the whole message is rejected.
///
/// Immutable once constructed; values are taken as-is with no range
/// validation (the classifier's scaling step owns normalization).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    /// Soil acidity (pH scale)
    #[serde(rename = "PH", default)]
    pub ph: f64,

    /// Nitrogen content (mg/kg)
    #[serde(rename = "N", default)]
    pub nitrogen: f64,

    /// Phosphorus content (mg/kg)
    #[serde(rename = "P", default)]
    pub phosphorus: f64,

    /// Potassium content (mg/kg)
    #[serde(rename = "K", default)]
    pub potassium: f64,
}

impl SoilReading {
    /// Construct a reading from explicit field values (pH, N, P, K order)
    pub fn new(ph: f64, nitrogen: f64, phosphorus: f64, potassium: f64) -> Self {
        Self {
            ph,
            nitrogen,
            phosphorus,
            potassium,
        }
    }

    /// Parse a reading from its channel wire form (UTF-8 JSON bytes)
    ///
    /// Missing keys default to 0.0; non-numeric values, invalid JSON, or
    /// invalid UTF-8 return `Error::TelemetryParse`. Unknown keys are
    /// ignored.
    pub fn from_wire(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Element-wise arithmetic mean of a set of readings
    ///
    /// Returns `None` for an empty slice; the mean is undefined there and
    /// callers are expected to guard (an empty session is a defined no-op,
    /// not an error).
    pub fn mean(readings: &[SoilReading]) -> Option<SoilReading> {
        if readings.is_empty() {
            return None;
        }
        let n = readings.len() as f64;
        let mut sum = SoilReading::new(0.0, 0.0, 0.0, 0.0);
        for r in readings {
            sum.ph += r.ph;
            sum.nitrogen += r.nitrogen;
            sum.phosphorus += r.phosphorus;
            sum.potassium += r.potassium;
        }
        Some(SoilReading::new(
            sum.ph / n,
            sum.nitrogen / n,
            sum.phosphorus / n,
            sum.potassium / n,
        ))
    }
}

/// Session control signal carried on the control topic
///
/// Wire form is a UTF-8 integer: `"1"` starts a session, `"0"` stops it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionControl {
    /// Begin a collection session (clears any buffered readings)
    Start,
    /// End the current session and trigger aggregation
    Stop,
}

impl SessionControl {
    /// Parse a control signal from its channel wire form
    ///
    /// Leading/trailing whitespace is tolerated. Integers other than 0 and 1
    /// are recognized as integers but rejected as unknown control values;
    /// non-integer payloads are rejected outright. Both cases return
    /// `Error::ControlParse`.
    pub fn from_wire(payload: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| Error::ControlParse(format!("payload is not UTF-8: {}", e)))?;
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|e| Error::ControlParse(format!("payload {:?} is not an integer: {}", text, e)))?;
        match value {
            1 => Ok(SessionControl::Start),
            0 => Ok(SessionControl::Stop),
            other => Err(Error::ControlParse(format!(
                "unrecognized control value: {}",
                other
            ))),
        }
    }
}
