//! Channel topic names
//!
//! The seven topics of the sensor channel contract. Names are configurable
//! through the daemon's TOML config but the defaults below ARE the external
//! contract; deployments should only override them when bridging to a
//! broker that namespaces topics differently.

use serde::{Deserialize, Serialize};

/// Topic names for the sensor channel (case-sensitive)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMap {
    /// Inbound session start/stop control signals
    #[serde(default = "default_control")]
    pub control: String,

    /// Inbound telemetry readings
    #[serde(default = "default_telemetry")]
    pub telemetry: String,

    /// Outbound averaged nitrogen
    #[serde(default = "default_nitrogen")]
    pub nitrogen: String,

    /// Outbound averaged phosphorus
    #[serde(default = "default_phosphorus")]
    pub phosphorus: String,

    /// Outbound averaged potassium
    #[serde(default = "default_potassium")]
    pub potassium: String,

    /// Outbound averaged pH
    #[serde(default = "default_ph")]
    pub ph: String,

    /// Outbound crop recommendation label
    #[serde(default = "default_prediction")]
    pub prediction: String,
}

fn default_control() -> String {
    "sensor/state".to_string()
}

fn default_telemetry() -> String {
    "sensor/tanah".to_string()
}

fn default_nitrogen() -> String {
    "sensor/N".to_string()
}

fn default_phosphorus() -> String {
    "sensor/P".to_string()
}

fn default_potassium() -> String {
    "sensor/K".to_string()
}

fn default_ph() -> String {
    "sensor/PH".to_string()
}

fn default_prediction() -> String {
    "sensor/prediksi".to_string()
}

impl Default for TopicMap {
    fn default() -> Self {
        Self {
            control: default_control(),
            telemetry: default_telemetry(),
            nitrogen: default_nitrogen(),
            phosphorus: default_phosphorus(),
            potassium: default_potassium(),
            ph: default_ph(),
            prediction: default_prediction(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topics_match_channel_contract() {
        let topics = TopicMap::default();
        assert_eq!(topics.control, "sensor/state");
        assert_eq!(topics.telemetry, "sensor/tanah");
        assert_eq!(topics.nitrogen, "sensor/N");
        assert_eq!(topics.phosphorus, "sensor/P");
        assert_eq!(topics.potassium, "sensor/K");
        assert_eq!(topics.ph, "sensor/PH");
        assert_eq!(topics.prediction, "sensor/prediksi");
    }

    #[test]
    fn test_partial_override_keeps_remaining_defaults() {
        let topics: TopicMap =
            serde_json::from_str(r#"{"control": "farm7/state"}"#).unwrap();
        assert_eq!(topics.control, "farm7/state");
        assert_eq!(topics.telemetry, "sensor/tanah");
        assert_eq!(topics.prediction, "sensor/prediksi");
    }
}
