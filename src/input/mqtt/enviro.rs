//! Pimoroni Enviro Indoor payload decoding.
//!
//! The board publishes one JSON document per sample:
//!
//! ```json
//! {
//!   "readings": {"temperature": 21.5, "humidity": 48, "luminance": 0, ...},
//!   "nickname": "enviro-indoor",
//!   "model": "indoor",
//!   "uid": "e6614104034b3a2c",
//!   "timestamp": "2022-09-04 15:06:35"
//! }
//! ```
//!
//! Temperature, humidity, luminance and uid are required. A payload missing
//! any of them is rejected instead of caching zeros.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Sensor values of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnviroReadings {
    /// Temperature (°C)
    pub temperature: f64,

    /// Relative humidity (%)
    pub humidity: f64,

    /// Illuminance (lux)
    pub luminance: f64,

    /// Barometric pressure (hPa)
    #[serde(default)]
    pub pressure: Option<f64>,

    /// Supply voltage (V)
    #[serde(default)]
    pub voltage: Option<f64>,

    /// Colour temperature (K)
    #[serde(default)]
    pub color_temperature: Option<f64>,

    /// BME688 gas resistance (Ω)
    #[serde(default)]
    pub gas_resistance: Option<f64>,

    /// Air quality index
    #[serde(default)]
    pub aqi: Option<f64>,
}

/// One decoded message from the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnviroReading {
    pub readings: EnviroReadings,

    /// Board identifier, used as the accessory serial number
    pub uid: String,

    #[serde(default)]
    pub nickname: Option<String>,

    #[serde(default)]
    pub model: Option<String>,

    /// Board-local sample time, kept verbatim
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Decode a raw MQTT payload.
pub fn decode(payload: &[u8]) -> Result<EnviroReading, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "readings": {
            "pressure": 1008.31,
            "temperature": 21.5,
            "voltage": 4.954,
            "color_temperature": 3521,
            "gas_resistance": 52634,
            "aqi": 37.2,
            "humidity": 48,
            "luminance": 0
        },
        "nickname": "enviro-indoor",
        "model": "indoor",
        "uid": "ABC123",
        "timestamp": "2022-09-04 15:06:35"
    }"#;

    #[test]
    fn test_decode_full_payload() {
        let reading = decode(SAMPLE.as_bytes()).unwrap();
        assert_eq!(reading.readings.temperature, 21.5);
        assert_eq!(reading.readings.humidity, 48.0);
        assert_eq!(reading.readings.luminance, 0.0);
        assert_eq!(reading.readings.pressure, Some(1008.31));
        assert_eq!(reading.readings.aqi, Some(37.2));
        assert_eq!(reading.uid, "ABC123");
        assert_eq!(reading.nickname.as_deref(), Some("enviro-indoor"));
        assert_eq!(reading.timestamp.as_deref(), Some("2022-09-04 15:06:35"));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let payload = r#"{
            "readings": {"temperature": 19.0, "humidity": 40.5, "luminance": 12, "noise": 3},
            "uid": "X",
            "firmware": "v0.0.9"
        }"#;
        let reading = decode(payload.as_bytes()).unwrap();
        assert_eq!(reading.readings.luminance, 12.0);
        assert_eq!(reading.readings.pressure, None);
        assert_eq!(reading.model, None);
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = decode(b"not json at all").unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let err = decode(&[0xff, 0xfe, 0x7b]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8(_)));
    }

    #[test]
    fn test_decode_rejects_missing_required_reading() {
        let payload = r#"{"readings": {"temperature": 21.5, "humidity": 48}, "uid": "X"}"#;
        assert!(matches!(
            decode(payload.as_bytes()),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_missing_uid() {
        let payload = r#"{"readings": {"temperature": 21.5, "humidity": 48, "luminance": 3}}"#;
        assert!(decode(payload.as_bytes()).is_err());
    }
}
