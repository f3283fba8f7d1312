//! JSON persistence for [`DetectorConfig`].
//!
//! Missing fields take their defaults, so partial documents are accepted.
//! Values are stored as written; the detector sanitizes them when it is
//! built.

use std::path::Path;

use crate::core::types::DetectorConfig;
use crate::error::DetectorError;

/// Parses a configuration from a JSON document.
pub fn config_from_json(json: &str) -> Result<DetectorConfig, DetectorError> {
    serde_json::from_str(json)
        .map_err(|e| DetectorError::InvalidConfig(format!("failed to parse config: {}", e)))
}

/// Serializes a configuration as pretty-printed JSON.
pub fn config_to_json(config: &DetectorConfig) -> Result<String, DetectorError> {
    serde_json::to_string_pretty(config)
        .map_err(|e| DetectorError::InvalidConfig(format!("failed to serialize config: {}", e)))
}

/// Reads a configuration file.
pub fn load_config(path: impl AsRef<Path>) -> Result<DetectorConfig, DetectorError> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| {
        DetectorError::InvalidConfig(format!(
            "failed to parse config from {}: {}",
            path.display(),
            e
        ))
    })
}

/// Writes a configuration file.
pub fn save_config(path: impl AsRef<Path>, config: &DetectorConfig) -> Result<(), DetectorError> {
    let json = config_to_json(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::WindowType;

    #[test]
    fn test_partial_document_uses_defaults() {
        let config = config_from_json(r#"{ "hop_size": 512, "window_type": "hamming" }"#).unwrap();
        assert_eq!(config.hop_size, 512);
        assert_eq!(config.window_type, WindowType::Hamming);
        assert_eq!(config.window_size, DetectorConfig::default().window_size);
        assert_eq!(config.upper_scale, None);
    }

    #[test]
    fn test_json_round_trip() {
        let config = DetectorConfig::new()
            .with_window_size(2048)
            .with_threshold_scales(3.0, 0.75)
            .with_masking_decay(0.4);
        let json = config_to_json(&config).unwrap();
        assert_eq!(config_from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_malformed_document() {
        let err = config_from_json("{ window_size: ").unwrap_err();
        assert!(matches!(err, DetectorError::InvalidConfig(_)));
        assert!(config_from_json(r#"{ "window_type": "blackman" }"#).is_err());
    }
}
