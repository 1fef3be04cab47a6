use super::{types::Config, ConfigError};

/// Highest CRF accepted by x264/x265.
const MAX_CRF: u8 = 51;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.renderer.refresh_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "renderer.refresh_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.defaults.crf > MAX_CRF {
        return Err(ConfigError::ValidationError(format!(
            "defaults.crf must be at most {}, got {}",
            MAX_CRF, config.defaults.crf
        )));
    }

    if config.defaults.audio_bitrate_kbps == 0 {
        return Err(ConfigError::ValidationError(
            "defaults.audio_bitrate_kbps cannot be 0".to_string(),
        ));
    }

    if config.defaults.target_extension.trim_start_matches('.').is_empty() {
        return Err(ConfigError::ValidationError(
            "defaults.target_extension cannot be empty".to_string(),
        ));
    }

    if config.converter.error_tail_lines == 0 {
        return Err(ConfigError::ValidationError(
            "converter.error_tail_lines cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_zero_refresh_fails() {
        let mut config = Config::default();
        config.renderer.refresh_interval_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_crf_out_of_range_fails() {
        let mut config = Config::default();
        config.defaults.crf = 60;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_extension_fails() {
        let mut config = Config::default();
        config.defaults.target_extension = ".".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_tail_fails() {
        let mut config = Config::default();
        config.converter.error_tail_lines = 0;
        assert!(validate_config(&config).is_err());
    }
}
