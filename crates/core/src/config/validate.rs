use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Backend URL is an http(s) URL
/// - Backend timeout is not 0
/// - Oversampling is at least 1
/// - Page dimensions are positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = config.backend.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "backend.url must start with http:// or https://, got '{}'",
            config.backend.url
        )));
    }

    if config.backend.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "backend.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.render.oversample == 0 {
        return Err(ConfigError::ValidationError(
            "render.oversample cannot be 0".to_string(),
        ));
    }

    let page_ok = |v: f64| v.is_finite() && v > 0.0;
    if !page_ok(config.render.page_width_mm) || !page_ok(config.render.page_height_mm) {
        return Err(ConfigError::ValidationError(
            "render page dimensions must be positive".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendConfig, BillingConfig, RenderConfig, TermConfig};

    fn config() -> Config {
        Config {
            backend: BackendConfig::new("http://localhost:8000"),
            term: TermConfig::default(),
            billing: BillingConfig::default(),
            render: RenderConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn test_validate_bad_url_fails() {
        let mut config = config();
        config.backend.url = "localhost:8000".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = config();
        config.backend.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_page_geometry() {
        let mut config = config();
        config.render.oversample = 0;
        assert!(validate_config(&config).is_err());

        let mut config = self::config();
        config.render.page_height_mm = -1.0;
        assert!(validate_config(&config).is_err());
    }
}
