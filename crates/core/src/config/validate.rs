use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Fetch batches and pages hold at least one card
/// - An enabled cache has a non-zero TTL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.fetcher.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "fetcher.batch_size must be at least 1".to_string(),
        ));
    }

    if config.job.page_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "job.page_capacity must be at least 1".to_string(),
        ));
    }

    if config.cache.enabled && config.cache.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.ttl_secs cannot be 0 while the cache is enabled".to_string(),
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
    fn test_validate_port_zero_fails() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_batch_size_fails() {
        let mut config = Config::default();
        config.fetcher.batch_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_validate_zero_page_capacity_fails() {
        let mut config = Config::default();
        config.job.page_capacity = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_ttl_only_matters_when_enabled() {
        let mut config = Config::default();
        config.cache.ttl_secs = 0;
        assert!(validate_config(&config).is_err());

        config.cache.enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
