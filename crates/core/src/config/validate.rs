use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Backend URL is set and uses http(s)
/// - Concurrency limit is at least 1
/// - Poll interval and liveness cadence are non-zero
/// - Byte limit, when set, is non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = config.backend.url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError(
            "backend.url cannot be empty".to_string(),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "backend.url must start with http:// or https://, got {}",
            url
        )));
    }

    if config.admission.concurrency_limit == 0 {
        return Err(ConfigError::ValidationError(
            "admission.concurrency_limit must be at least 1".to_string(),
        ));
    }

    if config.poll.interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "poll.interval_ms cannot be 0".to_string(),
        ));
    }

    if config.poll.liveness_every == 0 {
        return Err(ConfigError::ValidationError(
            "poll.liveness_every cannot be 0".to_string(),
        ));
    }

    if config.source.byte_limit == Some(0) {
        return Err(ConfigError::ValidationError(
            "source.byte_limit cannot be 0 (omit it to read whole files)".to_string(),
        ));
    }

    Ok(())
}
