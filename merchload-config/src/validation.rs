//! Configuration validation traits and utilities

use crate::error::{ConfigError, ConfigResult};
use std::time::Duration;

/// Trait for validatable configuration
pub trait Validatable {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;

    /// Get the domain name for error reporting
    fn domain_name(&self) -> &'static str;

    /// Helper to create a domain-specific validation error
    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::DomainError {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }
}

/// Validate a required string field
pub fn validate_required_string(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} cannot be empty", field_name),
        });
    }
    Ok(())
}

/// Validate a positive number
pub fn validate_positive<T>(value: T, field_name: &str, domain: &str) -> ConfigResult<()>
where
    T: PartialOrd + Default + std::fmt::Display,
{
    if value <= T::default() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0, got {}", field_name, value),
        });
    }
    Ok(())
}

/// Validate a duration is not zero
pub fn validate_non_zero_duration(value: Duration, field_name: &str, domain: &str) -> ConfigResult<()> {
    if value.is_zero() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must be greater than 0", field_name),
        });
    }
    Ok(())
}

/// Validate an http(s) URL
pub fn validate_http_url(url: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    validate_required_string(url, field_name, domain)?;

    let parsed = url::Url::parse(url).map_err(|e| ConfigError::DomainError {
        domain: domain.to_string(),
        message: format!("{} has invalid URL format: {}", field_name, e),
    })?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ConfigError::DomainError {
                domain: domain.to_string(),
                message: format!("{} scheme '{}' not supported (only http/https)", field_name, scheme),
            })
        }
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} must have a valid host", field_name),
        });
    }

    if parsed.query().is_some() || parsed.fragment().is_some() {
        log::warn!("{} '{}' carries a query or fragment that request paths will be appended after", field_name, url);
    }

    Ok(())
}

/// Validate a value can be used as a single URL path segment
pub fn validate_path_segment(value: &str, field_name: &str, domain: &str) -> ConfigResult<()> {
    validate_required_string(value, field_name, domain)?;

    if value.contains(['/', '?', '#']) {
        return Err(ConfigError::DomainError {
            domain: domain.to_string(),
            message: format!("{} '{}' must not contain '/', '?' or '#'", field_name, value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("http://localhost:8080", "base_url", "scenario").is_ok());
        assert!(validate_http_url("https://shop.example.com", "base_url", "scenario").is_ok());
        assert!(validate_http_url("", "base_url", "scenario").is_err());
        assert!(validate_http_url("not-a-url", "base_url", "scenario").is_err());
        assert!(validate_http_url("ftp://localhost", "base_url", "scenario").is_err());
    }

    #[test]
    fn test_validate_path_segment() {
        assert!(validate_path_segment("pink-hoody", "items", "scenario").is_ok());
        assert!(validate_path_segment("a/b", "items", "scenario").is_err());
        assert!(validate_path_segment("  ", "items", "scenario").is_err());
    }

    #[test]
    fn test_validate_non_zero_duration() {
        assert!(validate_non_zero_duration(Duration::from_millis(1), "tick", "runtime").is_ok());
        assert!(validate_non_zero_duration(Duration::ZERO, "tick", "runtime").is_err());
    }
}
