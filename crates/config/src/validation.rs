use crate::ConfigResult;

/// Trait for configuration validation
pub trait ConfigValidator {
    fn validate(&self) -> ConfigResult<()>;
}

/// General validation utilities
pub struct ValidationUtils;

impl ValidationUtils {
    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field_name: &str) -> ConfigResult<()> {
        if value.trim().is_empty() {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} cannot be empty"
            )));
        }
        Ok(())
    }

    /// Validate that a timeout is reasonable
    pub fn validate_timeout_seconds(timeout_seconds: u64) -> ConfigResult<()> {
        if timeout_seconds == 0 {
            return Err(crate::ConfigError::Validation(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if timeout_seconds > 3600 {
            return Err(crate::ConfigError::Validation(
                "timeout_seconds must be less than or equal to 3600".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate that a count is within 1..=max
    pub fn validate_count(count: usize, field_name: &str, max: usize) -> ConfigResult<()> {
        if count == 0 {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be greater than 0"
            )));
        }
        if count > max {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be less than or equal to {max}"
            )));
        }
        Ok(())
    }

    pub fn validate_probability(value: f64, field_name: &str) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&value) {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must be between 0.0 and 1.0"
            )));
        }
        Ok(())
    }

    /// Validate that a URL parses and uses http or https
    pub fn validate_http_url(value: &str, field_name: &str) -> ConfigResult<()> {
        Self::validate_not_empty(value, field_name)?;
        let parsed = url::Url::parse(value)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(crate::ConfigError::Validation(format!(
                "{field_name} must use http or https"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_empty() {
        assert!(ValidationUtils::validate_not_empty("test", "field").is_ok());
        assert!(ValidationUtils::validate_not_empty("", "field").is_err());
        assert!(ValidationUtils::validate_not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_count() {
        assert!(ValidationUtils::validate_count(1, "test", 10).is_ok());
        assert!(ValidationUtils::validate_count(10, "test", 10).is_ok());
        assert!(ValidationUtils::validate_count(0, "test", 10).is_err());
        assert!(ValidationUtils::validate_count(11, "test", 10).is_err());
    }

    #[test]
    fn test_validate_probability() {
        assert!(ValidationUtils::validate_probability(0.0, "p").is_ok());
        assert!(ValidationUtils::validate_probability(0.3, "p").is_ok());
        assert!(ValidationUtils::validate_probability(1.0, "p").is_ok());
        assert!(ValidationUtils::validate_probability(-0.1, "p").is_err());
        assert!(ValidationUtils::validate_probability(1.5, "p").is_err());
    }

    #[test]
    fn test_validate_http_url() {
        assert!(ValidationUtils::validate_http_url("http://localhost:8080/hook", "url").is_ok());
        assert!(ValidationUtils::validate_http_url("https://example.com", "url").is_ok());
        assert!(ValidationUtils::validate_http_url("", "url").is_err());
        assert!(ValidationUtils::validate_http_url("localhost:8080", "url").is_err());
        assert!(ValidationUtils::validate_http_url("ftp://example.com", "url").is_err());
    }
}
