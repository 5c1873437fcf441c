//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// The first error as a [`ConfigError`], if any.
    pub fn into_error(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(ConfigError::InvalidValue {
                field: error.path,
                message: error.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_poll(config, &mut result);
        Self::validate_resolver(config, &mut result);
        Self::validate_storage(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_poll(config: &Config, result: &mut ValidationResult) {
        if config.poll.interval_ms == 0 {
            result.add_error(ValidationError::new(
                "poll.interval_ms",
                "interval_ms must be greater than 0",
            ));
        } else if config.poll.interval_ms < 100 {
            result.add_warning(ValidationWarning::new(
                "poll.interval_ms",
                "interval_ms is very low (<100), every tick queries the whole page",
            ));
        }
    }

    fn validate_resolver(config: &Config, result: &mut ValidationResult) {
        let precision = config.resolver.default_precision;
        if !(0.0..=1.0).contains(&precision) {
            result.add_error(ValidationError::new(
                "resolver.default_precision",
                format!("default_precision must be within 0.0..=1.0, got {}", precision),
            ));
        }
    }

    fn validate_storage(config: &Config, result: &mut ValidationResult) {
        if config.storage.key_prefix.chars().any(char::is_whitespace) {
            result.add_warning(ValidationWarning::new(
                "storage.key_prefix",
                "key_prefix contains whitespace",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let format = config.logging.format.to_ascii_lowercase();
        if !LOG_FORMATS.contains(&format.as_str()) {
            result.add_error(ValidationError::new(
                "logging.format",
                format!(
                    "Unknown log format '{}', valid values: {:?}",
                    config.logging.format, LOG_FORMATS
                ),
            ));
        }

        let level = config.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Log level '{}' is not a plain level and is used as a filter directive",
                    config.logging.level
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
