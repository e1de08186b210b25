//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, segment bounds, status codes)
//! - Check that addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// Largest accepted `max_segments`.
pub const MAX_SEGMENTS_CEILING: usize = 255;

/// A single semantic violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("routing.min_segments must be at least 2, got {0}")]
    MinSegmentsTooSmall(usize),

    #[error("routing.min_segments ({min}) exceeds routing.max_segments ({max})")]
    SegmentBoundsInverted { min: usize, max: usize },

    #[error("routing.max_segments must be at most 255, got {0}")]
    MaxSegmentsTooLarge(usize),

    #[error("responses.business_status must be 400 or 422, got {0}")]
    InvalidBusinessStatus(u16),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} is not a valid socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Validate the configuration, collecting every violation.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let routing = &config.routing;
    if routing.min_segments < 2 {
        errors.push(ValidationError::MinSegmentsTooSmall(routing.min_segments));
    }
    if routing.min_segments > routing.max_segments {
        errors.push(ValidationError::SegmentBoundsInverted {
            min: routing.min_segments,
            max: routing.max_segments,
        });
    }
    if routing.max_segments > MAX_SEGMENTS_CEILING {
        errors.push(ValidationError::MaxSegmentsTooLarge(routing.max_segments));
    }

    let status = config.responses.business_status;
    if status != 400 && status != 422 {
        errors.push(ValidationError::InvalidBusinessStatus(status));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::Zero("limits.max_body_size"));
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_segment_bounds() {
        let mut config = AppConfig::default();
        config.routing.min_segments = 1;
        config.routing.max_segments = 300;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MinSegmentsTooSmall(1)));
        assert!(errors.contains(&ValidationError::MaxSegmentsTooLarge(300)));

        let mut config = AppConfig::default();
        config.routing.min_segments = 5;
        config.routing.max_segments = 3;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::SegmentBoundsInverted { min: 5, max: 3 }]
        );
    }

    #[test]
    fn test_business_status() {
        let mut config = AppConfig::default();
        config.responses.business_status = 422;
        assert!(validate_config(&config).is_ok());
        config.responses.business_status = 409;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidBusinessStatus(409)]
        );
    }

    #[test]
    fn test_addresses() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "localhost".to_string();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nope".to_string();
        assert_eq!(validate_config(&config).unwrap_err().len(), 2);

        // The metrics address only matters when the exporter is enabled.
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config.observability.metrics_enabled = false;
        assert!(validate_config(&config).is_ok());
    }
}
