//! Request validation helpers.

use pagecache_core::PageCacheError;
use validator::{Validate, ValidationError, ValidationErrors};

/// Validates a request and maps failures to [`PageCacheError::Validation`].
pub trait ValidateExt: Validate {
    /// Validates the struct and returns a `PageCacheError` on failure.
    fn validate_request(&self) -> Result<(), PageCacheError> {
        self.validate().map_err(validation_errors_to_error)
    }
}

impl<T: Validate> ValidateExt for T {}

/// Flattens `validator` field errors into one message.
#[must_use]
pub fn validation_errors_to_error(errors: ValidationErrors) -> PageCacheError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                format!("{}: {}", field, message)
            })
        })
        .collect();
    messages.sort();

    PageCacheError::Validation(messages.join("; "))
}

/// Rejects strings that are empty after trimming.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    struct Titled {
        #[validate(length(max = 4), custom(function = "not_blank"))]
        title: String,
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("hello").is_ok());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("").is_err());
    }

    #[test]
    fn test_validate_request_maps_to_validation_error() {
        assert!(Titled { title: "ok".into() }.validate_request().is_ok());

        let err = Titled { title: "  ".into() }.validate_request().unwrap_err();
        match err {
            PageCacheError::Validation(message) => assert!(message.contains("title: not_blank")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
