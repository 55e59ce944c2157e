//! Request validation utilities for consistent validation across handlers
//!
//! Domain rules (price checks, catalog codes, status transitions) live in
//! the service crates. This module covers the shape checks a handler does
//! before calling them: required fields, lengths and formats. Every macro
//! names the JSON field it checks so the error lands in the response's
//! `errors` map under that key.

use crate::error::ApiError;

/// Trait for validating request payloads
///
/// # Example
///
/// ```rust,ignore
/// impl RequestValidation for LoginRequest {
///     fn validate(&self) -> Result<(), ApiError> {
///         validate_required!(self.username, "username", "is required");
///         validate_length!(self.password, "password", 1, 72, "must be 1 to 72 characters");
///         Ok(())
///     }
/// }
/// ```
pub trait RequestValidation {
    /// Validates the request and returns an error if validation fails
    fn validate(&self) -> Result<(), ApiError>;
}

/// Macro for validating fields with custom predicates
///
/// # Usage
///
/// ```rust,ignore
/// validate_field!("email", self.email.contains('@'), "must be a valid email address");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($name:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::field($name, $message));
        }
    };
}

/// Macro for validating required fields (non-empty strings)
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $name:expr, $message:expr) => {
        $crate::validate_field!($name, !$field.trim().is_empty(), $message);
    };
}

/// Macro for validating string length in characters
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $name:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.trim().chars().count();
        $crate::validate_field!($name, len >= $min && len <= $max, $message);
    };
}

/// Macro for validating email format (basic check)
#[macro_export]
macro_rules! validate_email {
    ($field:expr, $name:expr, $message:expr) => {
        $crate::validate_field!(
            $name,
            $crate::validation::looks_like_email($field.trim()),
            $message
        );
    };
}

/// Macro for validating numeric ranges
#[macro_export]
macro_rules! validate_range {
    ($field:expr, $name:expr, $min:expr, $max:expr, $message:expr) => {
        $crate::validate_field!($name, $field >= $min && $field <= $max, $message);
    };
}

/// `local@domain.tld` with no whitespace.
pub fn looks_like_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Signup {
        name: String,
        email: String,
        age: i32,
    }

    impl RequestValidation for Signup {
        fn validate(&self) -> Result<(), ApiError> {
            validate_required!(self.name, "name", "is required");
            validate_length!(self.name, "name", 3, 20, "must be 3 to 20 characters");
            validate_email!(self.email, "email", "must be a valid email address");
            validate_range!(self.age, "age", 0, 150, "must be between 0 and 150");
            Ok(())
        }
    }

    fn signup(name: &str, email: &str, age: i32) -> Signup {
        Signup {
            name: name.to_string(),
            email: email.to_string(),
            age,
        }
    }

    fn failing_field(request: Signup) -> String {
        match request.validate() {
            Err(ApiError::Validation {
                field_errors: Some(errors),
                ..
            }) => errors.into_keys().next().unwrap_or_default(),
            other => panic!("expected a field error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(signup("Siti", "siti@klinik.test", 30).validate().is_ok());
    }

    #[test]
    fn test_each_rule_names_its_field() {
        assert_eq!(failing_field(signup("  ", "siti@klinik.test", 30)), "name");
        assert_eq!(failing_field(signup("Si", "siti@klinik.test", 30)), "name");
        assert_eq!(failing_field(signup("Siti", "siti.klinik.test", 30)), "email");
        assert_eq!(failing_field(signup("Siti", "siti@klinik.test", 200)), "age");
    }

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@@b.co"));
        assert!(!looks_like_email("a b@c.co"));
        assert!(!looks_like_email("a@b..co"));
    }
}
