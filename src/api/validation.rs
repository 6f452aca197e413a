//! Input validation for API requests.
//!
//! Field checks return `Err(message)`; handlers collect them into a single
//! 400 response with `ValidationErrorBuilder`.

use lazy_static::lazy_static;
use regex::Regex;

use super::error::{ApiError, ValidationErrorBuilder};
use crate::db::{CreateBookingRequest, NewBooking, RegisterRequest, Role};

lazy_static! {
    /// Loose email shape check: something@something.tld
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^\s@]+@[^\s@]+\.[^\s@]+$"
    ).unwrap();
}

/// Return the trimmed value of a required field, or an error naming it.
pub fn require<'a>(value: &'a Option<String>, label: &str) -> Result<&'a str, String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("{} is required", label)),
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {} characters",
            min_length
        ));
    }
    if password.len() > 1024 {
        return Err("Password is too long".to_string());
    }
    Ok(())
}

/// A registration request that passed validation
#[derive(Debug)]
pub struct ValidRegistration {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

pub fn validate_registration(
    req: &RegisterRequest,
    min_password_length: usize,
) -> Result<ValidRegistration, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let email = match require(&req.email, "Email") {
        Ok(email) => {
            if let Err(e) = validate_email(email) {
                errors.add("email", e);
            }
            email
        }
        Err(e) => {
            errors.add("email", e);
            ""
        }
    };

    // Passwords are not trimmed
    let password = match req.password.as_deref() {
        Some(p) if !p.is_empty() => {
            if let Err(e) = validate_password(p, min_password_length) {
                errors.add("password", e);
            }
            p
        }
        _ => {
            errors.add("password", "Password is required");
            ""
        }
    };

    let name = require(&req.name, "Name").unwrap_or_else(|e| {
        errors.add("name", e);
        ""
    });

    let role = match req.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        None => Role::default(),
        Some(raw) => raw.parse().unwrap_or_else(|e: String| {
            errors.add("role", e);
            Role::default()
        }),
    };

    errors.finish()?;

    Ok(ValidRegistration {
        email: email.to_string(),
        password: password.to_string(),
        name: name.to_string(),
        role,
    })
}

pub fn validate_booking_request(req: &CreateBookingRequest) -> Result<NewBooking, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let mut field = |value: &Option<String>, key: &str, label: &str| -> String {
        match require(value, label) {
            Ok(v) => v.to_string(),
            Err(e) => {
                errors.add(key, e);
                String::new()
            }
        }
    };

    let property_id = field(&req.property_id, "propertyId", "Property id");
    let check_in = field(&req.check_in, "checkIn", "Check-in date");
    let check_out = field(&req.check_out, "checkOut", "Check-out date");

    errors.finish()?;

    Ok(NewBooking {
        property_id,
        check_in,
        check_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, password: &str, name: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            name: Some(name.to_string()),
            role: None,
        }
    }

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("student@uni.edu.au").is_ok());
        assert!(validate_email("a.b+c@example.com").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("spaces in@example.com").is_err());
        assert!(validate_email("user@localhost").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345678", 8).is_ok());
        assert!(validate_password("1234567", 8).is_err());
        assert!(validate_password(&"x".repeat(2000), 8).is_err());
    }

    #[test]
    fn test_registration_defaults_role() {
        let valid = validate_registration(
            &registration(" ana@uni.edu ", "long enough", "Ana"),
            8,
        )
        .unwrap();
        assert_eq!(valid.email, "ana@uni.edu");
        assert_eq!(valid.role, Role::Student);
    }

    #[test]
    fn test_registration_reports_every_missing_field() {
        let err = validate_registration(&RegisterRequest::default(), 8).unwrap_err();
        assert!(err.to_string().contains("3 fields"));
    }

    #[test]
    fn test_registration_rejects_unknown_role() {
        let mut req = registration("ana@uni.edu", "long enough", "Ana");
        req.role = Some("admin".to_string());
        assert!(validate_registration(&req, 8).is_err());

        req.role = Some("Landlord".to_string());
        assert_eq!(validate_registration(&req, 8).unwrap().role, Role::Landlord);
    }

    #[test]
    fn test_booking_request_requires_all_fields() {
        let req = CreateBookingRequest {
            property_id: Some("p1".to_string()),
            check_in: Some("  ".to_string()),
            check_out: None,
        };
        let err = validate_booking_request(&req).unwrap_err();
        assert!(err.to_string().contains("2 fields"));

        let req = CreateBookingRequest {
            property_id: Some("p1".to_string()),
            check_in: Some("2025-02-01".to_string()),
            check_out: Some("2025-06-30".to_string()),
        };
        let booking = validate_booking_request(&req).unwrap();
        assert_eq!(booking.property_id, "p1");
    }
}
