// SPDX-License-Identifier: MIT
// Copyright 2026 The yoga-planner developers

//! Custom field validators shared by the request DTOs.
//!
//! Each function reports the first failing rule for its field, with the
//! message surfaced verbatim in the 400 response.

use regex::Regex;
use std::sync::OnceLock;
use validator::{ValidateEmail, ValidationError};

use crate::models::FitnessLevel;

/// Email for required fields. Trimmed before the format check, matching
/// the normalized form the store holds.
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err(field_error("email_required", "Email is required"));
    }
    if !trimmed.validate_email() {
        return Err(field_error("email_format", "Must be a valid email address"));
    }
    Ok(())
}

/// Email for profile updates: only checked when provided, but an empty
/// value still fails the format check.
pub fn optional_email_validator(email: &str) -> Result<(), ValidationError> {
    if !email.trim().validate_email() {
        return Err(field_error("email_format", "Must be a valid email address"));
    }
    Ok(())
}

/// Name for registration: required, 2-50 chars, letters and spaces.
pub fn name_validator(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(field_error("name_required", "Name is required"));
    }
    name_shape(trimmed)
}

/// Name for profile updates: only checked when provided.
pub fn optional_name_validator(name: &str) -> Result<(), ValidationError> {
    name_shape(name.trim())
}

fn name_shape(trimmed: &str) -> Result<(), ValidationError> {
    let count = trimmed.chars().count();
    if !(2..=50).contains(&count) {
        return Err(field_error(
            "name_length",
            "Name must be between 2-50 characters",
        ));
    }

    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z\s]+$").expect("Failed to compile name regex"));

    if !regex.is_match(trimmed) {
        return Err(field_error(
            "name_charset",
            "Name can only contain letters and spaces",
        ));
    }
    Ok(())
}

/// Phone for registration: tolerates separators and area-code parentheses.
pub fn phone_validator(phone: &str) -> Result<(), ValidationError> {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX.get_or_init(|| {
        Regex::new(r"^[+]?[(]?[0-9]{1,4}[)]?[-\s.]?[(]?[0-9]{1,4}[)]?[-\s.]?[0-9]{1,9}$")
            .expect("Failed to compile phone regex")
    });

    if regex.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(field_error(
            "phone_format",
            "Please provide a valid phone number",
        ))
    }
}

/// Phone for profile updates: digits only, E.164 shape.
pub fn strict_phone_validator(phone: &str) -> Result<(), ValidationError> {
    static STRICT_PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = STRICT_PHONE_REGEX.get_or_init(|| {
        Regex::new(r"^\+?[1-9]\d{1,14}$").expect("Failed to compile strict phone regex")
    });

    if regex.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(field_error(
            "phone_format",
            "Please provide a valid phone number",
        ))
    }
}

/// Fitness level must be one of the known names.
pub fn fitness_level_validator(level: &str) -> Result<(), ValidationError> {
    if FitnessLevel::from_name(level.trim()).is_some() {
        Ok(())
    } else {
        Err(field_error(
            "fitness_level",
            "Fitness level must be beginner, intermediate, or advanced",
        ))
    }
}

/// Password strength for resets: one lower, one upper, one digit, one of
/// the allowed specials. Scanned by character class; the equivalent
/// lookahead regex is not expressible with the regex crate.
pub fn strong_password_validator(password: &str) -> Result<(), ValidationError> {
    const SPECIALS: &str = "@$!%*?&";

    let strong = password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| SPECIALS.contains(c));

    if strong {
        Ok(())
    } else {
        Err(field_error(
            "password_strength",
            "Password must contain at least one uppercase letter, one lowercase letter, \
             one number, and one special character",
        ))
    }
}

/// Plan name: required, 3-100 chars.
pub fn plan_name_validator(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(field_error("plan_name_required", "Plan name is required"));
    }
    if !(3..=100).contains(&trimmed.chars().count()) {
        return Err(field_error(
            "plan_name_length",
            "Plan name must be between 3-100 characters",
        ));
    }
    Ok(())
}

/// Yoga type: required, at most 50 chars.
pub fn yoga_type_validator(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(field_error("yoga_type_required", "Yoga type is required"));
    }
    if trimmed.chars().count() > 50 {
        return Err(field_error(
            "yoga_type_length",
            "Yoga type cannot exceed 50 characters",
        ));
    }
    Ok(())
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
