use serde::Serialize;

use crate::phone::{normalize_phone, PhoneError};
use crate::policy::QueuePolicy;
use crate::types::RegisterDriver;

pub const MAX_PLATE_CHARS: usize = 20;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Registration input after trimming and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRegistration {
    pub plate: String,
    pub name: String,
    pub phone_number: String,
}

pub fn validate_registration(
    input: &RegisterDriver,
    policy: &QueuePolicy,
) -> Result<NormalizedRegistration, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    let plate = input.plate.trim().to_uppercase();
    if plate.is_empty() {
        issues.push(ValidationIssue::new("plate", "required", "plate is required"));
    } else if plate.chars().count() > MAX_PLATE_CHARS {
        issues.push(ValidationIssue::new(
            "plate",
            "too_long",
            format!("plate must be at most {MAX_PLATE_CHARS} characters"),
        ));
    } else if plate.chars().any(char::is_control) {
        issues.push(ValidationIssue::new(
            "plate",
            "invalid_characters",
            "plate contains control characters",
        ));
    }

    let name = input.name.trim().to_string();
    let name_len = name.chars().count();
    if name.is_empty() {
        issues.push(ValidationIssue::new("name", "required", "name is required"));
    } else if name_len < policy.name_min_chars || name_len > policy.name_max_chars {
        issues.push(ValidationIssue::new(
            "name",
            "length",
            format!(
                "name must be between {} and {} characters",
                policy.name_min_chars, policy.name_max_chars
            ),
        ));
    } else if name.chars().any(char::is_control) {
        issues.push(ValidationIssue::new(
            "name",
            "invalid_characters",
            "name contains control characters",
        ));
    }

    let phone = match normalize_phone(&input.phone_number, &policy.default_country_code) {
        Ok(phone) => Some(phone),
        Err(PhoneError::Empty) => {
            issues.push(ValidationIssue::new(
                "phoneNumber",
                "required",
                "phone number is required",
            ));
            None
        }
        Err(PhoneError::Invalid) => {
            issues.push(ValidationIssue::new(
                "phoneNumber",
                "invalid_format",
                "phone number must be in international format, e.g. +5511999990000",
            ));
            None
        }
    };

    match phone {
        Some(phone_number) if issues.is_empty() => Ok(NormalizedRegistration {
            plate,
            name,
            phone_number,
        }),
        _ => Err(issues),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(plate: &str, name: &str, phone: &str) -> RegisterDriver {
        RegisterDriver {
            plate: plate.into(),
            name: name.into(),
            phone_number: phone.into(),
        }
    }

    #[test]
    fn normalizes_valid_input() {
        let out = validate_registration(
            &input("  abc1d23 ", "  Alice  ", "11 99999-0000"),
            &QueuePolicy::default(),
        )
        .unwrap();
        assert_eq!(out.plate, "ABC1D23");
        assert_eq!(out.name, "Alice");
        assert_eq!(out.phone_number, "+5511999990000");
    }

    #[test]
    fn reports_every_problem_at_once() {
        let issues =
            validate_registration(&input(" ", "Al", "abc"), &QueuePolicy::default()).unwrap_err();
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, ["plate", "name", "phoneNumber"]);
        assert_eq!(issues[1].code, "length");
    }

    #[test]
    fn enforces_plate_length() {
        let long = "X".repeat(MAX_PLATE_CHARS + 1);
        let issues = validate_registration(
            &input(&long, "Alice", "+5511999990000"),
            &QueuePolicy::default(),
        )
        .unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "too_long");
    }

    #[test]
    fn name_bounds_follow_policy() {
        let policy = QueuePolicy {
            name_min_chars: 1,
            name_max_chars: 5,
            ..QueuePolicy::default()
        };
        assert!(validate_registration(&input("A1", "Bo", "+5511999990000"), &policy).is_ok());
        assert!(validate_registration(&input("A1", "Roberta", "+5511999990000"), &policy).is_err());
    }
}
