//! Phone number normalization to E.164.
//!
//! Rule: keep digits and a leading `+`. A `00` international prefix becomes
//! `+`. A bare 10 or 11 digit number is national and gets the default
//! country code. A bare 12 to 15 digit number already carries its country
//! code. Anything that does not end up as `+` followed by 11 to 15 digits
//! is rejected.

pub use driverqueue_notify::is_e164;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneError {
    Empty,
    Invalid,
}

pub fn normalize_phone(raw: &str, default_country_code: &str) -> Result<String, PhoneError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }

    let explicit_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(PhoneError::Invalid);
    }

    let normalized = if explicit_plus {
        format!("+{digits}")
    } else if let Some(international) = digits.strip_prefix("00") {
        format!("+{international}")
    } else {
        match digits.len() {
            10 | 11 => format!("+{default_country_code}{digits}"),
            12..=15 => format!("+{digits}"),
            _ => return Err(PhoneError::Invalid),
        }
    };

    if is_e164(&normalized) {
        Ok(normalized)
    } else {
        Err(PhoneError::Invalid)
    }
}
