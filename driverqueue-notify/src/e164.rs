//! The one phone number shape every layer accepts: `+`, a non-zero leading
//! digit, then 11 to 15 digits in total.

use once_cell::sync::Lazy;
use regex::Regex;

static E164_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9]\d{10,14}$").unwrap());

pub fn is_e164(candidate: &str) -> bool {
    E164_REGEX.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plus_and_eleven_to_fifteen_digits() {
        assert!(is_e164("+15551234567"));
        assert!(is_e164("+551199999000012"));
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(!is_e164("15551234567"));
        assert!(!is_e164("+0551199990000"));
        assert!(!is_e164("+1555123456"));
        assert!(!is_e164("+1555123456789012"));
        assert!(!is_e164("+1 555 123 4567"));
    }
}
