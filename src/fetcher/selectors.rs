//! The versioned contract with the result site.
//!
//! Selectors and modal texts change between exam cycles; keeping them in one
//! place is what makes those changes a one-file diff. Modal matching is
//! exact-string on purpose: a text drift must show up as `Unrecognized`,
//! not silently match the wrong branch.

use regex::Regex;

pub const USN_FIELD: &str = r#"input[name="lns"]"#;
pub const CAPTCHA_FIELD: &str = r#"input[name="captchacode"]"#;
pub const SUBMIT_BUTTON: &str = "#submit";
pub const CAPTCHA_IMAGE: &str = "#raj img";
pub const CAPTCHA_REFRESH: &str = "#raj p a";

pub const ALERT_INVALID_USN: &str = "University Seat Number is not available or Invalid..!";
pub const ALERT_INVALID_CAPTCHA: &str = "Invalid captcha code !!!";
pub const ALERT_COOLDOWN: &str = "Please check website after 2 hour !!!";

/// USN shape issued by the university, e.g. `1OX21CS004`.
const USN_PATTERN: &str = r"^[0-9][A-Z]{2}[0-9]{2}[A-Z]{2,3}[0-9]{3}$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertKind {
    InvalidIdentifier,
    InvalidCaptcha,
    Cooldown,
    /// Modal text this build does not know; surfaced verbatim instead of
    /// guessed at.
    Unrecognized(String),
}

pub fn classify_alert(text: &str) -> AlertKind {
    match text.trim() {
        ALERT_INVALID_USN => AlertKind::InvalidIdentifier,
        ALERT_INVALID_CAPTCHA => AlertKind::InvalidCaptcha,
        ALERT_COOLDOWN => AlertKind::Cooldown,
        other => AlertKind::Unrecognized(other.to_string()),
    }
}

/// Cheap local check before a browser session is spent on the identifier.
pub fn is_well_formed_usn(usn: &str) -> bool {
    match Regex::new(USN_PATTERN) {
        Ok(re) => re.is_match(&usn.trim().to_uppercase()),
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_alerts_classify_exactly() {
        assert_eq!(
            classify_alert(ALERT_INVALID_USN),
            AlertKind::InvalidIdentifier
        );
        assert_eq!(classify_alert(ALERT_INVALID_CAPTCHA), AlertKind::InvalidCaptcha);
        assert_eq!(classify_alert(ALERT_COOLDOWN), AlertKind::Cooldown);
    }

    #[test]
    fn unknown_alert_text_is_surfaced_verbatim() {
        let kind = classify_alert("Server under maintenance !!!");
        assert_eq!(
            kind,
            AlertKind::Unrecognized("Server under maintenance !!!".to_string())
        );
    }

    #[test]
    fn near_miss_alert_text_does_not_match() {
        // One character off must not silently hit the invalid-USN branch.
        let kind = classify_alert("University Seat Number is not available or Invalid.!");
        assert!(matches!(kind, AlertKind::Unrecognized(_)));
    }

    #[test]
    fn usn_shape_check() {
        assert!(is_well_formed_usn("1OX21CS004"));
        assert!(is_well_formed_usn("1ox21cs004"));
        assert!(is_well_formed_usn("1OX21CSE004"));
        assert!(!is_well_formed_usn(""));
        assert!(!is_well_formed_usn("CS004"));
        assert!(!is_well_formed_usn("1OX21CS04"));
    }
}
