//! Validation utilities for the Practice Journal

// ============================================================================
// Practice Validations
// ============================================================================

/// Upper bound for a single day's practice entry
pub const MAX_DAILY_MINUTES: i32 = 24 * 60;

/// Validate minutes entered for one day
pub fn validate_daily_minutes(minutes: i32) -> Result<(), &'static str> {
    if minutes < 0 {
        return Err("Minutes must be a non-negative number");
    }
    if minutes > MAX_DAILY_MINUTES {
        return Err("Minutes cannot exceed the length of a day");
    }
    Ok(())
}

/// Strip the punctuation people commonly type into phone numbers
pub fn normalize_phone_number(phone: &str) -> String {
    phone
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// Canonical form a phone number is stored and matched in. Ten digits with no
/// country code are taken as a North American number and get `+1`; any other
/// bare digit string is assumed to already carry its country code.
pub fn canonical_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    if normalized.starts_with('+') {
        normalized
    } else if normalized.len() == 10 {
        format!("+1{}", normalized)
    } else {
        format!("+{}", normalized)
    }
}

/// Validate an E.164-style phone number: optional `+`, then 2-15 digits
/// not starting with 0
pub fn validate_phone_number(phone: &str) -> Result<(), &'static str> {
    let normalized = normalize_phone_number(phone);
    let digits = normalized.strip_prefix('+').unwrap_or(&normalized);

    if digits.len() < 2 || digits.len() > 15 {
        return Err("Phone number must have between 2 and 15 digits");
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number may only contain digits");
    }
    if digits.starts_with('0') {
        return Err("Phone number must not start with 0");
    }
    Ok(())
}

// ============================================================================
// Settings Validations
// ============================================================================

/// Validate a CSS hex color (`#RGB` or `#RRGGBB`)
pub fn validate_hex_color(color: &str) -> Result<(), &'static str> {
    let hex = color
        .strip_prefix('#')
        .ok_or("Color must start with '#'")?;
    if hex.len() != 3 && hex.len() != 6 {
        return Err("Color must be in #RGB or #RRGGBB format");
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("Color must be in #RGB or #RRGGBB format");
    }
    Ok(())
}

/// Validate week start day (0 = Sunday through 6 = Saturday)
pub fn validate_week_start_day(day: i16) -> Result<(), &'static str> {
    if !(0..=6).contains(&day) {
        return Err("Week start day must be between 0 (Sunday) and 6 (Saturday)");
    }
    Ok(())
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate username (3-50 characters: letters, digits, `_`, `.`, `-`)
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if username.len() > 50 {
        return Err("Username must be at most 50 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err("Username may only contain letters, digits, '_', '.' and '-'");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validate_daily_minutes() {
        assert!(validate_daily_minutes(0).is_ok());
        assert!(validate_daily_minutes(45).is_ok());
        assert!(validate_daily_minutes(MAX_DAILY_MINUTES).is_ok());
        assert!(validate_daily_minutes(-1).is_err());
        assert!(validate_daily_minutes(MAX_DAILY_MINUTES + 1).is_err());
    }

    #[test]
    fn test_normalize_phone_number() {
        assert_eq!(normalize_phone_number("+1 (555) 123-4567"), "+15551234567");
        assert_eq!(normalize_phone_number(" 555.123.4567 "), "5551234567");
    }

    #[test]
    fn test_canonical_phone_number() {
        assert_eq!(canonical_phone_number("(555) 123-4567"), "+15551234567");
        assert_eq!(canonical_phone_number("1-555-123-4567"), "+15551234567");
        assert_eq!(canonical_phone_number("+1 555 123 4567"), "+15551234567");
        assert_eq!(canonical_phone_number("+44 20 7946 0958"), "+442079460958");
        assert_eq!(canonical_phone_number("442079460958"), "+442079460958");
    }

    #[test]
    fn test_validate_phone_number_valid() {
        assert!(validate_phone_number("+15551234567").is_ok());
        assert!(validate_phone_number("5551234567").is_ok());
        assert!(validate_phone_number("+1 555-123-4567").is_ok());
        assert!(validate_phone_number("12").is_ok());
    }

    #[test]
    fn test_validate_phone_number_invalid() {
        assert!(validate_phone_number("").is_err());
        assert!(validate_phone_number("+").is_err());
        assert!(validate_phone_number("1").is_err());
        assert!(validate_phone_number("0551234567").is_err());
        assert!(validate_phone_number("+1555123456789012").is_err()); // 16 digits
        assert!(validate_phone_number("555-CALL-NOW").is_err());
    }

    #[test]
    fn test_validate_hex_color() {
        assert!(validate_hex_color("#0284c7").is_ok());
        assert!(validate_hex_color("#FFF").is_ok());
        assert!(validate_hex_color("0284c7").is_err());
        assert!(validate_hex_color("#0284c").is_err());
        assert!(validate_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_validate_week_start_day() {
        for day in 0..=6 {
            assert!(validate_week_start_day(day).is_ok());
        }
        assert!(validate_week_start_day(-1).is_err());
        assert!(validate_week_start_day(7).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("student@example.com").is_ok());
        assert!(validate_email("a.b@school.k12.us").is_ok());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("no@domain").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("x@.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("student").is_ok());
        assert!(validate_username("j.doe-2").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("test123").is_ok());
        assert!(validate_password("short").is_err());
    }

    proptest! {
        /// National and E.164 spellings of a US number land on one key
        #[test]
        fn property_us_number_forms_agree(area in "[2-9][0-9]{2}", line in "[2-9][0-9]{6}") {
            let national = format!("({}) {}-{}", area, &line[..3], &line[3..]);
            let e164 = format!("+1{}{}", area, line);
            prop_assert_eq!(canonical_phone_number(&national), canonical_phone_number(&e164));
            prop_assert_eq!(canonical_phone_number(&national), e164);
        }

        /// Canonicalizing twice changes nothing
        #[test]
        fn property_canonical_is_stable(digits in "[1-9][0-9]{1,14}") {
            let once = canonical_phone_number(&digits);
            prop_assert_eq!(canonical_phone_number(&once), once.clone());
            prop_assert!(validate_phone_number(&once).is_ok());
        }
    }
}
