//! Phone number normalization and validation.
//!
//! The service is restricted to the Vietnamese numbering plan. Input may be
//! in local (`0912345678`), international (`+84912345678`), or bare
//! (`84912345678`) form, with optional separators. Output is always E.164.

use crate::error::{OtpError, OtpResult};

const COUNTRY_CALLING_CODE: &str = "84";

/// Length of the national subscriber number (after the leading 0 or the
/// country code).
const SUBSCRIBER_LENGTH: usize = 9;

/// Valid first digits of a Vietnamese mobile subscriber number.
const MOBILE_PREFIXES: [char; 5] = ['3', '5', '7', '8', '9'];

/// Normalizes a raw phone string to E.164 (`+84XXXXXXXXX`).
///
/// Pure and deterministic; idempotent on its own output. Fails with
/// `OtpError::InvalidPhone` for anything outside the supported plan.
pub fn normalize_phone(raw: &str) -> OtpResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OtpError::InvalidPhone);
    }

    // Strip common separators, keep a single leading '+'.
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '(' | ')'))
        .skip(if has_plus { 1 } else { 0 })
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(OtpError::InvalidPhone);
    }

    let subscriber = if let Some(rest) = digits.strip_prefix(COUNTRY_CALLING_CODE) {
        rest
    } else if has_plus {
        // A '+' with a different country code is never a Vietnam number.
        return Err(OtpError::InvalidPhone);
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest
    } else {
        return Err(OtpError::InvalidPhone);
    };

    if subscriber.len() != SUBSCRIBER_LENGTH {
        return Err(OtpError::InvalidPhone);
    }

    let first = subscriber.chars().next().unwrap_or('0');
    if !MOBILE_PREFIXES.contains(&first) {
        return Err(OtpError::InvalidPhone);
    }

    Ok(format!("+{COUNTRY_CALLING_CODE}{subscriber}"))
}

/// Masks a phone number for display and logging.
///
/// Example: `+84912345678` -> `+8491***5678`.
pub fn mask_phone(phone: &str) -> String {
    if phone.len() < 8 {
        return phone.to_string();
    }

    let visible_start = 5.min(phone.len() - 4);
    let visible_end = phone.len() - 4;

    format!(
        "{}***{}",
        &phone[..visible_start],
        &phone[visible_end..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_local_form() {
        assert_eq!(normalize_phone("0912345678").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("0358765432").unwrap(), "+84358765432");
    }

    #[test]
    fn test_normalize_international_form() {
        assert_eq!(normalize_phone("+84912345678").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("84912345678").unwrap(), "+84912345678");
    }

    #[test]
    fn test_normalize_with_separators() {
        assert_eq!(normalize_phone("091 234 5678").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("+84 (91) 234-5678").unwrap(), "+84912345678");
        assert_eq!(normalize_phone("091.234.5678").unwrap(), "+84912345678");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_phone("0912345678").unwrap();
        let twice = normalize_phone(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert_eq!(normalize_phone(""), Err(OtpError::InvalidPhone));
        assert_eq!(normalize_phone("   "), Err(OtpError::InvalidPhone));
        assert_eq!(normalize_phone("abc"), Err(OtpError::InvalidPhone));
        assert_eq!(normalize_phone("09123x5678"), Err(OtpError::InvalidPhone));
        // Wrong length
        assert_eq!(normalize_phone("091234567"), Err(OtpError::InvalidPhone));
        assert_eq!(normalize_phone("09123456789"), Err(OtpError::InvalidPhone));
        // Non-mobile prefix
        assert_eq!(normalize_phone("0112345678"), Err(OtpError::InvalidPhone));
        assert_eq!(normalize_phone("0212345678"), Err(OtpError::InvalidPhone));
    }

    #[test]
    fn test_rejects_foreign_numbers() {
        assert_eq!(normalize_phone("+14155552671"), Err(OtpError::InvalidPhone));
        assert_eq!(normalize_phone("+4915112345678"), Err(OtpError::InvalidPhone));
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("+84912345678"), "+8491***5678");
        // Too short to mask meaningfully
        assert_eq!(mask_phone("0912"), "0912");
    }
}
