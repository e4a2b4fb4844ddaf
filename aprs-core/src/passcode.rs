//! Relay login credential ("passcode") derived from a station identifier.
//!
//! The hash covers the uppercase base call only, so every SSID of a
//! station shares one credential.

use crate::types::{AprsError, Result};

const SEED: u16 = 0x73E2;
const MASK: u16 = 0x7FFF;
const MAX_BASE_LEN: usize = 6;

/// Compute the login credential for `identifier` (`CALL` or `CALL-SSID`).
pub fn login_credential(identifier: &str) -> Result<u16> {
    let base = identifier
        .split('-')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase();

    if base.is_empty()
        || base.len() > MAX_BASE_LEN
        || !base.bytes().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(AprsError::FieldFormat(format!(
            "invalid callsign for passcode: {identifier:?}"
        )));
    }

    let mut hash = SEED;
    for (i, c) in base.bytes().enumerate() {
        // Even positions land in the high byte, odd ones in the low byte.
        let shift = if i % 2 == 0 { 8 } else { 0 };
        hash ^= (c as u16) << shift;
    }

    Ok(hash & MASK)
}

/// True when `passcode` is the credential for `identifier`.
pub fn verify(identifier: &str, passcode: i32) -> bool {
    login_credential(identifier).is_ok_and(|expected| i32::from(expected) == passcode)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        assert_eq!(login_credential("N0CALL").unwrap(), 13023);
        assert_eq!(login_credential("W1AW").unwrap(), 25988);
    }

    #[test]
    fn test_ssid_ignored() {
        assert_eq!(
            login_credential("N0CALL").unwrap(),
            login_credential("N0CALL-9").unwrap()
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            login_credential("n0call-1").unwrap(),
            login_credential("N0CALL").unwrap()
        );
    }

    #[test]
    fn test_within_mask() {
        for call in ["A", "ZZZZZZ", "K9", "VE3ABC"] {
            assert!(login_credential(call).unwrap() <= 0x7FFF);
        }
    }

    #[test]
    fn test_invalid_callsign() {
        assert!(login_credential("").is_err());
        assert!(login_credential("-9").is_err());
        assert!(login_credential("TOOLONG1").is_err());
    }

    #[test]
    fn test_non_alphanumeric_rejected() {
        assert!(login_credential("ÄB").is_err());
        assert!(login_credential("N0/CAL").is_err());
        assert!(login_credential("N0 CAL").is_err());
        assert!(!verify("ÄB", 29286));
    }

    #[test]
    fn test_verify() {
        assert!(verify("N0CALL-9", 13023));
        assert!(!verify("N0CALL", 12345));
        assert!(!verify("N0CALL", -1));
    }
}
