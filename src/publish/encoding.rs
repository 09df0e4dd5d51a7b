//! Code-page check for item fields that bypass placeholder substitution.

use crate::error::Warning;
use encoding_rs::WINDOWS_1252;
use log::warn;

/// Check whether Windows-1252 can represent a character.
pub fn is_representable(c: char) -> bool {
    let mut buf = [0u8; 4];
    let (_, _, had_errors) = WINDOWS_1252.encode(c.encode_utf8(&mut buf));
    !had_errors
}

/// Distinct characters of `value` outside the code page, in first-seen order.
pub fn unrepresentable(value: &str) -> Vec<char> {
    let (_, _, had_errors) = WINDOWS_1252.encode(value);
    if !had_errors {
        return Vec::new();
    }
    let mut found = Vec::new();
    for c in value.chars().filter(|c| !is_representable(*c)) {
        if !found.contains(&c) {
            found.push(c);
        }
    }
    found
}

/// Check one field; returns a warning when it is at risk.
pub fn check_field(field: &str, value: &str) -> Option<Warning> {
    let chars = unrepresentable(value);
    if chars.is_empty() {
        return None;
    }
    let warning = Warning::EncodingBypassRisk {
        field: field.to_string(),
        characters: chars.into_iter().collect(),
    };
    warn!("{}", warning);
    Some(warning)
}
