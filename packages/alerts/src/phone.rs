//! Indian mobile number normalization.
//!
//! The gateway adds the country code itself, so numbers are sent as bare
//! 10-digit strings.

const COUNTRY_PREFIX: &str = "+91";

/// Number of digits in a valid national mobile number.
pub const NATIONAL_DIGITS: usize = 10;

/// Strips formatting and a leading `+91`. Returns `None` unless exactly
/// ten ASCII digits remain.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
        .collect();
    let national = compact.strip_prefix(COUNTRY_PREFIX).unwrap_or(&compact);

    (national.len() == NATIONAL_DIGITS && national.bytes().all(|b| b.is_ascii_digit()))
        .then(|| national.to_string())
}

/// Normalizes every number, silently dropping the invalid ones.
#[must_use]
pub fn normalize_numbers<S: AsRef<str>>(numbers: &[S]) -> Vec<String> {
    numbers
        .iter()
        .filter_map(|n| {
            let normalized = normalize_phone(n.as_ref());
            if normalized.is_none() {
                log::debug!("Dropping invalid phone number");
            }
            normalized
        })
        .collect()
}
