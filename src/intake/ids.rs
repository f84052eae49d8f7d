//! Human-readable record identifiers.
//!
//! Format: `<PREFIX>-<millis base36>-<8 random base36>`, upper-cased,
//! e.g. `TR-LZ3K9Q2A-7H2KD0QX`. Uniqueness is probabilistic; the store's
//! unique key turns the rare collision into a `Conflict`.

use chrono::Utc;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

pub const REPORT_PREFIX: &str = "TR";
pub const CASE_PREFIX: &str = "CS";

const RANDOM_SUFFIX_LEN: usize = 8;
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

lazy_static! {
    static ref ID_PATTERN: Regex = Regex::new(r"^([A-Z]{2})-([0-9A-Z]+)-([0-9A-Z]+)$").unwrap();
}

/// Encode `value` in upper-case base36.
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    format!(
        "{}-{}-{}",
        prefix,
        to_base36(millis),
        random_base36(RANDOM_SUFFIX_LEN)
    )
}

pub fn new_report_id() -> String {
    generate_id(REPORT_PREFIX)
}

pub fn new_case_id() -> String {
    generate_id(CASE_PREFIX)
}

/// Check `id` has the `<prefix>-<base36>-<base36>` shape.
pub fn is_well_formed(id: &str, prefix: &str) -> bool {
    ID_PATTERN
        .captures(id)
        .map(|caps| &caps[1] == prefix)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1_295), "ZZ");
    }

    #[test]
    fn test_report_id_shape() {
        let id = new_report_id();
        assert!(is_well_formed(&id, REPORT_PREFIX), "bad id {}", id);
        assert!(!is_well_formed(&id, CASE_PREFIX));
    }

    #[test]
    fn test_malformed_ids() {
        assert!(!is_well_formed("TR-abc-123", REPORT_PREFIX));
        assert!(!is_well_formed("TR--123", REPORT_PREFIX));
        assert!(!is_well_formed("TR-ABC", REPORT_PREFIX));
    }

    #[test]
    fn test_ten_thousand_unique() {
        let ids: HashSet<String> = (0..10_000).map(|_| new_report_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }
}
