//! PII scrubbing for anonymous reporters.
//!
//! A reporter who asks for anonymity still submits a name (and often
//! contact details, sometimes pasted into the description). Staff-facing
//! copies drop the contact fields and replace contact details found in
//! free text with placeholder tokens.

use lazy_static::lazy_static;
use regex::Regex;

use crate::logging::structured::LogContext;
use crate::storage::ReporterInfo;

/// Name shown to staff for anonymous reporters.
pub const ANONYMOUS_NAME: &str = "Anonymous";

lazy_static! {
    static ref EMAIL_PATTERN: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    /// Local (0xx xxx xxxx) and international (+94 7x xxx xxxx) forms.
    static ref PHONE_PATTERN: Regex = Regex::new(
        r"(?:\+\d{1,3}[-.\s]?)?\(?\d{2,3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b"
    ).unwrap();
}

#[derive(Debug, Default, PartialEq)]
pub struct PiiScrubResult {
    pub emails_found: usize,
    pub phones_found: usize,
}

impl PiiScrubResult {
    pub fn total_entities(&self) -> usize {
        self.emails_found + self.phones_found
    }
}

/// Replace emails and phone numbers with `[EMAIL]` / `[PHONE]`.
pub fn scrub_text(text: &str, ctx: &LogContext) -> (String, PiiScrubResult) {
    let mut result = PiiScrubResult::default();
    let mut scrubbed = text.to_string();

    let email_count = EMAIL_PATTERN.find_iter(&scrubbed).count();
    if email_count > 0 {
        result.emails_found = email_count;
        scrubbed = EMAIL_PATTERN.replace_all(&scrubbed, "[EMAIL]").to_string();
    }

    let phone_count = PHONE_PATTERN.find_iter(&scrubbed).count();
    if phone_count > 0 {
        result.phones_found = phone_count;
        scrubbed = PHONE_PATTERN.replace_all(&scrubbed, "[PHONE]").to_string();
    }

    if result.total_entities() > 0 {
        log::info!(
            "{} PII_SCRUBBED emails={} phones={}",
            ctx,
            result.emails_found,
            result.phones_found
        );
    }

    (scrubbed, result)
}

/// Staff-facing copy of reporter details.
///
/// Identified reporters pass through unchanged.
pub fn redact_reporter(reporter: &ReporterInfo) -> ReporterInfo {
    if !reporter.is_anonymous {
        return reporter.clone();
    }
    ReporterInfo {
        name: ANONYMOUS_NAME.to_string(),
        email: None,
        phone: None,
        is_anonymous: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> LogContext {
        LogContext::new("test-req")
    }

    #[test]
    fn test_email_scrubbing() {
        let (scrubbed, result) = scrub_text("Contact kamal@example.com for directions", &ctx());
        assert_eq!(scrubbed, "Contact [EMAIL] for directions");
        assert_eq!(result.emails_found, 1);
    }

    #[test]
    fn test_phone_scrubbing() {
        let (scrubbed, result) = scrub_text("Call me on 077 123 4567 tonight", &ctx());
        assert_eq!(scrubbed, "Call me on [PHONE] tonight");
        assert_eq!(result.phones_found, 1);
    }

    #[test]
    fn test_coordinates_untouched() {
        let original = "Snares near 6.9271, 79.8612 by the river";
        let (scrubbed, result) = scrub_text(original, &ctx());
        assert_eq!(scrubbed, original);
        assert_eq!(result.total_entities(), 0);
    }

    #[test]
    fn test_redact_anonymous_reporter() {
        let reporter = ReporterInfo {
            name: "Saman".to_string(),
            email: Some("saman@example.org".to_string()),
            phone: Some("0771234567".to_string()),
            is_anonymous: true,
        };
        let redacted = redact_reporter(&reporter);
        assert_eq!(redacted.name, ANONYMOUS_NAME);
        assert!(redacted.email.is_none());
        assert!(redacted.phone.is_none());
    }

    #[test]
    fn test_identified_reporter_unchanged() {
        let reporter = ReporterInfo {
            name: "Saman".to_string(),
            email: Some("saman@example.org".to_string()),
            phone: None,
            is_anonymous: false,
        };
        assert_eq!(redact_reporter(&reporter), reporter);
    }
}
