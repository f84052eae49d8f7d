//! Injection-pattern scan for citizen-supplied free text.
//!
//! Reports arrive unauthenticated, so descriptions, addresses and notes
//! are scanned for XSS, SQL injection and shell injection patterns.
//! Detections are logged, the text itself is stored unmodified so
//! investigators see exactly what was submitted.

use lazy_static::lazy_static;
use regex::Regex;

use crate::logging::structured::LogContext;

/// Longest accepted free-text field, in bytes.
pub const MAX_TEXT_FIELD: usize = 20_000;

lazy_static! {
    static ref XSS_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)<script[^>]*>").unwrap(),
        Regex::new(r"(?i)javascript:").unwrap(),
        Regex::new(r"(?i)\bon\w+\s*=").unwrap(),
        Regex::new(r"(?i)<iframe[^>]*>").unwrap(),
    ];

    static ref SQL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)'\s*(or|and)\s*'?\d").unwrap(),
        Regex::new(r"(?i);\s*(drop|delete|truncate|alter)\s").unwrap(),
        Regex::new(r"(?i)union\s+(all\s+)?select").unwrap(),
    ];

    static ref CMD_PATTERNS: Vec<Regex> = vec![
        Regex::new(r";\s*(rm|cat|wget|curl|chmod)\s").unwrap(),
        Regex::new(r"\|\s*(bash|sh|zsh|cmd)").unwrap(),
        Regex::new(r"\$\([^)]+\)").unwrap(),
    ];
}

#[derive(Debug, Default)]
pub struct SanitizationResult {
    pub xss_detections: usize,
    pub sql_detections: usize,
    pub cmd_detections: usize,
    pub oversized_fields: usize,
}

impl SanitizationResult {
    pub fn total_detections(&self) -> usize {
        self.xss_detections + self.sql_detections + self.cmd_detections + self.oversized_fields
    }

    pub fn has_detections(&self) -> bool {
        self.total_detections() > 0
    }
}

/// Scan named text fields and log what was found.
pub fn scan_fields(fields: &[(&str, &str)], ctx: &LogContext) -> SanitizationResult {
    let mut result = SanitizationResult::default();

    for (name, text) in fields {
        scan_string(name, text, ctx, &mut result);
    }

    if result.has_detections() {
        log::warn!(
            "{} SECURITY_DETECTIONS xss={} sql={} cmd={} oversized={}",
            ctx,
            result.xss_detections,
            result.sql_detections,
            result.cmd_detections,
            result.oversized_fields
        );
    } else {
        log::debug!("{} SANITIZE_COMPLETE detections=0", ctx);
    }

    result
}

fn scan_string(field: &str, s: &str, ctx: &LogContext, result: &mut SanitizationResult) {
    if s.len() > MAX_TEXT_FIELD {
        log::debug!(
            "{} SIZE_LIMIT_EXCEEDED field={} size={} limit={}",
            ctx,
            field,
            s.len(),
            MAX_TEXT_FIELD
        );
        result.oversized_fields += 1;
    }

    let groups: [(&str, &Vec<Regex>, &mut usize); 3] = [
        ("xss", &*XSS_PATTERNS, &mut result.xss_detections),
        ("sql", &*SQL_PATTERNS, &mut result.sql_detections),
        ("cmd", &*CMD_PATTERNS, &mut result.cmd_detections),
    ];

    for (kind, patterns, counter) in groups {
        for pattern in patterns.iter() {
            if pattern.is_match(s) {
                log::debug!(
                    "{} PATTERN_DETECTED field={} type={} pattern={}",
                    ctx,
                    field,
                    kind,
                    pattern.as_str()
                );
                *counter += 1;
            }
        }
    }
}
