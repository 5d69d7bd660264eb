//! Vulnerability verdicts for a single response

use once_cell::sync::Lazy;
use regex::Regex;

/// Database error fingerprints: SQL syntax references, vendor names, SQLSTATE
static DB_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(sql syntax|syntax error at or near|unclosed quotation mark|quoted string not properly terminated|sqlstate|mysql|mariadb|postgres|pg_query|sqlite|ora-\d{5}|oracle error|microsoft sql server|odbc|jdbc|sequelizedatabaseerror)",
    )
    .expect("valid regex")
});

/// Strings that only appear in real system files
pub const TRAVERSAL_SENTINELS: &[&str] = &["root:", "[boot loader]"];

/// Database fingerprint found in a body, if any
pub fn db_fingerprint(body: &str) -> Option<&str> {
    DB_ERROR.find(body).map(|m| m.as_str())
}

pub fn sql_injection(status: u16, body: &str) -> Option<String> {
    if status != 200 && status != 500 {
        return None;
    }
    db_fingerprint(body).map(|f| format!("status {} with database error '{}'", status, f))
}

/// HTML-escaped form of a payload
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

pub fn xss(body: &str, payload: &str) -> Option<String> {
    (body.contains(payload) && !body.contains(&html_escape(payload)))
        .then(|| "payload reflected without escaping".to_string())
}

pub fn path_traversal(body: &str) -> Option<String> {
    TRAVERSAL_SENTINELS
        .iter()
        .find(|s| body.contains(*s))
        .map(|s| format!("system file content '{}' in response", s))
}

/// 500 and 413 both count as vulnerable
pub fn oversized(status: u16) -> Option<String> {
    matches!(status, 500 | 413).then(|| format!("status {} for oversized body", status))
}

pub fn negative_value(status: u16, body: &str) -> Option<String> {
    (status < 400 && !body.contains("error")).then(|| format!("negative values accepted with status {}", status))
}

pub fn unauthorized(status: u16) -> Option<String> {
    (status < 400).then(|| format!("status {} without credentials", status))
}
