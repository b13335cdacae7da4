//! Internal helpers for input normalization and validation.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so the engine enforces the same rules everywhere.

use unicode_normalization::UnicodeNormalization;

use crate::{EngineError, ResultEngine};

/// Canonical form of an email used for lookups: NFKC, trimmed, lowercase.
pub(crate) fn normalize_email(value: &str) -> String {
    value.trim().nfkc().collect::<String>().to_lowercase()
}

/// Normalizes `value` and checks it looks like an email address.
pub(crate) fn require_email(value: &str) -> ResultEngine<String> {
    let email = normalize_email(value);
    if email.is_empty() {
        return Err(EngineError::Validation("email must not be empty".to_string()));
    }
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        })
        && !email.chars().any(char::is_whitespace);
    if !valid {
        return Err(EngineError::Validation(format!("invalid email: {email}")));
    }
    Ok(email)
}

/// Trims `value` and rejects it when empty.
pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}
