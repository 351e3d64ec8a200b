//! Validation predicates and combinators
//!
//! Every predicate is pure and returns `bool`. Form code turns failures into
//! per-field messages; nothing here returns errors.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone pattern is valid"));

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern is valid"));

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("username pattern is valid"));

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("hex color pattern is valid")
});

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
        .expect("domain pattern is valid")
});

/// Minimum length accepted by [`is_strong_password`].
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// Absolute http(s) URL with a host.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Digits with an optional leading `+`; spaces, dashes, dots and parentheses are ignored.
pub fn is_valid_phone(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    PHONE_RE.is_match(&compact)
}

/// At least [`MIN_PASSWORD_LENGTH`] characters with an uppercase letter, a
/// lowercase letter, a digit and a non-alphanumeric character.
pub fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= MIN_PASSWORD_LENGTH
        && value.chars().any(|c| c.is_uppercase())
        && value.chars().any(|c| c.is_lowercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace())
}

/// Luhn checksum over 13 to 19 digits. Spaces and dashes are ignored.
pub fn is_valid_credit_card(value: &str) -> bool {
    let digits: Vec<u32> = value
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default();

    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

pub fn is_valid_slug(value: &str) -> bool {
    SLUG_RE.is_match(value)
}

/// 3 to 20 characters of letters, digits and underscores.
pub fn is_valid_username(value: &str) -> bool {
    USERNAME_RE.is_match(value)
}

pub fn is_valid_hex_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Dotted-quad IPv4 without leading zeros.
pub fn is_valid_ipv4(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

pub fn is_valid_domain(value: &str) -> bool {
    value.len() <= 253 && DOMAIN_RE.is_match(value)
}

pub fn is_valid_json(value: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(value).is_ok()
}

pub fn is_empty(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_not_empty(value: &str) -> bool {
    !is_empty(value)
}

/// Character count, not byte count.
pub fn has_min_length(value: &str, min: usize) -> bool {
    value.chars().count() >= min
}

pub fn has_max_length(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

pub fn is_length_between(value: &str, min: usize, max: usize) -> bool {
    has_min_length(value, min) && has_max_length(value, max)
}

/// Inclusive range check.
pub fn is_in_range<T: PartialOrd>(value: T, min: T, max: T) -> bool {
    value >= min && value <= max
}

/// Passes when every validator passes. An empty list passes.
pub fn all<T: ?Sized>(validators: Vec<Box<dyn Fn(&T) -> bool + Send + Sync>>) -> impl Fn(&T) -> bool {
    move |value| validators.iter().all(|validate| validate(value))
}

/// Passes when at least one validator passes. An empty list fails.
pub fn any<T: ?Sized>(validators: Vec<Box<dyn Fn(&T) -> bool + Send + Sync>>) -> impl Fn(&T) -> bool {
    move |value| validators.iter().any(|validate| validate(value))
}

pub fn not<T: ?Sized, F>(validator: F) -> impl Fn(&T) -> bool
where
    F: Fn(&T) -> bool,
{
    move |value| !validator(value)
}
