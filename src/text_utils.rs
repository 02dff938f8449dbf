use std::path::Path;

use chrono::{DateTime, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{DraftError, DraftResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a post date. `YYYY-MM-DD` is the canonical form; an RFC 3339 timestamp
/// is accepted and truncated to its date.
pub fn parse_post_date(buf: &str) -> DraftResult<NaiveDate> {
    lazy_static! {
        static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    }

    let buf = buf.trim();
    if ISO_DATE.is_match(buf) {
        return NaiveDate::parse_from_str(buf, DATE_FORMAT)
            .map_err(|_| DraftError::InvalidDate(buf.to_string()));
    }

    match DateTime::parse_from_rfc3339(buf) {
        Ok(date_time) => Ok(date_time.date_naive()),
        Err(_) => Err(DraftError::InvalidDate(buf.to_string())),
    }
}

/// Lenient variant used for sorting entries already on disk.
pub fn try_parse_date(buf: &str) -> Option<NaiveDate> {
    parse_post_date(buf).ok()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Slug of a draft: its file stem, lowercased. Never derived from the title.
pub fn slug_from_file_name(file_name: &Path) -> DraftResult<String> {
    lazy_static! {
        static ref SLUG: Regex = Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap();
    }

    let stem = file_name
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let slug = stem.trim().to_lowercase();

    if SLUG.is_match(&slug) {
        Ok(slug)
    } else {
        Err(DraftError::InvalidSlug(stem.to_string()))
    }
}

/// Turns a free-form title into a slug for new drafts.
pub fn slug_from_title(title: &str) -> String {
    let ascii = unidecode::unidecode(title).to_lowercase();

    let mut slug = String::new();
    let mut prev_dash = true;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

/// Metadata keys are matched case-insensitively, ignoring `_`, `-` and spaces.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !(c.is_whitespace() || *c == '_' || *c == '-'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Base name of a path or URL-like reference (`../img/a.png` -> `a.png`).
pub fn basename(reference: &str) -> &str {
    let reference = reference.split(&['?', '#'][..]).next().unwrap_or(reference);
    reference
        .rsplit(&['/', '\\'][..])
        .find(|s| !s.is_empty())
        .unwrap_or(reference)
}

pub fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
