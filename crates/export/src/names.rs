//! Filename conventions and download-name hygiene.
//!
//! Single: `<custom_or_default>.xlsx` where the default is
//! `<type>_<template>_<short_id>_<DD-MM-YYYY>_<HHMMSS>.xlsx`.
//! Chunk: `<custom_base>_batch_<i>_of_<n>.xlsx` or
//! `<type>_<template>_<short_id>_batch_<i>_<DD-MM-YYYY>_<HHMMSS>.xlsx`.
//! Archive: `<custom_base>_complete_export.zip` or
//! `<type>_<template>_<short_id>_complete_<DD-MM-YYYY>.zip`.

use chrono::{DateTime, Utc};

use crate::templates::ExportType;

/// Characters never allowed in a disposition filename.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length of a sanitized download filename.
const MAX_FILENAME_LEN: usize = 200;

/// First 8 characters of an export id, used in generated names.
pub fn short_id(id: &str) -> &str {
    let end = id
        .char_indices()
        .nth(8)
        .map(|(i, _)| i)
        .unwrap_or(id.len());
    &id[..end]
}

/// Sanitizes a filename for a `Content-Disposition` header.
///
/// Removes path separators and the forbidden character set, truncates to
/// 200 characters, and guarantees an extension (falling back to
/// `default_ext` when the name has none).
pub fn sanitize_filename(name: &str, default_ext: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect();
    // Strip any remaining traversal fragments left by separator removal.
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    let cleaned = cleaned.trim().trim_matches('.');
    let mut cleaned = if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned.to_string()
    };
    if cleaned.len() > MAX_FILENAME_LEN {
        cleaned.truncate(MAX_FILENAME_LEN);
    }
    if !has_extension(&cleaned) {
        cleaned.push('.');
        cleaned.push_str(default_ext);
    }
    cleaned
}

fn has_extension(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Strips a recognized extension from a custom name to obtain its base.
fn base_of(custom: &str) -> &str {
    match custom.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        _ => custom,
    }
}

/// Filename for a single-strategy artifact.
pub fn single_filename(
    custom: Option<&str>,
    export_type: ExportType,
    template: &str,
    id: &str,
    now: DateTime<Utc>,
    ext: &str,
) -> String {
    match custom {
        Some(name) => sanitize_filename(name, ext),
        None => format!(
            "{}_{}_{}_{}_{}.{}",
            export_type,
            template,
            short_id(id),
            now.format("%d-%m-%Y"),
            now.format("%H%M%S"),
            ext
        ),
    }
}

/// Filename for the `i`-th of `n` chunks.
pub fn chunk_filename(
    custom: Option<&str>,
    export_type: ExportType,
    template: &str,
    id: &str,
    index: u64,
    total: u64,
    now: DateTime<Utc>,
    ext: &str,
) -> String {
    match custom {
        Some(name) => sanitize_filename(
            &format!("{}_batch_{}_of_{}.{}", base_of(name), index, total, ext),
            ext,
        ),
        None => format!(
            "{}_{}_{}_batch_{}_{}_{}.{}",
            export_type,
            template,
            short_id(id),
            index,
            now.format("%d-%m-%Y"),
            now.format("%H%M%S"),
            ext
        ),
    }
}

/// Filename for the compressed archive of a multi-strategy export.
pub fn archive_filename(
    custom: Option<&str>,
    export_type: ExportType,
    template: &str,
    id: &str,
    now: DateTime<Utc>,
) -> String {
    match custom {
        Some(name) => sanitize_filename(&format!("{}_complete_export.zip", base_of(name)), "zip"),
        None => format!(
            "{}_{}_{}_complete_{}.zip",
            export_type,
            template,
            short_id(id),
            now.format("%d-%m-%Y")
        ),
    }
}
