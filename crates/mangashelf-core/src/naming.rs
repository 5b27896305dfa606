//! Deterministic, filesystem-safe names for series directories and cover archives.

use std::path::Path;

/// Label used for covers that are not attached to a volume.
pub const NO_VOLUME: &str = "No Volume";

/// Longest name (in bytes) kept for a single path component.
const COMPONENT_MAX: usize = 200;

/// Characters that are not allowed in file names on at least one common platform.
const RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Makes `name` usable as a single path component.
///
/// - Replaces `<>:"/\|?*` and control characters with `_`
/// - Trims surrounding whitespace and trailing dots
/// - Limits length to 200 bytes on a char boundary
/// - Returns `_` for names that end up empty (or are `.`/`..`)
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim().trim_end_matches('.').trim_end();
    let mut take = trimmed.len().min(COMPONENT_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    let out = &trimmed[..take];
    if out.is_empty() || out == "." || out == ".." {
        "_".to_string()
    } else {
        out.to_string()
    }
}

/// Human-readable qualifier for a cover's volume: `Volume 3`, or [`NO_VOLUME`].
pub fn volume_label(volume: Option<&str>) -> String {
    match volume.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => format!("Volume {}", v),
        None => NO_VOLUME.to_string(),
    }
}

/// Archive name for one cover, e.g. `Yotsuba&! - Volume 1.zip`.
pub fn cover_file_name(title: &str, volume: Option<&str>) -> String {
    let stem = sanitize_component(&format!("{} - {}", title, volume_label(volume)));
    format!("{}.zip", stem)
}

/// Name of the image inside the archive: `cover.<ext>` from the upload's file name.
///
/// Returns `None` when the file name has no extension.
pub fn cover_entry_name(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    if ext.is_empty() {
        return None;
    }
    Some(format!("cover.{}", ext.to_ascii_lowercase()))
}
