//! Pure formatting helpers shared by the template functions and the entry
//! model. Path helpers operate on `/`-separated strings, never on the host
//! filesystem.

use chrono::format::{Item, StrftimeItems};
use chrono::{TimeZone, Utc};

use super::template::TemplateError;

/// Layout used by the pre-formatted `*TimeFormatted` fields.
pub const DEFAULT_DATE_LAYOUT: &str = "%Y/%m/%d";

const KB: i64 = 1024;
const MB: i64 = KB * 1024;
const GB: i64 = MB * 1024;
const TB: i64 = GB * 1024;

/// Format a byte count in the requested unit.
///
/// Fixed units (`b`/`bytes`, `kb`, `mb`, `gb`, `tb`, any case) print the
/// truncated integer quotient with no suffix. `auto` picks the largest unit
/// in which the value is at least one and appends the unit suffix. Unknown
/// units fall back to plain bytes.
pub fn format_size(size: i64, unit: &str) -> String {
    match unit.to_ascii_lowercase().as_str() {
        "b" | "bytes" => size.to_string(),
        "kb" => (size / KB).to_string(),
        "mb" => (size / MB).to_string(),
        "gb" => (size / GB).to_string(),
        "tb" => (size / TB).to_string(),
        "auto" => match size {
            s if s < KB => format!("{s}B"),
            s if s < MB => format!("{}KB", s / KB),
            s if s < GB => format!("{}MB", s / MB),
            s if s < TB => format!("{}GB", s / GB),
            s => format!("{}TB", s / TB),
        },
        _ => size.to_string(),
    }
}

/// Format seconds since the epoch (UTC) with a strftime layout. Zero or
/// negative timestamps mean "unknown" and format as the empty string.
pub fn format_unix(secs: i64, layout: &str) -> Result<String, TemplateError> {
    if secs <= 0 {
        return Ok(String::new());
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(layout).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(TemplateError::Exec(format!("invalid time layout {layout:?}")));
    }
    let time = Utc
        .timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| TemplateError::Exec(format!("timestamp {secs} out of range")))?;
    Ok(time.format_with_items(items.into_iter()).to_string())
}

/// Lexically normalise a slash-separated path: collapse repeated
/// separators, drop `.` elements and resolve `..` where possible.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !rooted {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if rooted {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Last element of a path; `.` for empty input, `/` for the root.
pub fn base_name(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// Everything but the last element, cleaned.
pub fn dir_name(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => clean_path(&path[..=idx]),
        None => ".".to_string(),
    }
}

/// Extension of the last path element including the dot, or empty.
pub fn extension(path: &str) -> String {
    let last = match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    };
    match last.rfind('.') {
        Some(idx) => last[idx..].to_string(),
        None => String::new(),
    }
}

/// Join the non-empty elements with `/` and clean the result.
pub fn join_path<S: AsRef<str>>(elements: &[S]) -> String {
    let parts: Vec<&str> = elements
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() {
        return String::new();
    }
    clean_path(&parts.join("/"))
}
