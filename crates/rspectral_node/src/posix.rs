//! Lexical POSIX path helpers.
//!
//! Guest code always sees slash separated paths, regardless of the host
//! platform. None of these functions touch the filesystem.

use crate::error::ShimError;

/// Path segment separator.
pub const SEPARATOR: char = '/';

/// `PATH` list delimiter.
pub const DELIMITER: char = ':';

/// Returns `true` if the path is rooted.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Returns the shortest lexically equivalent path.
///
/// Repeated separators collapse, `.` elements are dropped, and `..`
/// elements consume the preceding element where one exists. An empty
/// result becomes `.` (or `/` for rooted paths).
pub fn clean(path: &str) -> String {
    let rooted = is_absolute(path);
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split(SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Joins the non-empty segments with a separator and cleans the result.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(AsRef::as_ref)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if joined.is_empty() {
        ".".to_string()
    } else {
        clean(&joined)
    }
}

/// Resolves the segments right to left until an absolute path is formed.
///
/// When no segment is absolute the cleaned relative result is returned;
/// callers that need an absolute path pass the working directory first.
pub fn resolve<S: AsRef<str>>(segments: &[S]) -> String {
    let mut collected: Vec<&str> = Vec::new();

    for segment in segments.iter().rev().map(AsRef::as_ref) {
        if segment.is_empty() {
            continue;
        }
        collected.push(segment);
        if is_absolute(segment) {
            break;
        }
    }

    collected.reverse();
    join(&collected)
}

/// Returns the directory portion of a path, Node style.
pub fn dirname(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let trimmed = path.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        return "/".to_string();
    }

    match trimmed.rfind(SEPARATOR) {
        None => ".".to_string(),
        Some(index) => {
            let dir = trimmed[..index].trim_end_matches(SEPARATOR);
            if dir.is_empty() {
                "/".to_string()
            } else {
                dir.to_string()
            }
        }
    }
}

/// Returns the last element of a path, optionally stripping a suffix.
pub fn basename(path: &str, suffix: Option<&str>) -> String {
    let trimmed = path.trim_end_matches(SEPARATOR);
    let base = match trimmed.rfind(SEPARATOR) {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    };

    match suffix {
        Some(suffix) if !suffix.is_empty() && base != suffix => {
            base.strip_suffix(suffix).unwrap_or(base).to_string()
        }
        _ => base.to_string(),
    }
}

/// Returns the extension of the last element, including the dot.
///
/// A leading dot (`.bashrc`) does not start an extension.
pub fn extname(path: &str) -> String {
    let base = basename(path, None);
    match base.rfind('.') {
        Some(0) | None => String::new(),
        Some(index) => base[index..].to_string(),
    }
}

/// Returns `target` expressed relative to `base`, lexically.
///
/// Both paths are cleaned first. Fails when exactly one of them is
/// absolute, or when `base` climbs above a point `target` shares.
pub fn relative(base: &str, target: &str) -> Result<String, ShimError> {
    let base_clean = clean(base);
    let target_clean = clean(target);

    if base_clean == target_clean {
        return Ok(".".to_string());
    }
    if is_absolute(&base_clean) != is_absolute(&target_clean) {
        return Err(ShimError::not_relative(base, target));
    }

    let base_parts = components(&base_clean);
    let target_parts = components(&target_clean);
    let common = base_parts
        .iter()
        .zip(&target_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let climbs = &base_parts[common..];
    if climbs.contains(&"..") {
        return Err(ShimError::not_relative(base, target));
    }

    let mut parts: Vec<&str> = vec![".."; climbs.len()];
    parts.extend_from_slice(&target_parts[common..]);
    Ok(parts.join("/"))
}

fn components(cleaned: &str) -> Vec<&str> {
    cleaned
        .split(SEPARATOR)
        .filter(|part| !part.is_empty() && *part != ".")
        .collect()
}
