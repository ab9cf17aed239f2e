//! Object key computation
//!
//! Pure functions mapping a local file to its remote object key. Keys are
//! `/`-separated, never start with `/` and never contain `.` or `..` segments.

/// A `bucket[/prefix]` destination split into its parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub bucket: String,
    pub prefix: String,
}

/// Split a destination on its first `/` into bucket name and key prefix.
pub fn parse_destination(input: &str) -> Destination {
    let trimmed = input.trim();
    let (bucket, prefix) = trimmed.split_once('/').unwrap_or((trimmed, ""));

    Destination {
        bucket: bucket.trim().to_string(),
        prefix: prefix.trim().to_string(),
    }
}

/// Compute the object key for `relative_file`.
///
/// With `include_parent`, the last segment of `given_root` (as the caller
/// wrote it) is inserted before the file path; a non-empty `prefix` goes in
/// front of everything. Callers only set `include_parent` for directory roots.
pub fn compute_destination(
    given_root: &str,
    relative_file: &str,
    prefix: &str,
    include_parent: bool,
) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);

    parts.push(prefix);
    if include_parent {
        parts.extend(root_basename(given_root));
    }
    parts.push(relative_file);

    // Each part is normalized on its own so a `..` never climbs into the prefix
    parts
        .into_iter()
        .map(normalize_object_key)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Normalize a raw key: unify separators, drop empty and `.` segments,
/// resolve `..` lexically (a `..` with nothing left to pop is discarded).
pub fn normalize_object_key(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(segment),
        }
    }

    parts.join("/")
}

fn root_basename(given_root: &str) -> Option<&str> {
    given_root
        .trim()
        .rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
}
