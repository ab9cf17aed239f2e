//! Object metadata parsed from the multiline `headers` input

use crate::error::{Error, Result};
use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, HashSet};

/// Prefix marking a custom metadata key
pub const CUSTOM_METADATA_PREFIX: &str = "x-goog-meta-";

/// Metadata applied to every uploaded object
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_type: Option<String>,
    /// RFC 3339 timestamp
    pub custom_time: Option<String>,
    /// Custom key/value pairs, keys without [`CUSTOM_METADATA_PREFIX`]
    pub custom: BTreeMap<String, String>,
}

impl ObjectMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Parse `key: value` lines into [`ObjectMetadata`].
///
/// Keys are case-insensitive. Unknown keys outside the custom metadata prefix
/// are rejected, as are repeated keys and malformed `custom-time` values.
pub fn parse_headers(input: &str) -> Result<ObjectMetadata> {
    let mut metadata = ObjectMetadata::default();
    let mut seen = HashSet::new();

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidHeader(format!("expected 'key: value', got '{line}'")))?;
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim().to_string();

        if key.is_empty() {
            return Err(Error::InvalidHeader(format!("missing key in '{line}'")));
        }
        if !seen.insert(key.clone()) {
            return Err(Error::DuplicateHeader(key));
        }

        match key.as_str() {
            "cache-control" => metadata.cache_control = Some(value),
            "content-disposition" => metadata.content_disposition = Some(value),
            "content-encoding" => metadata.content_encoding = Some(value),
            "content-language" => metadata.content_language = Some(value),
            "content-type" => metadata.content_type = Some(value),
            "custom-time" => {
                DateTime::<FixedOffset>::parse_from_rfc3339(&value).map_err(|e| {
                    Error::InvalidHeader(format!("custom-time '{value}' is not RFC 3339: {e}"))
                })?;
                metadata.custom_time = Some(value);
            }
            _ => match key.strip_prefix(CUSTOM_METADATA_PREFIX) {
                Some(custom) if !custom.is_empty() => {
                    metadata.custom.insert(custom.to_string(), value);
                }
                _ => return Err(Error::InvalidHeader(format!("unrecognized header '{key}'"))),
            },
        }
    }

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert!(parse_headers("").unwrap().is_empty());
        assert!(parse_headers("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_known_and_custom() {
        let metadata = parse_headers(
            "Cache-Control: public, max-age=3600\n\
             content-type: application/json\n\
             custom-time: 2024-01-02T03:04:05Z\n\
             x-goog-meta-Build: 42\n\
             x-goog-meta-url: https://example.com/a:b",
        )
        .unwrap();

        assert_eq!(metadata.cache_control.as_deref(), Some("public, max-age=3600"));
        assert_eq!(metadata.content_type.as_deref(), Some("application/json"));
        assert_eq!(metadata.custom_time.as_deref(), Some("2024-01-02T03:04:05Z"));
        assert_eq!(metadata.custom.get("build").map(String::as_str), Some("42"));
        assert_eq!(
            metadata.custom.get("url").map(String::as_str),
            Some("https://example.com/a:b")
        );
    }

    #[test]
    fn test_unknown_header_is_rejected() {
        let err = parse_headers("x-unknown: 1").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));

        let err = parse_headers("x-goog-meta-: 1").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn test_duplicate_header() {
        let err = parse_headers("content-type: a\nContent-Type: b").unwrap_err();
        assert!(matches!(err, Error::DuplicateHeader(key) if key == "content-type"));
    }

    #[test]
    fn test_missing_separator() {
        assert!(matches!(parse_headers("content-type"), Err(Error::InvalidHeader(_))));
        assert!(matches!(parse_headers(": value"), Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_custom_time_must_be_rfc3339() {
        assert!(matches!(
            parse_headers("custom-time: yesterday"),
            Err(Error::InvalidHeader(_))
        ));
    }
}
