//! Configuration constants and validation functions for the digester.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::error::{DigestError, Result};

/// Separator between element names in a match path.
pub const PATH_SEPARATOR: char = '/';

/// Prefix marking a pattern as a suffix (wildcard) pattern.
pub const WILDCARD_PREFIX: &str = "*/";

/// Qualified type name: optional `ns::` segments followed by a name that
/// starts with a letter.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static CLASS_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9_\-]+::)*[A-Za-z][A-Za-z0-9_]*$").expect("valid regex")
});

/// One pattern segment: anything but a separator or a wildcard.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SEGMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^/*\s]+$").expect("valid regex"));

/// Options applied to every parse run by a [`crate::Digester`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DigesterConfig {
    /// Upper-case element and attribute names before matching.
    pub case_folding: bool,

    /// Default for set-properties rules created through the digester:
    /// skip attributes that have no matching property instead of failing.
    pub ignore_missing_property: bool,
}

impl Default for DigesterConfig {
    fn default() -> Self {
        Self {
            case_folding: false,
            ignore_missing_property: true,
        }
    }
}

/// Strip a single trailing separator from a pattern.
///
/// A lone `/` is left untouched so that validation can reject it.
///
/// # Examples
/// ```
/// use regelrecht_digester::config::normalize_pattern;
///
/// assert_eq!(normalize_pattern("config/server/"), "config/server");
/// assert_eq!(normalize_pattern("config/server"), "config/server");
/// ```
pub fn normalize_pattern(pattern: &str) -> &str {
    if pattern.len() > 1 {
        pattern.strip_suffix(PATH_SEPARATOR).unwrap_or(pattern)
    } else {
        pattern
    }
}

/// Validate a (normalized) rule pattern.
///
/// # Returns
/// * `Ok(())` for `a/b/c` style patterns, optionally prefixed with `*/`
/// * `Err(DigestError::Protocol)` for empty patterns, empty segments or a
///   misplaced `*`
///
/// # Examples
/// ```
/// use regelrecht_digester::config::validate_pattern;
///
/// assert!(validate_pattern("config/server").is_ok());
/// assert!(validate_pattern("*/server").is_ok());
/// assert!(validate_pattern("config//server").is_err());
/// assert!(validate_pattern("config/*/server").is_err());
/// ```
pub fn validate_pattern(pattern: &str) -> Result<()> {
    let body = pattern.strip_prefix(WILDCARD_PREFIX).unwrap_or(pattern);

    if body.is_empty() || !body.split(PATH_SEPARATOR).all(|s| SEGMENT_PATTERN.is_match(s)) {
        return Err(DigestError::protocol(format!(
            "malformed pattern '{pattern}'"
        )));
    }

    Ok(())
}

/// Validate a qualified type name such as `app::config::Server`.
///
/// # Examples
/// ```
/// use regelrecht_digester::config::validate_class_name;
///
/// assert!(validate_class_name("Server").is_ok());
/// assert!(validate_class_name("app::config::Server").is_ok());
/// assert!(validate_class_name("9Server").is_err());
/// ```
pub fn validate_class_name(name: &str) -> Result<()> {
    if CLASS_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(DigestError::IllegalClassName(name.to_string()))
    }
}

/// Return the last `::` segment of a qualified type name.
pub fn simple_class_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_pattern() {
        assert_eq!(normalize_pattern("a/b/"), "a/b");
        assert_eq!(normalize_pattern("*/b/"), "*/b");
        assert_eq!(normalize_pattern("/"), "/");
        assert_eq!(normalize_pattern(""), "");
    }

    #[test]
    fn test_validate_pattern() {
        assert!(validate_pattern("root").is_ok());
        assert!(validate_pattern("root/item.nr").is_ok());
        assert!(validate_pattern("*/item").is_ok());
        assert!(validate_pattern("*/a/b").is_ok());

        assert!(validate_pattern("").is_err());
        assert!(validate_pattern("/").is_err());
        assert!(validate_pattern("/root").is_err());
        assert!(validate_pattern("*").is_err());
        assert!(validate_pattern("*/").is_err());
        assert!(validate_pattern("a/*").is_err());
        assert!(validate_pattern("a b").is_err());
    }

    #[test]
    fn test_validate_class_name() {
        assert!(validate_class_name("Record").is_ok());
        assert!(validate_class_name("my-app::Server_2").is_ok());
        assert!(validate_class_name("").is_err());
        assert!(validate_class_name("app::").is_err());
        assert!(validate_class_name("app.Server").is_err());
    }

    #[test]
    fn test_simple_class_name() {
        assert_eq!(simple_class_name("app::config::Server"), "Server");
        assert_eq!(simple_class_name("Server"), "Server");
    }

    #[test]
    fn test_config_defaults() {
        let config = DigesterConfig::default();
        assert!(!config.case_folding);
        assert!(config.ignore_missing_property);
    }
}
