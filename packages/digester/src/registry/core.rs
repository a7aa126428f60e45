//! Pattern registry mapping match paths to rules.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::handler::Rule;
use crate::config::{normalize_pattern, validate_pattern, PATH_SEPARATOR, WILDCARD_PREFIX};
use crate::error::Result;

/// Registry mapping patterns to rules.
///
/// Exact patterns take precedence. When no exact pattern matches a path, the
/// longest matching wildcard pattern (`*/suffix`) wins. Two matching
/// suffixes of equal length are the same pattern, so the winner is unique;
/// the scan still keeps the first registered candidate on a tie.
#[derive(Default)]
pub struct Rules {
    cache: HashMap<String, Vec<Rc<dyn Rule>>>,
    patterns: Vec<String>,
    rules: Vec<Rc<dyn Rule>>,
}

impl Rules {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for a pattern.
    ///
    /// A trailing `/` is stripped. The same rule may be added more than once.
    ///
    /// # Errors
    /// `Protocol` if the pattern is malformed.
    pub fn add(&mut self, pattern: &str, rule: Rc<dyn Rule>) -> Result<()> {
        let pattern = normalize_pattern(pattern);
        validate_pattern(pattern)?;

        match self.cache.get_mut(pattern) {
            Some(bucket) => bucket.push(Rc::clone(&rule)),
            None => {
                self.cache.insert(pattern.to_string(), vec![Rc::clone(&rule)]);
                self.patterns.push(pattern.to_string());
            }
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Return the rules matching a path, in registration order.
    ///
    /// Returns an empty slice if nothing matches.
    #[must_use]
    pub fn matches(&self, path: &str) -> &[Rc<dyn Rule>] {
        let path = normalize_pattern(path);

        if let Some(exact) = self.cache.get(path) {
            return exact;
        }

        let mut best: Option<&str> = None;
        for pattern in &self.patterns {
            let Some(suffix) = pattern.strip_prefix(WILDCARD_PREFIX) else {
                continue;
            };
            if !ends_with_segments(path, suffix) {
                continue;
            }
            if best.map_or(true, |b| suffix.len() > b.len() - WILDCARD_PREFIX.len()) {
                best = Some(pattern);
            }
        }

        match best.and_then(|pattern| self.cache.get(pattern)) {
            Some(bucket) => bucket,
            None => &[],
        }
    }

    /// All rules in registration order.
    #[must_use]
    pub fn rules(&self) -> &[Rc<dyn Rule>] {
        &self.rules
    }

    /// All patterns in the order they were first registered.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    /// Check if rules are registered for exactly this pattern.
    #[must_use]
    pub fn has_pattern(&self, pattern: &str) -> bool {
        self.cache.contains_key(normalize_pattern(pattern))
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Remove all rules.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.patterns.clear();
        self.rules.clear();
    }
}

/// Check if `path` equals `suffix` or ends with `/suffix`.
fn ends_with_segments(path: &str, suffix: &str) -> bool {
    match path.strip_suffix(suffix) {
        Some("") => true,
        Some(head) => head.ends_with(PATH_SEPARATOR),
        None => false,
    }
}

impl fmt::Debug for Rules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_map();
        for pattern in &self.patterns {
            let described: Vec<String> = self
                .cache
                .get(pattern)
                .map(|bucket| bucket.iter().map(|rule| rule.describe()).collect())
                .unwrap_or_default();
            list.entry(pattern, &described);
        }
        list.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Rule for Named {
        fn describe(&self) -> String {
            self.0.to_string()
        }
    }

    fn names(rules: &[Rc<dyn Rule>]) -> Vec<String> {
        rules.iter().map(|rule| rule.describe()).collect()
    }

    fn named(name: &'static str) -> Rc<dyn Rule> {
        Rc::new(Named(name))
    }

    #[test]
    fn test_exact_match_in_registration_order() {
        let mut rules = Rules::new();
        rules.add("a/b", named("first")).unwrap();
        rules.add("a", named("other")).unwrap();
        rules.add("a/b", named("second")).unwrap();

        assert_eq!(names(rules.matches("a/b")), vec!["first", "second"]);
        assert_eq!(names(rules.matches("a")), vec!["other"]);
        assert!(rules.matches("a/b/c").is_empty());
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let mut rules = Rules::new();
        rules.add("a/b/", named("rule")).unwrap();

        assert!(rules.has_pattern("a/b"));
        assert_eq!(names(rules.matches("a/b")), vec!["rule"]);
        assert_eq!(names(rules.matches("a/b/")), vec!["rule"]);
    }

    #[test]
    fn test_wildcard_matches_any_depth() {
        let mut rules = Rules::new();
        rules.add("*/foo", named("wild")).unwrap();

        assert_eq!(names(rules.matches("foo")), vec!["wild"]);
        assert_eq!(names(rules.matches("a/b/foo")), vec!["wild"]);
        assert!(rules.matches("a/barfoo").is_empty());
        assert!(rules.matches("foo/a").is_empty());
    }

    #[test]
    fn test_longest_wildcard_wins() {
        let mut rules = Rules::new();
        rules.add("*/foo", named("short")).unwrap();
        rules.add("*/b/foo", named("long")).unwrap();

        assert_eq!(names(rules.matches("a/b/foo")), vec!["long"]);
        assert_eq!(names(rules.matches("a/c/foo")), vec!["short"]);
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let mut rules = Rules::new();
        rules.add("*/foo", named("wild")).unwrap();
        rules.add("a/foo", named("exact")).unwrap();

        assert_eq!(names(rules.matches("a/foo")), vec!["exact"]);
    }

    #[test]
    fn test_wildcard_bucket_returned_exclusively() {
        let mut rules = Rules::new();
        rules.add("*/foo", named("short")).unwrap();
        rules.add("*/b/foo", named("long-1")).unwrap();
        rules.add("*/b/foo", named("long-2")).unwrap();

        assert_eq!(names(rules.matches("b/foo")), vec!["long-1", "long-2"]);
    }

    #[test]
    fn test_rules_in_registration_order() {
        let mut rules = Rules::new();
        rules.add("b", named("1")).unwrap();
        rules.add("a", named("2")).unwrap();
        rules.add("b", named("3")).unwrap();

        assert_eq!(names(rules.rules()), vec!["1", "2", "3"]);
        assert_eq!(rules.patterns().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let mut rules = Rules::new();
        assert!(rules.add("", named("x")).is_err());
        assert!(rules.add("a//b", named("x")).is_err());
        assert!(rules.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut rules = Rules::new();
        rules.add("a", named("x")).unwrap();
        rules.clear();

        assert!(rules.is_empty());
        assert!(rules.matches("a").is_empty());
        assert_eq!(rules.patterns().count(), 0);
    }
}
