//! Matching of request parameter values against policy value lists
//!
//! String entries may carry a leading and/or trailing `*`:
//! - `foo*` - Matches any value starting with `foo`
//! - `*foo` - Matches any value ending with `foo`
//! - `*foo*` - Matches any value containing `foo`
//!
//! Matching is case-sensitive. Non-string entries compare by structural equality.

use serde_json::Value;

/// Pattern matcher for parameter values
pub struct PatternMatcher;

impl PatternMatcher {
    /// Check if a string value matches a policy pattern
    ///
    /// # Examples
    /// ```
    /// use lockbox::acl::PatternMatcher;
    ///
    /// assert!(PatternMatcher::matches("prod-*", "prod-east"));
    /// assert!(PatternMatcher::matches("*-east", "prod-east"));
    /// assert!(!PatternMatcher::matches("prod-*", "Prod-east"));
    /// ```
    pub fn matches(pattern: &str, value: &str) -> bool {
        // A lone "*" (or any single character) is a literal
        if pattern.len() < 2 {
            return pattern == value;
        }

        let leading = pattern.starts_with('*');
        let trailing = pattern.ends_with('*');

        match (leading, trailing) {
            (true, true) => value.contains(&pattern[1..pattern.len() - 1]),
            (true, false) => value.ends_with(&pattern[1..]),
            (false, true) => value.starts_with(&pattern[..pattern.len() - 1]),
            (false, false) => pattern == value,
        }
    }

    /// Check if a request value is admitted by a policy value list
    ///
    /// An empty list admits every value.
    pub fn value_in_list(value: &Value, list: &[Value]) -> bool {
        if list.is_empty() {
            return true;
        }

        list.iter().any(|entry| match (entry, value) {
            (Value::String(pattern), Value::String(candidate)) => {
                Self::matches(pattern, candidate)
            }
            (entry, value) => entry == value,
        })
    }
}
