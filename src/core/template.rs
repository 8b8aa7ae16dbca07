//! `{{placeholder}}` substitution for trait and relationship templates.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Za-z_][A-Za-z0-9_\-]*)\}\}").unwrap());

/// Placeholders the compiler knows how to fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Percentage,
    Author,
    Style,
    Banlist,
    Strength,
}

impl Placeholder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placeholder::Percentage => "percentage",
            Placeholder::Author => "author",
            Placeholder::Style => "style",
            Placeholder::Banlist => "banlist",
            Placeholder::Strength => "strength",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Number(i64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(text) => f.write_str(text),
            ParamValue::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<u8> for ParamValue {
    fn from(value: u8) -> Self {
        ParamValue::Number(value as i64)
    }
}

/// Parameter bag handed to `render`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn set(&mut self, placeholder: Placeholder, value: impl Into<ParamValue>) {
        self.insert(placeholder.as_str(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }
}

/// Replace every `{{key}}` that has a value in `params`.
///
/// Unknown placeholders stay verbatim. Substituted text is never re-scanned.
pub fn render(template: &str, params: &Params) -> String {
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

pub fn has_placeholder(template: &str, key: &str) -> bool {
    PLACEHOLDER_PATTERN
        .captures_iter(template)
        .any(|caps| &caps[1] == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, ParamValue)]) -> Params {
        let mut params = Params::new();
        for (key, value) in pairs {
            params.insert(*key, value.clone());
        }
        params
    }

    #[test]
    fn test_render_replaces_all_occurrences() {
        let p = params(&[("percentage", ParamValue::Number(18))]);
        assert_eq!(
            render("{{percentage}}% slower, {{percentage}}% faster", &p),
            "18% slower, 18% faster"
        );
    }

    #[test]
    fn test_unknown_placeholder_left_verbatim() {
        let p = params(&[("author", "Lee Child".into())]);
        assert_eq!(
            render("In the style of {{author}} ({{style}})", &p),
            "In the style of Lee Child ({{style}})"
        );
    }

    #[test]
    fn test_case_sensitive() {
        let p = params(&[("author", "Lee Child".into())]);
        assert_eq!(render("{{Author}}", &p), "{{Author}}");
    }

    #[test]
    fn test_not_recursive() {
        let p = params(&[
            ("author", "{{style}}".into()),
            ("style", "noir".into()),
        ]);
        assert_eq!(render("{{author}} / {{style}}", &p), "{{style}} / noir");
    }

    #[test]
    fn test_negative_numbers_plain_decimal() {
        let p = params(&[("strength", ParamValue::Number(-1500))]);
        assert_eq!(render("{{strength}}", &p), "-1500");
    }

    #[test]
    fn test_has_placeholder() {
        assert!(has_placeholder("{{banlist}} at {{strength}}%", "strength"));
        assert!(!has_placeholder("{{ banlist }}", "banlist"));
        assert!(has_placeholder("Avoid {{banlist}}.", "banlist"));
        assert!(!has_placeholder("Avoid {banlist}.", "banlist"));
    }
}
