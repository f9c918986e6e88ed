//! # Built-in Rules
//!
//! Constructors for the common field rules. Each returns a [`Rule`] whose
//! message can be replaced with [`Rule::message`].
//!
//! Requiredness is decided by [`is_empty`]: absent, `null`, and blank strings
//! are empty. Rules other than the requiredness family check the value as
//! given, so an empty value fails `email()` or `min_length(3)`; wrap them in
//! [`optional_but`] to accept empty values.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::rule::{is_empty, Rule};

/// Message used by every requiredness rule.
pub const REQUIRED_MESSAGE: &str = "This field is required";

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email pattern: {e}"))
});

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?\d+(\.\d+)?$").unwrap_or_else(|e| panic!("numeric pattern: {e}"))
});

static INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+$").unwrap_or_else(|e| panic!("integer pattern: {e}")));

// ---------------------------------------------------------------------------
// Requiredness
// ---------------------------------------------------------------------------

/// Fails when the value is empty.
pub fn required() -> Rule {
    Rule::new("required", |value| {
        is_empty(value).then(|| REQUIRED_MESSAGE.to_string())
    })
}

/// Always passes; marks the field as not required.
pub fn optional() -> Rule {
    Rule::new("optional", |_| None).mark_optional()
}

/// Always passes; `pick` substitutes `value` when the field is empty.
pub fn default_value(value: impl Into<Value>) -> Rule {
    Rule::new("default", |_| None).with_default(value.into())
}

/// Skips `rules` when the value is empty, otherwise applies them in order.
pub fn optional_but(rules: impl IntoIterator<Item = Rule>) -> Rule {
    let rules: Vec<Rule> = rules.into_iter().collect();
    Rule::with_context("optional_but", move |value, input| {
        if is_empty(value) {
            return None;
        }
        rules.iter().find_map(|rule| rule.evaluate(value, input))
    })
}

/// Required when `predicate(input)` holds.
pub fn required_if<F>(predicate: F) -> Rule
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Rule::with_context("required_if", move |value, input| {
        (predicate(input) && is_empty(value)).then(|| REQUIRED_MESSAGE.to_string())
    })
}

/// Required when sibling `field` equals `expected`.
pub fn required_when(field: impl Into<String>, expected: impl Into<Value>) -> Rule {
    required_when_any(field, [expected.into()])
}

/// Required when sibling `field` equals any of `expected`.
pub fn required_when_any<I, V>(field: impl Into<String>, expected: I) -> Rule
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let field = field.into();
    let expected: Vec<Value> = expected.into_iter().map(Into::into).collect();
    Rule::with_context("required_when", move |value, input| {
        let sibling = input.get(&field)?;
        if expected.contains(sibling) && is_empty(value) {
            Some(format!("{REQUIRED_MESSAGE} when {field} is {}", describe(sibling)))
        } else {
            None
        }
    })
}

// ---------------------------------------------------------------------------
// Allowed values
// ---------------------------------------------------------------------------

/// For optional fields: passes when empty, otherwise the value must be one
/// of `allowed`.
pub fn one_of<I, V>(allowed: I) -> Rule
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
    let message = allowed_message(&allowed);
    Rule::new("one_of", move |value| {
        (!is_empty(value) && !allowed.contains(value)).then(|| message.clone())
    })
}

/// For mandatory fields: fails when empty, otherwise the value must be one
/// of `allowed`.
pub fn required_in<I, V>(allowed: I) -> Rule
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
    let message = allowed_message(&allowed);
    Rule::new("required_in", move |value| {
        if is_empty(value) {
            Some(REQUIRED_MESSAGE.to_string())
        } else if !allowed.contains(value) {
            Some(message.clone())
        } else {
            None
        }
    })
}

fn allowed_message(allowed: &[Value]) -> String {
    let list: Vec<String> = allowed.iter().map(describe).collect();
    format!("Must be one of: {}", list.join(", "))
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Length and range
// ---------------------------------------------------------------------------

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Null => Some(0),
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

/// String (characters) or array (items) length at least `min`.
pub fn min_length(min: usize) -> Rule {
    Rule::new("min_length", move |value| match length_of(value) {
        Some(len) if len >= min => None,
        _ => Some(format!("Must be at least {min} characters")),
    })
}

/// String (characters) or array (items) length at most `max`.
pub fn max_length(max: usize) -> Rule {
    Rule::new("max_length", move |value| match length_of(value) {
        Some(len) if len <= max => None,
        _ => Some(format!("Must be at most {max} characters")),
    })
}

/// Length within `min..=max`.
pub fn length_between(min: usize, max: usize) -> Rule {
    Rule::new("length_between", move |value| match length_of(value) {
        Some(len) if (min..=max).contains(&len) => None,
        _ => Some(format!("Must be between {min} and {max} characters")),
    })
}

/// Reads a JSON number or a numeric string.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if NUMERIC.is_match(s.trim()) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Number at least `min`.
pub fn min(min: f64) -> Rule {
    Rule::new("min", move |value| match as_number(value) {
        Some(n) if n >= min => None,
        Some(_) => Some(format!("Must be at least {min}")),
        None => Some(NUMBER_MESSAGE.to_string()),
    })
}

/// Number at most `max`.
pub fn max(max: f64) -> Rule {
    Rule::new("max", move |value| match as_number(value) {
        Some(n) if n <= max => None,
        Some(_) => Some(format!("Must be at most {max}")),
        None => Some(NUMBER_MESSAGE.to_string()),
    })
}

/// Number within `min..=max`.
pub fn between(min: f64, max: f64) -> Rule {
    Rule::new("between", move |value| match as_number(value) {
        Some(n) if n >= min && n <= max => None,
        Some(_) => Some(format!("Must be between {min} and {max}")),
        None => Some(NUMBER_MESSAGE.to_string()),
    })
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

const NUMBER_MESSAGE: &str = "Must be a number";

/// JSON number or numeric string.
pub fn numeric() -> Rule {
    Rule::new("numeric", |value| {
        as_number(value).is_none().then(|| NUMBER_MESSAGE.to_string())
    })
}

/// Integral JSON number or integer string.
pub fn integer() -> Rule {
    Rule::new("integer", |value| {
        let ok = match value {
            Value::Number(n) => n.is_i64() || n.is_u64(),
            Value::String(s) => INTEGER.is_match(s.trim()),
            _ => false,
        };
        (!ok).then(|| "Must be an integer".to_string())
    })
}

/// JSON boolean or the strings `"true"` / `"false"`.
pub fn boolean() -> Rule {
    Rule::new("boolean", |value| {
        let ok = match value {
            Value::Bool(_) => true,
            Value::String(s) => matches!(s.trim(), "true" | "false"),
            _ => false,
        };
        (!ok).then(|| "Must be a boolean".to_string())
    })
}

/// String shaped like `local@domain.tld`.
pub fn email() -> Rule {
    Rule::new("email", |value| {
        let ok = value.as_str().is_some_and(|s| EMAIL.is_match(s.trim()));
        (!ok).then(|| "Must be a valid email address".to_string())
    })
}

/// Absolute `http` or `https` URL with a host.
pub fn url() -> Rule {
    Rule::new("url", |value| {
        let ok = value
            .as_str()
            .and_then(|s| url::Url::parse(s.trim()).ok())
            .is_some_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host());
        (!ok).then(|| "Must be a valid URL".to_string())
    })
}

/// String matching `pattern`.
pub fn matches(pattern: Regex) -> Rule {
    Rule::new("matches", move |value| {
        let ok = value.as_str().is_some_and(|s| pattern.is_match(s));
        (!ok).then(|| "Has an invalid format".to_string())
    })
}

// ---------------------------------------------------------------------------
// Custom
// ---------------------------------------------------------------------------

/// Project-defined predicate over the field value.
pub fn custom<F>(check: F) -> Rule
where
    F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
{
    Rule::new("custom", check)
}

/// Project-defined predicate over the field value and the whole input.
pub fn custom_with_context<F>(check: F) -> Rule
where
    F: Fn(&Value, &Value) -> Option<String> + Send + Sync + 'static,
{
    Rule::with_context("custom", check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(rule: &Rule, value: Value) -> Option<String> {
        rule.evaluate(&value, &Value::Null)
    }

    fn check_in(rule: &Rule, value: Value, input: Value) -> Option<String> {
        rule.evaluate(&value, &input)
    }

    #[test]
    fn required_rejects_every_empty_form() {
        let rule = required();
        for empty in [Value::Null, json!(""), json!("   ")] {
            assert_eq!(check(&rule, empty).as_deref(), Some(REQUIRED_MESSAGE));
        }
        assert_eq!(check(&rule, json!(0)), None);
        assert_eq!(check(&rule, json!(false)), None);
        assert_eq!(check(&rule, json!("x")), None);
    }

    #[test]
    fn optional_and_default_always_pass() {
        assert!(optional().is_optional());
        assert_eq!(check(&optional(), Value::Null), None);
        let d = default_value("guest");
        assert_eq!(check(&d, Value::Null), None);
        assert_eq!(d.default_value(), Some(&json!("guest")));
    }

    #[test]
    fn optional_but_skips_empty_and_delegates_otherwise() {
        let rule = optional_but([email()]);
        assert_eq!(check(&rule, Value::Null), None);
        assert_eq!(check(&rule, json!("  ")), None);
        assert_eq!(check(&rule, json!("a@b.io")), None);
        assert_eq!(
            check(&rule, json!("nope")).as_deref(),
            Some("Must be a valid email address")
        );
    }

    #[test]
    fn optional_but_short_circuits_in_order() {
        let rule = optional_but([min_length(5), email()]);
        assert_eq!(
            check(&rule, json!("a@b")).as_deref(),
            Some("Must be at least 5 characters")
        );
    }

    #[test]
    fn length_rules_count_characters() {
        assert_eq!(check(&min_length(3), json!("héé")), None);
        assert!(check(&min_length(3), json!("hé")).is_some());
        assert!(check(&min_length(1), Value::Null).is_some());
        assert_eq!(check(&max_length(2), json!("ab")), None);
        assert!(check(&max_length(2), json!("abc")).is_some());
        assert_eq!(check(&max_length(2), json!([1, 2])), None);
        assert!(check(&max_length(2), json!(12)).is_some());
        assert_eq!(check(&length_between(2, 4), json!("abc")), None);
        assert_eq!(
            check(&length_between(2, 4), json!("abcde")).as_deref(),
            Some("Must be between 2 and 4 characters")
        );
    }

    #[test]
    fn range_rules_accept_numbers_and_numeric_strings() {
        assert_eq!(check(&min(18.0), json!(18)), None);
        assert_eq!(check(&min(18.0), json!("21")), None);
        assert_eq!(check(&min(18.0), json!(17)).as_deref(), Some("Must be at least 18"));
        assert_eq!(check(&max(10.0), json!(10.5)).as_deref(), Some("Must be at most 10"));
        assert_eq!(check(&between(1.0, 5.0), json!(3)), None);
        assert_eq!(check(&between(1.0, 5.0), json!("abc")).as_deref(), Some("Must be a number"));
    }

    #[test]
    fn format_rules() {
        assert_eq!(check(&numeric(), json!("12.5")), None);
        assert_eq!(check(&numeric(), json!(-3)), None);
        assert!(check(&numeric(), json!("12a")).is_some());
        assert!(check(&numeric(), json!("NaN")).is_some());

        assert_eq!(check(&integer(), json!(7)), None);
        assert_eq!(check(&integer(), json!("-7")), None);
        assert!(check(&integer(), json!(7.5)).is_some());

        assert_eq!(check(&boolean(), json!(true)), None);
        assert_eq!(check(&boolean(), json!("false")), None);
        assert!(check(&boolean(), json!(1)).is_some());

        assert_eq!(check(&email(), json!("ada@example.com")), None);
        assert!(check(&email(), json!("ada@example")).is_some());
        assert!(check(&email(), json!(42)).is_some());

        assert_eq!(check(&url(), json!("https://example.com/x?y=1")), None);
        assert!(check(&url(), json!("ftp://example.com")).is_some());
        assert!(check(&url(), json!("not a url")).is_some());

        let slug = matches(Regex::new("^[a-z-]+$").unwrap());
        assert_eq!(check(&slug, json!("hello-world")), None);
        assert_eq!(check(&slug, json!("Hello")).as_deref(), Some("Has an invalid format"));
    }

    #[test]
    fn one_of_is_lenient_on_empty_required_in_is_not() {
        let rule = one_of(["admin", "user"]);
        assert_eq!(check(&rule, Value::Null), None);
        assert_eq!(check(&rule, json!("user")), None);
        assert_eq!(
            check(&rule, json!("root")).as_deref(),
            Some("Must be one of: admin, user")
        );

        let rule = required_in(["admin", "user"]);
        assert_eq!(check(&rule, Value::Null).as_deref(), Some(REQUIRED_MESSAGE));
        assert_eq!(check(&rule, json!("admin")), None);
        assert!(check(&rule, json!("root")).is_some());
    }

    #[test]
    fn required_if_consults_the_whole_input() {
        let rule = required_if(|input| input["type"] == "company");
        assert!(rule.needs_context());
        assert_eq!(
            check_in(&rule, Value::Null, json!({"type": "company"})).as_deref(),
            Some(REQUIRED_MESSAGE)
        );
        assert_eq!(check_in(&rule, Value::Null, json!({"type": "person"})), None);
        assert_eq!(check_in(&rule, json!("ACME"), json!({"type": "company"})), None);
    }

    #[test]
    fn required_when_matches_one_or_many_values() {
        let rule = required_when("country", "US");
        assert_eq!(
            check_in(&rule, Value::Null, json!({"country": "US"})).as_deref(),
            Some("This field is required when country is US")
        );
        assert_eq!(check_in(&rule, Value::Null, json!({"country": "FR"})), None);
        assert_eq!(check_in(&rule, Value::Null, json!({})), None);

        let rule = required_when_any("plan", ["pro", "team"]);
        assert!(check_in(&rule, json!(""), json!({"plan": "team"})).is_some());
        assert_eq!(check_in(&rule, json!(""), json!({"plan": "free"})), None);
    }

    #[test]
    fn custom_rules_wrap_project_predicates() {
        let even = custom(|v| (v.as_i64().unwrap_or(1) % 2 != 0).then(|| "Must be even".into()));
        assert_eq!(check(&even, json!(4)), None);
        assert_eq!(check(&even, json!(3)).as_deref(), Some("Must be even"));

        let confirm = custom_with_context(|v, input| {
            (input.get("password") != Some(v)).then(|| "Passwords do not match".into())
        });
        assert!(confirm.needs_context());
        assert_eq!(check_in(&confirm, json!("pw"), json!({"password": "pw"})), None);
        assert!(check_in(&confirm, json!("px"), json!({"password": "pw"})).is_some());
    }
}
