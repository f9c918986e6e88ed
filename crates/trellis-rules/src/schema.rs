//! # Schema Validator
//!
//! [`validate`] and [`sanitize`] are free functions over a [`RuleMap`];
//! [`Schema`] binds a map once and exposes them as `check` and `pick`.
//!
//! The two operations are independent. `pick` whitelists declared fields and
//! fills defaults but never reports a missing required field; `check`
//! validates whatever it is given. Handlers usually pick first, then check
//! the picked record.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use trellis_core::ValidationResult;

use crate::rule::{is_empty, RuleSet, NULL};

/// Field name → rules, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleMap {
    fields: Vec<(String, RuleSet)>,
}

impl RuleMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rules for `field`. An existing entry is replaced in place,
    /// keeping its position.
    pub fn insert(&mut self, field: impl Into<String>, rules: impl Into<RuleSet>) {
        let field = field.into();
        let rules = rules.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = rules,
            None => self.fields.push((field, rules)),
        }
    }

    /// Right-biased union: entries of `other` win.
    pub fn merge(&mut self, other: &RuleMap) {
        for (field, rules) in &other.fields {
            self.insert(field.clone(), rules.clone());
        }
    }

    /// Rules for `field`.
    pub fn get(&self, field: &str) -> Option<&RuleSet> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, rules)| rules)
    }

    /// Whether `field` is declared.
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Declared field names, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &RuleSet)> {
        self.fields.iter().map(|(name, rules)| (name.as_str(), rules))
    }
}

impl<K, R> FromIterator<(K, R)> for RuleMap
where
    K: Into<String>,
    R: Into<RuleSet>,
{
    fn from_iter<I: IntoIterator<Item = (K, R)>>(iter: I) -> Self {
        let mut map = RuleMap::new();
        for (field, rules) in iter {
            map.insert(field, rules);
        }
        map
    }
}

fn field_value<'a>(input: &'a Value, field: &str) -> &'a Value {
    input.get(field).unwrap_or(&NULL)
}

/// Run every declared field's rules against `input`.
///
/// Each failing field contributes one `ERR_FIELD` message. An empty value
/// passes once evaluation reaches `optional()` or `default_value(..)`;
/// rules declared before that marker still apply.
pub fn validate(input: &Value, rules: &RuleMap) -> ValidationResult {
    let mut result = ValidationResult::new();
    for (field, set) in rules.iter() {
        let value = field_value(input, field);
        if let Some(message) = set.evaluate(value, input) {
            result.add_field_error(field, message);
        }
    }
    result
}

/// Whitelist `input` to the declared fields, filling defaults.
///
/// Non-empty values are copied unchanged. Empty or absent values take the
/// field's default when one is declared and are omitted otherwise.
pub fn sanitize(input: &Value, rules: &RuleMap) -> Value {
    let mut out = Map::new();
    for (field, set) in rules.iter() {
        let value = field_value(input, field);
        if !is_empty(value) {
            out.insert(field.to_string(), value.clone());
        } else if let Some(default) = set.default_value() {
            out.insert(field.to_string(), default.clone());
        }
    }
    Value::Object(out)
}

/// Reusable, immutable rule map.
///
/// Cloning is cheap; [`Schema::extend`] builds a new map and leaves `self`
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    rules: Arc<RuleMap>,
}

impl Schema {
    /// Schema over `(field, rule-or-rules)` pairs.
    pub fn new<I, K, R>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<RuleSet>,
    {
        Self {
            rules: Arc::new(fields.into_iter().collect()),
        }
    }

    /// Validate `input`, failing with the full [`ValidationResult`].
    pub fn check(&self, input: &Value) -> Result<(), ValidationResult> {
        self.validate(input).into_result()
    }

    /// Validate without failing.
    pub fn validate(&self, input: &Value) -> ValidationResult {
        validate(input, &self.rules)
    }

    /// Sanitize `input` to the declared fields.
    pub fn pick(&self, input: &Value) -> Value {
        sanitize(input, &self.rules)
    }

    /// Sanitize, then deserialize the picked record.
    pub fn pick_as<T: DeserializeOwned>(&self, input: &Value) -> serde_json::Result<T> {
        serde_json::from_value(self.pick(input))
    }

    /// New schema over this one's fields plus `more` (entries in `more` win).
    pub fn extend<I, K, R>(&self, more: I) -> Schema
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<String>,
        R: Into<RuleSet>,
    {
        let more: RuleMap = more.into_iter().collect();
        let mut rules = (*self.rules).clone();
        rules.merge(&more);
        Schema {
            rules: Arc::new(rules),
        }
    }

    /// The underlying rule map.
    pub fn rules(&self) -> &RuleMap {
        &self.rules
    }

    /// Declared field names, in order.
    pub fn fields(&self) -> Vec<&str> {
        self.rules.fields().collect()
    }
}

impl From<RuleMap> for Schema {
    fn from(rules: RuleMap) -> Self {
        Self {
            rules: Arc::new(rules),
        }
    }
}

/// Build a [`Schema`] from `"field" => rule` or `"field" => [rules]` pairs.
///
/// ```
/// use trellis_rules::{schema, rules::*};
///
/// let signup = schema! {
///     "email" => [required(), email()],
///     "nickname" => optional_but([max_length(20)]),
///     "role" => default_value("user"),
/// };
/// assert_eq!(signup.fields(), ["email", "nickname", "role"]);
/// ```
#[macro_export]
macro_rules! schema {
    () => {
        $crate::Schema::default()
    };
    ($($field:expr => $rules:expr),+ $(,)?) => {
        $crate::Schema::new([$(($field, $crate::RuleSet::from($rules))),+])
    };
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::builtin::*;
    use crate::rule::Rule;
    use serde_json::json;

    fn signup() -> Schema {
        crate::schema! {
            "name" => required(),
            "email" => [required(), email()],
            "role" => default_value("user"),
            "bio" => optional_but([max_length(10)]),
        }
    }

    #[test]
    fn missing_required_field_is_reported() {
        for input in [json!({}), json!({"name": null}), json!({"name": ""}), json!({"name": "  "})] {
            let err = signup().check(&input).unwrap_err();
            assert!(!err.is_valid());
            assert_eq!(err.field_message("name"), Some(REQUIRED_MESSAGE));
        }
    }

    #[test]
    fn check_passes_valid_input() {
        let input = json!({"name": "Ada", "email": "ada@example.com"});
        assert!(signup().check(&input).is_ok());
    }

    #[test]
    fn one_message_per_failing_field() {
        let result = signup().validate(&json!({"email": "nope", "bio": "far too long a bio"}));
        assert_eq!(result.len(), 3);
        assert_eq!(
            result.field_errors(),
            json!({
                "name": "This field is required",
                "email": "Must be a valid email address",
                "bio": "Must be at most 10 characters",
            })
            .as_object()
            .cloned()
            .unwrap()
        );
    }

    #[test]
    fn undeclared_fields_are_not_inspected() {
        let schema = crate::schema! { "name" => required() };
        assert!(schema.check(&json!({"name": "x", "admin": true})).is_ok());
    }

    #[test]
    fn optional_field_skips_its_remaining_rules_when_empty() {
        let schema = crate::schema! { "age" => [optional(), min(18.0)] };
        assert!(schema.check(&json!({})).is_ok());
        assert!(schema.check(&json!({"age": 12})).is_err());
        assert!(schema.check(&json!({"age": 30})).is_ok());
    }

    #[test]
    fn required_before_default_still_fails_on_empty() {
        let schema = crate::schema! { "role" => [required(), default_value("user")] };
        let err = schema.check(&json!({})).unwrap_err();
        assert_eq!(err.field_message("role"), Some("This field is required"));
        assert_eq!(schema.pick(&json!({})), json!({"role": "user"}));
    }

    #[test]
    fn required_before_optional_still_fails_on_blank() {
        let schema = crate::schema! { "name" => [required(), optional()] };
        assert!(schema.check(&json!({"name": "  "})).is_err());
        assert!(schema.check(&json!({"name": "Ada"})).is_ok());
    }

    #[test]
    fn rules_short_circuit_on_first_failure() {
        let probe_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&probe_calls);
        let probe = Rule::new("probe", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });
        let schema = crate::schema! { "x" => [required(), probe] };

        assert!(schema.check(&json!({})).is_err());
        assert_eq!(probe_calls.load(Ordering::SeqCst), 0);

        assert!(schema.check(&json!({"x": 1})).is_ok());
        assert_eq!(probe_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn context_rules_see_siblings() {
        let schema = crate::schema! {
            "type" => required_in(["person", "company"]),
            "vat_id" => required_when("type", "company"),
        };
        assert!(schema.check(&json!({"type": "person"})).is_ok());
        let err = schema.check(&json!({"type": "company"})).unwrap_err();
        assert!(err.field_message("vat_id").is_some());
    }

    #[test]
    fn pick_whitelists_and_fills_defaults() {
        let picked = signup().pick(&json!({
            "name": "Ada",
            "email": "",
            "password": "hunter2",
        }));
        assert_eq!(picked, json!({"name": "Ada", "role": "user"}));
    }

    #[test]
    fn pick_input_wins_over_default_without_coercion() {
        let schema = crate::schema! { "limit" => default_value(20) };
        assert_eq!(schema.pick(&json!({})), json!({"limit": 20}));
        assert_eq!(schema.pick(&json!({"limit": "50"})), json!({"limit": "50"}));
    }

    #[test]
    fn pick_does_not_report_missing_required_fields() {
        let schema = crate::schema! { "name" => required() };
        assert_eq!(schema.pick(&json!({})), json!({}));
    }

    #[test]
    fn pick_of_non_object_is_empty_record() {
        assert_eq!(signup().pick(&json!([1, 2])), json!({"role": "user"}));
    }

    #[test]
    fn pick_as_deserializes() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Page {
            limit: u32,
            offset: u32,
        }
        let schema = crate::schema! {
            "limit" => default_value(20),
            "offset" => default_value(0),
        };
        let page: Page = schema.pick_as(&json!({"offset": 40})).unwrap();
        assert_eq!(page, Page { limit: 20, offset: 40 });
    }

    #[test]
    fn extend_is_right_biased_and_non_mutating() {
        let base = crate::schema! {
            "name" => required(),
            "age" => optional(),
        };
        let extended = base.extend([
            ("age", RuleSet::from(required())),
            ("email", RuleSet::from([required(), email()])),
        ]);

        assert_eq!(base.fields(), ["name", "age"]);
        assert_eq!(extended.fields(), ["name", "age", "email"]);

        assert!(base.check(&json!({"name": "a"})).is_ok());
        let err = extended.check(&json!({"name": "a"})).unwrap_err();
        assert!(err.field_message("age").is_some());
        assert!(err.field_message("email").is_some());
    }

    #[test]
    fn empty_schema_accepts_anything_and_picks_nothing() {
        let schema = crate::schema! {};
        assert!(schema.check(&json!({"a": 1})).is_ok());
        assert_eq!(schema.pick(&json!({"a": 1})), json!({}));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn schema_with(fields: &[String]) -> Schema {
            Schema::new(fields.iter().map(|f| (f.clone(), optional())))
        }

        proptest! {
            #[test]
            fn pick_never_leaks_undeclared_keys(
                declared in proptest::collection::vec("[a-e]{1,2}", 0..5),
                input in proptest::collection::btree_map("[a-h]{1,2}", "[a-z ]{0,6}", 0..10),
            ) {
                let schema = schema_with(&declared);
                let input = serde_json::to_value(&input).unwrap();
                let picked = schema.pick(&input);
                for key in picked.as_object().unwrap().keys() {
                    prop_assert!(declared.contains(key));
                }
            }

            #[test]
            fn default_is_used_only_when_input_is_empty(value in "[a-z ]{0,8}") {
                let schema = crate::schema! { "f" => default_value("fallback") };
                let picked = schema.pick(&json!({"f": value.clone()}));
                let expected = if value.trim().is_empty() { json!("fallback") } else { json!(value) };
                prop_assert_eq!(&picked["f"], &expected);
            }

            #[test]
            fn required_fails_exactly_on_empty(value in "[a-z \t]{0,4}") {
                let schema = crate::schema! { "f" => required() };
                let failed = schema.check(&json!({"f": value.clone()})).is_err();
                prop_assert_eq!(failed, value.trim().is_empty());
            }

            #[test]
            fn extend_leaves_original_unchanged(extra in proptest::collection::vec("[a-z]{1,3}", 0..6)) {
                let base = crate::schema! { "id" => required() };
                let before: Vec<String> = base.fields().iter().map(|s| s.to_string()).collect();
                let extended = base.extend(extra.iter().map(|f| (f.clone(), required())));
                prop_assert_eq!(base.fields(), before.iter().map(String::as_str).collect::<Vec<_>>());
                prop_assert!(extended.fields().len() >= base.fields().len());
            }
        }
    }
}
