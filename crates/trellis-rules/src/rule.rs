//! # Rules
//!
//! A [`Rule`] inspects one field's value and returns `Some(message)` when the
//! value is rejected, `None` when it passes. Context-aware rules additionally
//! receive the whole input record, which is how conditional requirements
//! look at sibling fields.
//!
//! A field carries a [`RuleSet`]: rules evaluated in declaration order,
//! stopping at the first failure.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

type CheckFn = dyn Fn(&Value, &Value) -> Option<String> + Send + Sync;

pub(crate) static NULL: Value = Value::Null;

/// Whether a value counts as "not provided".
///
/// Absent (passed as `Null`), `null`, and empty or whitespace-only strings
/// are empty. `0`, `false`, `[]` and `{}` are not.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// A single-field validation predicate.
#[derive(Clone)]
pub struct Rule {
    name: &'static str,
    check: Arc<CheckFn>,
    needs_context: bool,
    optional: bool,
    default: Option<Value>,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("needs_context", &self.needs_context)
            .field("optional", &self.optional)
            .field("default", &self.default)
            .finish()
    }
}

impl Rule {
    /// Rule looking at the field value only.
    pub fn new<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name,
            check: Arc::new(move |value: &Value, _input: &Value| check(value)),
            needs_context: false,
            optional: false,
            default: None,
        }
    }

    /// Rule receiving the field value and the whole input record.
    pub fn with_context<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&Value, &Value) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            name,
            check: Arc::new(check),
            needs_context: true,
            optional: false,
            default: None,
        }
    }

    /// Replace the failure message, keeping the predicate.
    pub fn message(self, message: impl Into<String>) -> Self {
        let message = message.into();
        let inner = Arc::clone(&self.check);
        Self {
            check: Arc::new(move |value: &Value, input: &Value| {
                inner(value, input).map(|_| message.clone())
            }),
            ..self
        }
    }

    pub(crate) fn mark_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub(crate) fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Run the rule. `input` is only consulted by context-aware rules.
    pub fn evaluate(&self, value: &Value, input: &Value) -> Option<String> {
        (self.check)(value, input)
    }

    /// Rule name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the rule reads the whole input.
    pub fn needs_context(&self) -> bool {
        self.needs_context
    }

    /// Whether the rule marks its field as not required.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Whether the rule carries a default value.
    pub fn is_default(&self) -> bool {
        self.default.is_some()
    }

    /// The default value, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    fn ends_on_empty(&self) -> bool {
        self.optional || self.default.is_some()
    }
}

/// Ordered rules for one field.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// First failure message, evaluating rules in order and stopping there.
    ///
    /// Reaching an `optional` or default-carrying rule with an empty value
    /// ends evaluation with a pass. Rules declared before it still run.
    pub fn evaluate(&self, value: &Value, input: &Value) -> Option<String> {
        let empty = is_empty(value);
        for rule in &self.rules {
            if empty && rule.ends_on_empty() {
                return None;
            }
            let context = if rule.needs_context() { input } else { &NULL };
            if let Some(message) = rule.evaluate(value, context) {
                return Some(message);
            }
        }
        None
    }

    /// Default value of the first default-carrying rule.
    pub fn default_value(&self) -> Option<&Value> {
        self.rules.iter().find_map(Rule::default_value)
    }

    /// Whether any rule reads the whole input.
    pub fn needs_context(&self) -> bool {
        self.rules.iter().any(Rule::needs_context)
    }
}

impl From<Rule> for RuleSet {
    fn from(rule: Rule) -> Self {
        Self { rules: vec![rule] }
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl<const N: usize> From<[Rule; N]> for RuleSet {
    fn from(rules: [Rule; N]) -> Self {
        Self {
            rules: rules.into(),
        }
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emptiness_definition() {
        assert!(is_empty(&Value::Null));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!("   \t")));
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!(false)));
        assert!(!is_empty(&json!([])));
        assert!(!is_empty(&json!({})));
        assert!(!is_empty(&json!(" x ")));
    }

    #[test]
    fn message_override_keeps_predicate() {
        let rule = Rule::new("positive", |v| {
            (v.as_i64().unwrap_or(0) <= 0).then(|| "not positive".to_string())
        })
        .message("give me something bigger");

        assert_eq!(rule.evaluate(&json!(5), &Value::Null), None);
        assert_eq!(
            rule.evaluate(&json!(-1), &Value::Null).as_deref(),
            Some("give me something bigger")
        );
        assert_eq!(rule.name(), "positive");
    }

    #[test]
    fn context_is_withheld_from_plain_rules() {
        let saw_input = Rule::new("plain", |_| None);
        let sees_input = Rule::with_context("ctx", |_, input| {
            input.get("flag").map(|_| "flag present".to_string())
        });
        let set = RuleSet::from([saw_input, sees_input]);
        assert!(set.needs_context());
        assert_eq!(
            set.evaluate(&Value::Null, &json!({"flag": 1})).as_deref(),
            Some("flag present")
        );
    }

    #[test]
    fn default_and_optional_flags() {
        let rule = Rule::new("d", |_| None).with_default(json!(3));
        assert!(rule.is_default());
        assert!(!rule.is_optional());
        let set = RuleSet::from(rule);
        assert_eq!(set.evaluate(&Value::Null, &Value::Null), None);
        assert_eq!(set.default_value(), Some(&json!(3)));
    }

    #[test]
    fn optional_marker_only_stops_rules_after_it() {
        let fail = || Rule::new("fail", |_| Some("failed".to_string()));
        let optional = || Rule::new("optional", |_| None).mark_optional();

        let before = RuleSet::from([fail(), optional()]);
        assert_eq!(before.evaluate(&json!(""), &Value::Null).as_deref(), Some("failed"));

        let after = RuleSet::from([optional(), fail()]);
        assert_eq!(after.evaluate(&json!(""), &Value::Null), None);
        assert_eq!(after.evaluate(&json!("x"), &Value::Null).as_deref(), Some("failed"));
    }
}
