//! # Validation Results
//!
//! [`ValidationResult`] is the ordered list of messages produced by the rule
//! engine. An empty result means the input is valid.
//!
//! The same type doubles as the error raised by `Schema::check`: it
//! implements [`std::error::Error`], so `schema.check(&input)?` inside a
//! handler propagates it unchanged to the error handler registry, which
//! recognizes it by type and answers 400 with the field map from
//! [`ValidationResult::field_errors`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which messages without a field are collected in
/// [`ValidationResult::field_errors`].
pub const GENERAL_ERRORS_KEY: &str = "_errors";

/// Machine-readable code attached to a validation message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationCode {
    /// A specific field failed a rule (`ERR_FIELD`).
    Field,
    /// A failure not tied to a field (`ERR_UNKNOWN`).
    Unknown,
    /// A caller-supplied code.
    Custom(String),
}

impl ValidationCode {
    /// Return the wire representation of this code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Field => "ERR_FIELD",
            Self::Unknown => "ERR_UNKNOWN",
            Self::Custom(code) => code,
        }
    }
}

impl From<String> for ValidationCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "ERR_FIELD" => Self::Field,
            "ERR_UNKNOWN" => Self::Unknown,
            _ => Self::Custom(code),
        }
    }
}

impl From<&str> for ValidationCode {
    fn from(code: &str) -> Self {
        Self::from(code.to_string())
    }
}

impl From<ValidationCode> for String {
    fn from(code: ValidationCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a [`ValidationResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    /// Machine-readable code.
    pub code: ValidationCode,
    /// Human-readable description.
    pub message: String,
    /// Field the message refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field: Option<String>,
}

/// Ordered collection of validation messages. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationResult {
    messages: Vec<ValidationMessage>,
}

impl ValidationResult {
    /// Create an empty (valid) result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no messages have been recorded.
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Same as [`is_valid`](Self::is_valid).
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages in the order they were added.
    pub fn messages(&self) -> &[ValidationMessage] {
        &self.messages
    }

    /// Append a message with code `ERR_UNKNOWN` and no field.
    pub fn add_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.push(ValidationCode::Unknown, message.into(), None)
    }

    /// Append a message with a caller-supplied code and no field.
    pub fn add_coded(
        &mut self,
        code: impl Into<ValidationCode>,
        message: impl Into<String>,
    ) -> &mut Self {
        self.push(code.into(), message.into(), None)
    }

    /// Append a message with code `ERR_FIELD` bound to `field`.
    pub fn add_field_error(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut Self {
        self.push(ValidationCode::Field, message.into(), Some(field.into()))
    }

    /// Append every message of `other`, preserving order.
    pub fn merge(&mut self, other: ValidationResult) -> &mut Self {
        self.messages.extend(other.messages);
        self
    }

    /// First message recorded for `field`, if any.
    pub fn field_message(&self, field: &str) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.field.as_deref() == Some(field))
            .map(|m| m.message.as_str())
    }

    /// Field → message map used as the `error` payload of a 400 response.
    ///
    /// The first message per field wins. Messages without a field are
    /// collected, in order, into an array under [`GENERAL_ERRORS_KEY`].
    pub fn field_errors(&self) -> Map<String, Value> {
        let mut map = Map::new();
        let mut general = Vec::new();
        for m in &self.messages {
            match &m.field {
                Some(field) => {
                    if !map.contains_key(field) {
                        map.insert(field.clone(), Value::String(m.message.clone()));
                    }
                }
                None => general.push(Value::String(m.message.clone())),
            }
        }
        if !general.is_empty() {
            map.insert(GENERAL_ERRORS_KEY.to_string(), Value::Array(general));
        }
        map
    }

    /// Convert into `Ok(())` when valid, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), ValidationResult> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn push(&mut self, code: ValidationCode, message: String, field: Option<String>) -> &mut Self {
        self.messages.push(ValidationMessage {
            code,
            message,
            field,
        });
        self
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.messages.is_empty() {
            return f.write_str("validation passed");
        }
        f.write_str("validation failed: ")?;
        for (i, m) in self.messages.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            match &m.field {
                Some(field) => write!(f, "{field}: {}", m.message)?,
                None => write!(f, "{}", m.message)?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationResult {}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// A message bound to one of a few fields, or to none.
    fn entry() -> impl Strategy<Value = (Option<String>, String)> {
        (
            prop::option::of(prop_oneof![Just("name"), Just("email"), Just("age")]),
            "[a-z ]{1,20}",
        )
            .prop_map(|(field, message)| (field.map(str::to_string), message))
    }

    fn build(entries: &[(Option<String>, String)]) -> ValidationResult {
        let mut result = ValidationResult::new();
        for (field, message) in entries {
            match field {
                Some(field) => result.add_field_error(field.as_str(), message.as_str()),
                None => result.add_message(message.as_str()),
            };
        }
        result
    }

    proptest! {
        /// Every field maps to the first message recorded for it.
        #[test]
        fn field_errors_match_first_message(entries in prop::collection::vec(entry(), 0..16)) {
            let result = build(&entries);
            let map = result.field_errors();
            for field in entries.iter().filter_map(|(f, _)| f.as_ref()) {
                let first = entries
                    .iter()
                    .find(|(f, _)| f.as_ref() == Some(field))
                    .map(|(_, m)| m.as_str());
                prop_assert_eq!(map[field.as_str()].as_str(), first);
                prop_assert_eq!(result.field_message(field), first);
            }
        }

        /// Messages without a field are all kept, in order.
        #[test]
        fn general_messages_keep_order(entries in prop::collection::vec(entry(), 0..16)) {
            let general: Vec<Value> = entries
                .iter()
                .filter(|(f, _)| f.is_none())
                .map(|(_, m)| Value::String(m.clone()))
                .collect();
            let map = build(&entries).field_errors();
            match map.get(GENERAL_ERRORS_KEY) {
                Some(Value::Array(collected)) => {
                    prop_assert_eq!(collected, &general);
                }
                _ => {
                    prop_assert!(general.is_empty());
                }
            }
        }

        /// Merging concatenates both message lists.
        #[test]
        fn merge_concatenates(
            left in prop::collection::vec(entry(), 0..8),
            right in prop::collection::vec(entry(), 0..8),
        ) {
            let mut merged = build(&left);
            merged.merge(build(&right));
            let all: Vec<_> = left.iter().chain(&right).cloned().collect();
            let expected = build(&all);
            prop_assert_eq!(merged.messages(), expected.messages());
            prop_assert_eq!(merged.is_valid(), all.is_empty());
        }
    }
}
