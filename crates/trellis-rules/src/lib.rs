#![deny(missing_docs)]

//! # trellis-rules — Field Rules and Schemas
//!
//! Declarative input validation and sanitization.
//!
//! - [`Rule`] / [`RuleSet`]: single-field predicates, evaluated in order with
//!   short-circuit on the first failure.
//! - [`rules`]: the built-in constructors (`required`, `optional`,
//!   `default_value`, `optional_but`, length and range bounds, format checks,
//!   allowed-value sets, conditional requirements).
//! - [`Schema`]: a reusable rule map offering `check`, `pick` and `extend`.
//!
//! ```
//! use serde_json::json;
//! use trellis_rules::{schema, rules::*};
//!
//! let create_user = schema! {
//!     "name" => required(),
//!     "email" => [required(), email()],
//!     "role" => default_value("member"),
//! };
//!
//! let input = create_user.pick(&json!({"name": "Ada", "email": "ada@example.com", "admin": true}));
//! assert_eq!(input, json!({"name": "Ada", "email": "ada@example.com", "role": "member"}));
//! assert!(create_user.check(&input).is_ok());
//! ```

pub mod builtin;
pub mod rule;
pub mod schema;

pub use builtin as rules;
pub use rule::{is_empty, Rule, RuleSet};
pub use schema::{sanitize, validate, RuleMap, Schema};
