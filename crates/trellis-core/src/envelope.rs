//! # Response Envelope
//!
//! Every API response body, success or failure, has the same shape:
//!
//! ```json
//! { "success": true, "message": null, "data": { ... }, "error": null }
//! ```
//!
//! [`ApiResponse`] is what a handler returns when it wants to choose the
//! status code and message of a successful response itself.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Uniform JSON body emitted for every request outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Envelope {
    /// Whether the request succeeded.
    pub success: bool,
    /// Optional human-readable message.
    pub message: Option<String>,
    /// Payload on success, `null` on failure.
    #[schema(value_type = Object)]
    pub data: Value,
    /// Error payload on failure, `null` on success.
    #[schema(value_type = Object)]
    pub error: Value,
}

impl Envelope {
    /// Successful envelope.
    pub fn success(data: Value, message: Option<String>) -> Self {
        Self {
            success: true,
            message,
            data,
            error: Value::Null,
        }
    }

    /// Failed envelope.
    pub fn failure(message: Option<String>, error: Value) -> Self {
        Self {
            success: false,
            message,
            data: Value::Null,
            error,
        }
    }
}

/// Successful handler result with an explicit status code and message.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Payload placed in the envelope's `data` field.
    pub data: Value,
    /// HTTP status code.
    pub status: u16,
    /// Optional message placed in the envelope's `message` field.
    pub message: Option<String>,
}

impl ApiResponse {
    /// Response with the given status and payload and no message.
    pub fn new(status: u16, data: impl Into<Value>) -> Self {
        Self {
            data: data.into(),
            status,
            message: None,
        }
    }

    /// 200 OK.
    pub fn ok(data: impl Into<Value>) -> Self {
        Self::new(200, data)
    }

    /// 201 Created.
    pub fn created(data: impl Into<Value>) -> Self {
        Self::new(201, data)
    }

    /// Serialize any value into the payload.
    pub fn serialize<T: Serialize>(status: u16, data: &T) -> serde_json::Result<Self> {
        Ok(Self::new(status, serde_json::to_value(data)?))
    }

    /// Attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The envelope this response is emitted as.
    pub fn into_envelope(self) -> Envelope {
        Envelope::success(self.data, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_envelope_shape() {
        let env = Envelope::success(json!({"pong": true}), None);
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"success": true, "message": null, "data": {"pong": true}, "error": null})
        );
    }

    #[test]
    fn failure_envelope_shape() {
        let env = Envelope::failure(Some("Conflict".into()), json!("Conflict"));
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({"success": false, "message": "Conflict", "data": null, "error": "Conflict"})
        );
    }

    #[test]
    fn api_response_carries_status_and_message() {
        let resp = ApiResponse::created(json!({"id": 1})).with_message("created");
        assert_eq!(resp.status, 201);
        let env = resp.into_envelope();
        assert!(env.success);
        assert_eq!(env.message.as_deref(), Some("created"));
        assert_eq!(env.data, json!({"id": 1}));
    }

    #[test]
    fn api_response_serializes_structs() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
        }
        let resp = ApiResponse::serialize(200, &User { name: "ada" }).unwrap();
        assert_eq!(resp.data, json!({"name": "ada"}));
    }
}
