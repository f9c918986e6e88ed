//! # Handler Replies
//!
//! What a controller handler hands back to the dispatcher, and how each kind
//! becomes an HTTP response:
//!
//! | Variant        | Response                                              |
//! |----------------|-------------------------------------------------------|
//! | `Data(v)`      | 200, `{success:true, message:null, data:v, error:null}` |
//! | `Api(r)`       | `r.status`, `{success:true, message:r.message, data:r.data, error:null}` |
//! | `Empty`        | 200, envelope with `data:null`                        |
//! | `Raw(resp)`    | `resp`, untouched                                     |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use trellis_core::{ApiResponse, Envelope};

/// Result type of every controller handler.
pub type HandlerResult = anyhow::Result<Reply>;

/// Normalized handler output.
#[derive(Debug)]
pub enum Reply {
    /// Plain value, emitted at 200.
    Data(Value),
    /// Value with explicit status and message.
    Api(ApiResponse),
    /// No value.
    Empty,
    /// The handler built the response itself.
    Raw(Response),
}

impl Reply {
    /// Serialize `value` as a plain 200 reply.
    pub fn json<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Self::Data(serde_json::to_value(value)?))
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<ApiResponse> for Reply {
    fn from(response: ApiResponse) -> Self {
        Self::Api(response)
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Self::Raw(response)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Self::Empty
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self {
            Self::Data(data) => envelope_response(200, Envelope::success(data, None)),
            Self::Api(response) => {
                let status = response.status;
                envelope_response(status, response.into_envelope())
            }
            Self::Empty => envelope_response(200, Envelope::success(Value::Null, None)),
            Self::Raw(response) => response,
        }
    }
}

/// JSON envelope at `status`. Unknown codes become 500.
pub fn envelope_response(status: u16, envelope: Envelope) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn parts(reply: Reply) -> (StatusCode, Value) {
        let response = reply.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn plain_value_is_wrapped_at_200() {
        let (status, body) = parts(json!({"pong": true}).into()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": true, "message": null, "data": {"pong": true}, "error": null})
        );
    }

    #[tokio::test]
    async fn api_response_keeps_status_and_message() {
        let reply = Reply::from(ApiResponse::created(json!({"id": 7})).with_message("User created"));
        let (status, body) = parts(reply).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User created");
        assert_eq!(body["data"]["id"], 7);
    }

    #[tokio::test]
    async fn empty_and_none_have_null_data() {
        for reply in [Reply::from(()), Reply::from(None::<Value>)] {
            let (status, body) = parts(reply).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"], Value::Null);
            assert_eq!(body["success"], true);
        }
    }

    #[tokio::test]
    async fn raw_response_passes_through() {
        let raw = (StatusCode::ACCEPTED, "queued").into_response();
        let response = Reply::from(raw).into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"queued");
    }

    #[test]
    fn json_serializes_structs() {
        #[derive(Serialize)]
        struct Pong {
            pong: bool,
        }
        let reply = Reply::json(&Pong { pong: true }).unwrap();
        assert!(matches!(reply, Reply::Data(v) if v == json!({"pong": true})));
    }
}
